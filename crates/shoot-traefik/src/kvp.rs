//! Well-known Kubernetes label and annotation keys plus the label sets
//! attached to the objects of the resource bundle.
use std::collections::BTreeMap;

use const_format::concatcp;

const APP_KUBERNETES_LABEL_BASE: &str = "app.kubernetes.io/";

/// The name of the application, e.g. "traefik"
pub const APP_NAME_LABEL: &str = concatcp!(APP_KUBERNETES_LABEL_BASE, "name");
/// A unique name identifying the instance of an application
pub const APP_INSTANCE_LABEL: &str = concatcp!(APP_KUBERNETES_LABEL_BASE, "instance");
/// The component within the architecture, e.g. "ingress-controller"
pub const APP_COMPONENT_LABEL: &str = concatcp!(APP_KUBERNETES_LABEL_BASE, "component");
/// The tool being used to manage the operation of an application
pub const APP_MANAGED_BY_LABEL: &str = concatcp!(APP_KUBERNETES_LABEL_BASE, "managed-by");

const GARDENER_NETWORKING_BASE: &str = "networking.gardener.cloud/";

pub const TO_APISERVER_LABEL: &str = concatcp!(GARDENER_NETWORKING_BASE, "to-apiserver");
pub const TO_DNS_LABEL: &str = concatcp!(GARDENER_NETWORKING_BASE, "to-dns");

/// Injected into every object the resource manager creates in the shoot, so
/// that the shoot cleanup does not remove them on its own.
pub const NO_CLEANUP_LABEL: &str = "shoot.gardener.cloud/no-cleanup";

/// Carries the [`Fingerprint`](crate::bundle::Fingerprint) of the bundle
/// stored in a Secret.
pub const DATA_CHECKSUM_ANNOTATION: &str = "resources.gardener.cloud/data-checksum";
pub const DEFAULT_INGRESS_CLASS_ANNOTATION: &str = "ingressclass.kubernetes.io/is-default-class";
pub const PROMETHEUS_SCRAPE_ANNOTATION: &str = "prometheus.io/scrape";
pub const PROMETHEUS_PORT_ANNOTATION: &str = "prometheus.io/port";

pub const APP_NAME: &str = "traefik";
pub const COMPONENT: &str = "ingress-controller";
pub const MANAGED_BY: &str = "gardener";

/// The labels used to select the Traefik pods.
pub fn selector_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_NAME_LABEL.to_owned(), APP_NAME.to_owned()),
        (APP_INSTANCE_LABEL.to_owned(), APP_NAME.to_owned()),
    ])
}

/// Labels for cluster-scoped objects which are not part of the workload
/// component, like the ClusterRole or the IngressClass.
pub fn recommended_labels() -> BTreeMap<String, String> {
    let mut labels = selector_labels();
    labels.insert(APP_MANAGED_BY_LABEL.to_owned(), MANAGED_BY.to_owned());
    labels
}

/// [`recommended_labels`] plus the component label.
pub fn component_labels() -> BTreeMap<String, String> {
    let mut labels = recommended_labels();
    labels.insert(APP_COMPONENT_LABEL.to_owned(), COMPONENT.to_owned());
    labels
}

/// Labels of the workload and its pods. The networking labels let the
/// Gardener network policies admit traffic to the API server and DNS.
pub fn workload_labels() -> BTreeMap<String, String> {
    let mut labels = component_labels();
    labels.insert(TO_APISERVER_LABEL.to_owned(), "allowed".to_owned());
    labels.insert(TO_DNS_LABEL.to_owned(), "allowed".to_owned());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_sets_are_nested() {
        let selector = selector_labels();
        let workload = workload_labels();

        assert_eq!(selector.len(), 2);
        assert!(selector.iter().all(|(k, v)| workload.get(k) == Some(v)));
        assert_eq!(
            workload.get(APP_COMPONENT_LABEL).map(String::as_str),
            Some(COMPONENT)
        );
        assert_eq!(
            workload.get(TO_DNS_LABEL).map(String::as_str),
            Some("allowed")
        );
    }
}
