use k8s_openapi::{
    api::{
        core::v1::{Service, ServicePort, ServiceSpec},
        networking::v1::{
            IngressClass, IngressClassSpec, NetworkPolicy, NetworkPolicyEgressRule,
            NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec,
        },
    },
    apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString},
};

use crate::{
    builder::meta::ObjectMetaBuilder,
    config::ResolvedConfig,
    kvp,
    resources::{
        NAMESPACE, NETWORK_POLICY_NAME, SERVICE_NAME,
        workload::{WEB_PORT_NAME, WEBSECURE_PORT_NAME, selector},
    },
};

pub const INGRESS_CONTROLLER: &str = "traefik.io/ingress-controller";

/// A LoadBalancer Service exposing the web and websecure entrypoints on 80
/// and 443.
pub fn service() -> Service {
    let port = |name: &str, port: i32| ServicePort {
        name: Some(name.to_owned()),
        port,
        target_port: Some(IntOrString::String(name.to_owned())),
        protocol: Some("TCP".to_owned()),
        ..ServicePort::default()
    };

    Service {
        metadata: ObjectMetaBuilder::new()
            .name(SERVICE_NAME)
            .namespace(NAMESPACE)
            .with_labels(kvp::component_labels())
            .build(),
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_owned()),
            selector: Some(kvp::selector_labels()),
            ports: Some(vec![port(WEB_PORT_NAME, 80), port(WEBSECURE_PORT_NAME, 443)]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// Registers Traefik as the default ingress class of the cluster.
///
/// The IngressClass is cluster-scoped and named after the configured class,
/// so two targets configured with the same class share it.
pub fn ingress_class(config: &ResolvedConfig) -> IngressClass {
    IngressClass {
        metadata: ObjectMetaBuilder::new()
            .name(&config.ingress_class_name)
            .with_labels(kvp::recommended_labels())
            .with_annotation(kvp::DEFAULT_INGRESS_CLASS_ANNOTATION, "true")
            .build(),
        spec: Some(IngressClassSpec {
            controller: Some(INGRESS_CONTROLLER.to_owned()),
            ..IngressClassSpec::default()
        }),
    }
}

/// Allows all ingress and egress traffic of the Traefik pods.
///
/// Ingress comes from the load balancer, egress goes to arbitrary backends
/// behind Ingress resources. DNS and API server access are granted by the
/// Gardener policies matching the networking labels of the pods.
// TODO: Make egress restrictable once users can provide their own backend policies.
pub fn network_policy() -> NetworkPolicy {
    let mut labels = kvp::selector_labels();
    labels.remove(kvp::APP_INSTANCE_LABEL);
    labels.insert(kvp::APP_MANAGED_BY_LABEL.to_owned(), kvp::MANAGED_BY.to_owned());

    NetworkPolicy {
        metadata: ObjectMetaBuilder::new()
            .name(NETWORK_POLICY_NAME)
            .namespace(NAMESPACE)
            .with_labels(labels)
            .build(),
        spec: Some(NetworkPolicySpec {
            pod_selector: selector().into(),
            policy_types: Some(vec!["Ingress".to_owned(), "Egress".to_owned()]),
            ingress: Some(vec![NetworkPolicyIngressRule::default()]),
            egress: Some(vec![NetworkPolicyEgressRule {
                to: Some(vec![NetworkPolicyPeer {
                    namespace_selector: Some(LabelSelector::default()),
                    pod_selector: Some(LabelSelector::default()),
                    ..NetworkPolicyPeer::default()
                }]),
                ..NetworkPolicyEgressRule::default()
            }]),
        }),
    }
}
