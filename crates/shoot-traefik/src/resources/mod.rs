//! Composes the complete set of objects Traefik consists of in the shoot
//! cluster into a [`ResourceBundle`].
//!
//! Building is deterministic: the same [`ResolvedConfig`] and image always
//! produce byte-identical bundles.
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::{
    bundle::{self, ResourceBundle},
    config::ResolvedConfig,
    image::{self, ImageResolver, TRAEFIK_IMAGE_NAME},
};

pub mod network;
pub mod rbac;
pub mod workload;

/// The namespace of the shoot cluster Traefik is deployed into.
pub const NAMESPACE: &str = "kube-system";
pub const SERVICE_ACCOUNT_NAME: &str = "traefik";
pub const DEPLOYMENT_NAME: &str = "traefik";
pub const SERVICE_NAME: &str = "traefik";
/// Shared by the ClusterRole and the ClusterRoleBinding. Both are
/// cluster-scoped, every target uses the same name.
pub const CLUSTER_ROLE_NAME: &str = "traefik-ingress-controller";
pub const NETWORK_POLICY_NAME: &str = "traefik-allow-ingress";

pub const SERVICE_ACCOUNT_KEY: &str = "serviceaccount.yaml";
pub const CLUSTER_ROLE_KEY: &str = "clusterrole.yaml";
pub const CLUSTER_ROLE_BINDING_KEY: &str = "clusterrolebinding.yaml";
pub const DEPLOYMENT_KEY: &str = "deployment.yaml";
pub const SERVICE_KEY: &str = "service.yaml";
pub const INGRESS_CLASS_KEY: &str = "ingressclass.yaml";
pub const NETWORK_POLICY_KEY: &str = "networkpolicy.yaml";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to find traefik image in image vector"))]
    ResolveImage { source: image::Error },

    #[snafu(display("failed to add {kind} to the resource bundle"))]
    AddToBundle {
        source: bundle::Error,
        kind: &'static str,
    },
}

/// Builds the [`ResourceBundle`] for `config`.
///
/// An explicit [`ResolvedConfig::image`] is used verbatim, otherwise the
/// image is looked up with `image_resolver`. A failed lookup fails the
/// whole build.
pub fn build(config: &ResolvedConfig, image_resolver: &dyn ImageResolver) -> Result<ResourceBundle> {
    let image = match config.image.as_deref().filter(|image| !image.is_empty()) {
        Some(image) => image.to_owned(),
        None => image_resolver
            .find_image(TRAEFIK_IMAGE_NAME)
            .context(ResolveImageSnafu)?
            .to_string(),
    };
    debug!(image = %image, provider = %config.ingress_provider, "building traefik resources");

    let policy = config
        .ingress_provider
        .policy(&config.ingress_class_name);

    let mut bundle = ResourceBundle::new();
    bundle
        .insert_yaml(SERVICE_ACCOUNT_KEY, &rbac::service_account())
        .context(AddToBundleSnafu { kind: "ServiceAccount" })?;
    bundle
        .insert_yaml(CLUSTER_ROLE_KEY, &rbac::cluster_role(&policy))
        .context(AddToBundleSnafu { kind: "ClusterRole" })?;
    bundle
        .insert_yaml(CLUSTER_ROLE_BINDING_KEY, &rbac::cluster_role_binding())
        .context(AddToBundleSnafu { kind: "ClusterRoleBinding" })?;
    bundle
        .insert_yaml(DEPLOYMENT_KEY, &workload::deployment(config, &image, &policy))
        .context(AddToBundleSnafu { kind: "Deployment" })?;
    bundle
        .insert_yaml(SERVICE_KEY, &network::service())
        .context(AddToBundleSnafu { kind: "Service" })?;
    bundle
        .insert_yaml(INGRESS_CLASS_KEY, &network::ingress_class(config))
        .context(AddToBundleSnafu { kind: "IngressClass" })?;
    bundle
        .insert_yaml(NETWORK_POLICY_KEY, &network::network_policy())
        .context(AddToBundleSnafu { kind: "NetworkPolicy" })?;

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::{apps::v1::Deployment, rbac::v1::ClusterRole};

    use super::*;
    use crate::{
        config::{TraefikConfigSpec, resolve},
        image::{ImageReference, ImageSource, ImageVector},
        variant::{IngressProvider, namespace_read_rule},
    };

    /// Fails the test if it is ever consulted.
    struct UnreachableResolver;

    impl ImageResolver for UnreachableResolver {
        fn find_image(&self, name: &str) -> image::Result<ImageReference> {
            panic!("image resolver must not be called, but was asked for {name:?}")
        }
    }

    fn image_vector() -> ImageVector {
        ImageVector::new([ImageSource {
            name: TRAEFIK_IMAGE_NAME.to_owned(),
            repository: Some("docker.io/library/traefik".to_owned()),
            tag: Some("v3.6.7".to_owned()),
            ..ImageSource::default()
        }])
    }

    fn decode<T: serde::de::DeserializeOwned>(bundle: &ResourceBundle, key: &str) -> T {
        serde_yaml::from_slice(bundle.get(key).expect("bundle entry must exist"))
            .expect("bundle entry must deserialize")
    }

    fn container_image_and_args(bundle: &ResourceBundle) -> (String, Vec<String>) {
        let deployment: Deployment = decode(bundle, DEPLOYMENT_KEY);
        let container = deployment
            .spec
            .and_then(|spec| spec.template.spec)
            .map(|pod| pod.containers[0].clone())
            .expect("container must be set");
        (
            container.image.unwrap_or_default(),
            container.args.unwrap_or_default(),
        )
    }

    #[test]
    fn bundle_contains_all_objects() {
        let bundle = build(&ResolvedConfig::default(), &image_vector()).expect("bundle must build");

        assert_eq!(bundle.keys().collect::<Vec<_>>(), [
            CLUSTER_ROLE_KEY,
            CLUSTER_ROLE_BINDING_KEY,
            DEPLOYMENT_KEY,
            INGRESS_CLASS_KEY,
            NETWORK_POLICY_KEY,
            SERVICE_KEY,
            SERVICE_ACCOUNT_KEY,
        ]);
    }

    #[test]
    fn build_is_deterministic() {
        let config = ResolvedConfig::default();

        let first = build(&config, &image_vector()).expect("bundle must build");
        let second = build(&config, &image_vector()).expect("bundle must build");

        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn explicit_image_skips_resolver() {
        let config = ResolvedConfig {
            image: Some("custom:v1".to_owned()),
            ..ResolvedConfig::default()
        };

        let bundle = build(&config, &UnreachableResolver).expect("bundle must build");

        assert_eq!(container_image_and_args(&bundle).0, "custom:v1");
    }

    #[test]
    fn image_from_vector() {
        let bundle = build(&ResolvedConfig::default(), &image_vector()).expect("bundle must build");

        assert_eq!(
            container_image_and_args(&bundle).0,
            "docker.io/library/traefik:v3.6.7"
        );
    }

    #[test]
    fn missing_image_fails_build() {
        let config = ResolvedConfig {
            image: Some(String::new()),
            ..ResolvedConfig::default()
        };

        let err = build(&config, &ImageVector::default()).expect_err("build must fail");

        assert!(matches!(err, Error::ResolveImage { .. }));
        assert!(err.to_string().contains("failed to find traefik image"));
    }

    #[test]
    fn standard_provider_excludes_compatibility_mode() {
        let bundle = build(&ResolvedConfig::default(), &image_vector()).expect("bundle must build");

        let (_, args) = container_image_and_args(&bundle);
        assert!(args.contains(&"--providers.kubernetesingress=true".to_owned()));
        assert!(
            args.iter()
                .all(|arg| !arg.starts_with("--providers.kubernetesingressnginx"))
        );

        let role: ClusterRole = decode(&bundle, CLUSTER_ROLE_KEY);
        assert!(!role.rules.unwrap_or_default().contains(&namespace_read_rule()));
    }

    #[test]
    fn compatibility_mode_scenario() {
        let overrides = TraefikConfigSpec {
            ingress_provider: Some(IngressProvider::KubernetesIngressNginx),
            ingress_class: Some("nginx".to_owned()),
            ..TraefikConfigSpec::default()
        };
        let config = resolve(ResolvedConfig::default(), Some(&overrides));
        assert_eq!(config.replicas.get(), 2);

        let bundle = build(&config, &image_vector()).expect("bundle must build");

        let (_, args) = container_image_and_args(&bundle);
        assert!(args.contains(&"--providers.kubernetesingressnginx=true".to_owned()));
        assert!(args.contains(&"--providers.kubernetesingressnginx.ingressclass=nginx".to_owned()));
        assert!(
            args.iter()
                .all(|arg| !arg.starts_with("--providers.kubernetesingress=")
                    && !arg.starts_with("--providers.kubernetesingress."))
        );

        let role: ClusterRole = decode(&bundle, CLUSTER_ROLE_KEY);
        assert!(role.rules.unwrap_or_default().contains(&namespace_read_rule()));
    }
}
