use snafu::{ResultExt, Snafu, ensure};

use crate::config::TraefikConfig;

pub const API_VERSION: &str = "traefik.extensions.gardener.cloud/v1alpha1";
pub const KIND: &str = "TraefikConfig";

#[derive(Debug, Snafu)]
pub enum DecodeError {
    #[snafu(display("failed to parse provider config"))]
    ParseDocument { source: serde_yaml::Error },

    #[snafu(display(
        "unexpected provider config type {api_version}/{kind}, expected {API_VERSION}/{KIND}"
    ))]
    UnexpectedType { api_version: String, kind: String },
}

/// Decodes the raw provider config of an extension.
pub trait ProviderConfigDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<TraefikConfig, DecodeError>;
}

/// Decodes JSON or YAML documents, rejecting unknown fields and documents of
/// another type.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictDecoder;

impl ProviderConfigDecoder for StrictDecoder {
    fn decode(&self, raw: &[u8]) -> Result<TraefikConfig, DecodeError> {
        let config: TraefikConfig = serde_yaml::from_slice(raw).context(ParseDocumentSnafu)?;

        ensure!(
            config.api_version == API_VERSION && config.kind == KIND,
            UnexpectedTypeSnafu {
                api_version: config.api_version.clone(),
                kind: config.kind.clone(),
            }
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::variant::IngressProvider;

    #[test]
    fn decode_yaml() {
        let raw = indoc! {"
            apiVersion: traefik.extensions.gardener.cloud/v1alpha1
            kind: TraefikConfig
            spec:
              image: custom.registry.io/traefik:v2.0
              replicas: 3
              ingressClass: nginx
              ingressProvider: KubernetesIngressNGINX
        "};

        let config = StrictDecoder.decode(raw.as_bytes()).expect("config must decode");

        assert_eq!(config.spec.image.as_deref(), Some("custom.registry.io/traefik:v2.0"));
        assert_eq!(config.spec.replicas, Some(3));
        assert_eq!(config.spec.ingress_class.as_deref(), Some("nginx"));
        assert_eq!(
            config.spec.ingress_provider,
            Some(IngressProvider::KubernetesIngressNginx)
        );
    }

    #[rstest]
    #[case::unknown_field(indoc! {"
        apiVersion: traefik.extensions.gardener.cloud/v1alpha1
        kind: TraefikConfig
        spec:
          replica: 3
    "})]
    #[case::missing_spec(indoc! {"
        apiVersion: traefik.extensions.gardener.cloud/v1alpha1
        kind: TraefikConfig
    "})]
    fn reject_malformed(#[case] raw: &str) {
        let err = StrictDecoder.decode(raw.as_bytes()).expect_err("config must not decode");
        assert!(matches!(err, DecodeError::ParseDocument { .. }), "{err:?}");
    }

    #[test]
    fn unknown_provider_decodes_as_standard() {
        let raw = indoc! {"
            apiVersion: traefik.extensions.gardener.cloud/v1alpha1
            kind: TraefikConfig
            spec:
              ingressProvider: Istio
              replicas: 3
        "};

        let config = StrictDecoder.decode(raw.as_bytes()).expect("config must decode");

        assert_eq!(config.spec.ingress_provider, Some(IngressProvider::KubernetesIngress));
        assert_eq!(config.spec.replicas, Some(3));
    }

    #[test]
    fn reject_foreign_kind() {
        let raw = indoc! {"
            apiVersion: v1
            kind: ConfigMap
            spec: {}
        "};

        let err = StrictDecoder.decode(raw.as_bytes()).expect_err("config must not decode");
        assert!(matches!(err, DecodeError::UnexpectedType { .. }), "{err:?}");
    }
}
