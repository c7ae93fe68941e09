//! Maps the configured [`IngressProvider`] to the capabilities Traefik needs
//! for it: extra RBAC rules and the provider arguments of the container.
use k8s_openapi::api::rbac::v1::PolicyRule;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The Kubernetes Ingress provider Traefik runs with.
#[derive(
    AsRefStr,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumString,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
pub enum IngressProvider {
    /// The standard Kubernetes Ingress provider.
    #[default]
    KubernetesIngress,

    /// The NGINX compatible provider. It understands the annotations of the
    /// NGINX Ingress Controller, which eases migrations away from it.
    #[serde(rename = "KubernetesIngressNGINX")]
    #[strum(serialize = "KubernetesIngressNGINX")]
    KubernetesIngressNginx,
}

/// The provider specific part of the Traefik deployment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderPolicy {
    /// Rules appended to the base rules of the ClusterRole.
    pub extra_rules: Vec<PolicyRule>,

    /// Arguments appended to the baseline container arguments.
    pub args: Vec<String>,
}

impl IngressProvider {
    /// Derives the [`ProviderPolicy`] for this provider. Exactly one provider
    /// flag is ever part of [`ProviderPolicy::args`].
    pub fn policy(self, ingress_class: &str) -> ProviderPolicy {
        match self {
            Self::KubernetesIngress => ProviderPolicy {
                extra_rules: Vec::new(),
                args: vec![
                    "--providers.kubernetesingress=true".to_owned(),
                    format!("--providers.kubernetesingress.ingressclass={ingress_class}"),
                ],
            },
            // Namespace selector annotations need to read namespaces.
            Self::KubernetesIngressNginx => ProviderPolicy {
                extra_rules: vec![namespace_read_rule()],
                args: vec![
                    "--providers.kubernetesingressnginx=true".to_owned(),
                    format!("--providers.kubernetesingressnginx.ingressclass={ingress_class}"),
                ],
            },
        }
    }
}

/// Derives the policy for an optional provider, falling back to
/// [`IngressProvider::KubernetesIngress`] when none is set.
pub fn derive(provider: Option<IngressProvider>, ingress_class: &str) -> ProviderPolicy {
    provider.unwrap_or_default().policy(ingress_class)
}

pub(crate) fn namespace_read_rule() -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec!["namespaces".to_owned()]),
        verbs: read_verbs(),
        ..PolicyRule::default()
    }
}

pub(crate) fn read_verbs() -> Vec<String> {
    ["get", "list", "watch"].map(String::from).to_vec()
}
