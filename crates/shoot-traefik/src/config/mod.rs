//! The Traefik provider configuration and its resolution against the
//! defaults.
//!
//! A reconciliation starts from [`ResolvedConfig::default()`] and lays the
//! optional [`TraefikConfigSpec`] of the extension on top of it, see
//! [`resolve`]. A provider config which cannot be decoded never blocks the
//! reconciliation: [`resolve_provider_config`] falls back to the base
//! configuration and hands the decode error back as a warning.
use std::num::NonZeroU32;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::variant::IngressProvider;

mod decode;

pub use decode::*;

pub const DEFAULT_REPLICAS: NonZeroU32 = NonZeroU32::new(2).expect("2 is non-zero");
pub const DEFAULT_INGRESS_CLASS: &str = "traefik";

/// The provider configuration document of the Traefik extension.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TraefikConfig {
    pub api_version: String,
    pub kind: String,

    /// Provides the Traefik extension configuration spec.
    pub spec: TraefikConfigSpec,
}

/// Every field is optional. Unset, empty or zero values keep the default.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TraefikConfigSpec {
    /// The Traefik container image to use. Resolved from the image vector
    /// if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// The number of Traefik replicas. Defaults to 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// The ingress class name Traefik handles. Defaults to `traefik`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class: Option<String>,

    /// The Kubernetes Ingress provider. Use `KubernetesIngressNGINX` when
    /// migrating from the NGINX Ingress Controller to keep existing NGINX
    /// annotations working. Defaults to `KubernetesIngress`.
    #[serde(
        default,
        deserialize_with = "deserialize_ingress_provider",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<IngressProvider>")]
    pub ingress_provider: Option<IngressProvider>,
}

/// The fully resolved configuration of a single reconciliation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedConfig {
    /// An explicit image. When `None` the image vector is consulted.
    pub image: Option<String>,
    pub replicas: NonZeroU32,
    pub ingress_class_name: String,
    pub ingress_provider: IngressProvider,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            image: None,
            replicas: DEFAULT_REPLICAS,
            ingress_class_name: DEFAULT_INGRESS_CLASS.to_owned(),
            ingress_provider: IngressProvider::default(),
        }
    }
}

/// Lays `overrides` on top of `base`. Fields which are unset, empty or not
/// positive keep the value of `base`.
pub fn resolve(base: ResolvedConfig, overrides: Option<&TraefikConfigSpec>) -> ResolvedConfig {
    let Some(overrides) = overrides else {
        return base;
    };

    let image = overrides
        .image
        .as_deref()
        .filter(|image| !image.is_empty())
        .map(ToOwned::to_owned)
        .or(base.image);

    let replicas = overrides
        .replicas
        .and_then(|replicas| u32::try_from(replicas).ok())
        .and_then(NonZeroU32::new)
        .unwrap_or(base.replicas);

    let ingress_class_name = match overrides.ingress_class.as_deref() {
        Some(class) if !class.is_empty() => class.to_owned(),
        _ => base.ingress_class_name,
    };

    ResolvedConfig {
        image,
        replicas,
        ingress_class_name,
        ingress_provider: overrides.ingress_provider.unwrap_or(base.ingress_provider),
    }
}

/// The outcome of [`resolve_provider_config`].
#[derive(Debug)]
pub struct Resolution {
    pub config: ResolvedConfig,

    /// Set if the raw provider config could not be decoded. The
    /// [`Resolution::config`] is the unchanged base in that case.
    pub decode_error: Option<DecodeError>,
}

/// Decodes the optional raw provider config with `decoder` and resolves it
/// against `base`.
pub fn resolve_provider_config(
    base: ResolvedConfig,
    raw: Option<&[u8]>,
    decoder: &dyn ProviderConfigDecoder,
) -> Resolution {
    let Some(raw) = raw else {
        return Resolution {
            config: base,
            decode_error: None,
        };
    };

    match decoder.decode(raw) {
        Ok(provider_config) => Resolution {
            config: resolve(base, Some(&provider_config.spec)),
            decode_error: None,
        },
        Err(err) => Resolution {
            config: base,
            decode_error: Some(err),
        },
    }
}

/// An empty string is treated like an unset provider. Unknown providers
/// fall back to the standard one, the other fields of the document still
/// apply.
fn deserialize_ingress_provider<'de, D>(deserializer: D) -> Result<Option<IngressProvider>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(match value.as_deref() {
        None | Some("") => None,
        Some(provider) => Some(provider.parse().unwrap_or_else(|_| {
            let fallback = IngressProvider::default();
            warn!(provider, %fallback, "unknown ingress provider, using the standard one");
            fallback
        })),
    })
}
