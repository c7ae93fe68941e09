//! The lifecycle hooks the host runtime invokes for `traefik` extensions.
//!
//! The host runtime serializes all calls for one target namespace. Calls for
//! different namespaces share nothing but the store and image resolver
//! handles.
use std::sync::Arc;

use kube::ResourceExt;
use snafu::{OptionExt, ResultExt, Snafu};
use strum::{AsRefStr, Display};
use tracing::{error, info, instrument, warn};

use crate::{
    admission::is_allowed_context,
    client::Store,
    config::{ProviderConfigDecoder, Resolution, ResolvedConfig, StrictDecoder, resolve_provider_config},
    converge,
    crd::{Extension, PURPOSE_EVALUATION, Shoot},
    image::ImageResolver,
    metrics::ActuatorMetrics,
    resources, teardown,
};

/// The name of the actuator, used when registering it with a controller.
pub const NAME: &str = "traefik";
/// The type of the `Extension` objects the actuator reconciles.
pub const EXTENSION_TYPE: &str = "traefik";
pub const FINALIZER_SUFFIX: &str = "gardener-extension-shoot-traefik";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "shoot purpose must be {PURPOSE_EVALUATION:?} for the traefik extension, got {purpose:?} ({operation} in {namespace})"
    ))]
    PurposeNotAllowed {
        purpose: String,
        namespace: String,
        operation: Operation,
    },

    #[snafu(display("failed to build traefik resources ({operation} in {namespace})"))]
    BuildResources {
        source: resources::Error,
        namespace: String,
        operation: Operation,
    },

    #[snafu(display("failed to deploy traefik ({operation} in {namespace})"))]
    Deploy {
        source: converge::Error,
        namespace: String,
        operation: Operation,
    },

    #[snafu(display("failed to remove traefik ({operation} in {namespace})"))]
    Remove {
        source: teardown::Error,
        namespace: String,
        operation: Operation,
    },

    #[snafu(display("extension {name:?} has no namespace"))]
    MissingNamespace { name: String },
}

/// The lifecycle hook an [`Actuator`] call was made for.
#[derive(AsRefStr, Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Reconcile,
    Delete,
    ForceDelete,
    Restore,
    Migrate,
}

/// The shoot an [`Actuator`] call is made for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Target {
    /// The control plane namespace of the shoot, which holds the persisted
    /// bundle.
    pub namespace: String,

    /// The purpose of the shoot, `None` if it has none.
    pub purpose: Option<String>,

    pub hibernated: bool,
}

impl Target {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_hibernated(mut self, hibernated: bool) -> Self {
        self.hibernated = hibernated;
        self
    }

    /// The target of `shoot`, whose control plane lives in `namespace`.
    pub fn from_shoot(namespace: impl Into<String>, shoot: &Shoot) -> Self {
        Self {
            namespace: namespace.into(),
            purpose: shoot.spec.purpose.clone(),
            hibernated: shoot.spec.is_hibernated(),
        }
    }
}

/// Deploys Traefik into shoots and removes it again.
pub struct Actuator<S> {
    store: S,
    image_resolver: Arc<dyn ImageResolver>,
    decoder: Arc<dyn ProviderConfigDecoder>,
    base_config: ResolvedConfig,
    metrics: ActuatorMetrics,
}

impl<S: Store> Actuator<S> {
    /// Creates an actuator with the [`StrictDecoder`], the default
    /// [`ResolvedConfig`] as base and metrics recorded to the global meter.
    pub fn new(store: S, image_resolver: Arc<dyn ImageResolver>) -> Self {
        Self {
            store,
            image_resolver,
            decoder: Arc::new(StrictDecoder),
            base_config: ResolvedConfig::default(),
            metrics: ActuatorMetrics::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ProviderConfigDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_metrics(mut self, metrics: ActuatorMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// The configuration provider configs are resolved against.
    pub fn with_base_config(mut self, base_config: ResolvedConfig) -> Self {
        self.base_config = base_config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Converges `target` to run Traefik as configured by the raw
    /// `provider_config`.
    ///
    /// Hibernated shoots are skipped. Shoots the admission check would reject,
    /// see [`is_allowed_context`], fail before anything is resolved or
    /// written. A
    /// provider config which cannot be decoded is logged and the base
    /// configuration is used instead.
    pub async fn reconcile(&self, target: &Target, provider_config: Option<&[u8]>) -> Result<()> {
        self.deploy(target, provider_config, Operation::Reconcile)
            .await
    }

    /// Like [`Self::reconcile`], for the `Extension` object of `shoot`.
    pub async fn reconcile_extension(&self, extension: &Extension, shoot: &Shoot) -> Result<()> {
        let namespace = extension.namespace().context(MissingNamespaceSnafu {
            name: extension.name_any(),
        })?;
        let provider_config = extension
            .spec
            .provider_config
            .as_ref()
            .map(|value| value.to_string().into_bytes());

        self.reconcile(&Target::from_shoot(namespace, shoot), provider_config.as_deref())
            .await
    }

    pub async fn restore(&self, target: &Target, provider_config: Option<&[u8]>) -> Result<()> {
        self.deploy(target, provider_config, Operation::Restore)
            .await
    }

    pub async fn migrate(&self, target: &Target, provider_config: Option<&[u8]>) -> Result<()> {
        self.deploy(target, provider_config, Operation::Migrate)
            .await
    }

    /// Removes Traefik from `target`. Succeeds if nothing is deployed.
    pub async fn delete(&self, target: &Target) -> Result<()> {
        self.remove(target, Operation::Delete).await
    }

    /// Removes Traefik after the shoot was force-deleted.
    pub async fn force_delete(&self, target: &Target) -> Result<()> {
        self.remove(target, Operation::ForceDelete).await
    }

    #[instrument(skip(self, target, provider_config), fields(namespace = %target.namespace))]
    async fn deploy(
        &self,
        target: &Target,
        provider_config: Option<&[u8]>,
        operation: Operation,
    ) -> Result<()> {
        let namespace = &target.namespace;
        self.metrics.record_operation(namespace, operation);
        info!("reconciling traefik extension");

        if target.hibernated {
            info!("shoot is hibernated, skipping traefik deployment");
            return Ok(());
        }

        let purpose = target.purpose.as_deref();
        if !is_allowed_context(purpose) {
            let purpose = purpose.unwrap_or("nil");
            error!(purpose, "shoot purpose validation failed");
            return PurposeNotAllowedSnafu {
                purpose,
                namespace,
                operation,
            }
            .fail();
        }

        let Resolution {
            config,
            decode_error,
        } = resolve_provider_config(self.base_config.clone(), provider_config, self.decoder.as_ref());
        if let Some(err) = decode_error {
            warn!(
                error = &err as &dyn std::error::Error,
                "failed to decode provider config, using defaults"
            );
        }

        let bundle = resources::build(&config, self.image_resolver.as_ref())
            .context(BuildResourcesSnafu {
                namespace,
                operation,
            })?;
        let applied = converge::apply(&self.store, &bundle, namespace)
            .await
            .context(DeploySnafu {
                namespace,
                operation,
            })?;

        info!(
            secret = %applied.secret,
            managed_resource = %applied.managed_resource,
            "successfully reconciled traefik extension"
        );
        Ok(())
    }

    #[instrument(skip(self, target), fields(namespace = %target.namespace))]
    async fn remove(&self, target: &Target, operation: Operation) -> Result<()> {
        self.metrics.record_operation(&target.namespace, operation);
        info!("deleting traefik resources managed by extension");

        teardown::remove(&self.store, &target.namespace)
            .await
            .context(RemoveSnafu {
                namespace: &target.namespace,
                operation,
            })?;

        info!("successfully deleted traefik resources");
        Ok(())
    }
}
