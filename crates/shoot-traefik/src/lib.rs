//! Deploys the Traefik ingress controller into Gardener shoot clusters.
//!
//! The [`actuator::Actuator`] is the entry point for a hosting controller.
//! Per reconciliation it resolves the provider config ([`config`]), builds
//! all Traefik objects ([`resources`]) into a [`bundle::ResourceBundle`] and
//! converges the shoot's control plane namespace to hold it ([`converge`]).
//! [`teardown`] removes it again.
//!
//! ## Crate Features
//!
//! - `clap` enables the [`cli`] module with the run arguments of a hosting
//!   binary. It is enabled by default.

pub mod actuator;
pub mod admission;
pub mod builder;
pub mod bundle;
#[cfg(feature = "clap")]
pub mod cli;
pub mod client;
pub mod config;
pub mod converge;
pub mod crd;
pub mod image;
pub mod kvp;
pub mod logging;
pub mod metrics;
pub mod resources;
pub mod teardown;
pub mod variant;

// External re-exports
pub use k8s_openapi;
pub use kube;
