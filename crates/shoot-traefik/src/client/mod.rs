//! The store capability the convergence and teardown engines talk to.
//!
//! [`Store`] is implemented by the kube-backed [`Client`] and by the
//! in-memory [`MemoryStore`]. Both report "already exists", "not found"
//! and resource version conflicts as distinct [`Error`] variants.
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};
use snafu::Snafu;

mod kube_client;
mod memory;

pub use kube_client::*;
pub use memory::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{kind} {namespace}/{name} already exists"))]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("{kind} {namespace}/{name} not found"))]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("{kind} {namespace}/{name} was modified concurrently"))]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("store is unavailable for {kind} {namespace}/{name}"))]
    Unavailable {
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("{kind} is missing metadata.name"))]
    MissingName { kind: String },

    #[snafu(display("request for {kind} {namespace}/{name} failed"))]
    Request {
        source: kube::Error,
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("failed to (de)serialize {kind} {namespace}/{name}"))]
    Codec {
        source: serde_json::Error,
        kind: String,
        namespace: String,
        name: String,
    },
}

impl Error {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The objects a [`Store`] can manage: typed, namespaced Kubernetes objects.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Create, read, update and delete access to namespaced objects.
///
/// Implementations are long-lived handles shared between reconciliations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates `object` in its namespace. Fails with
    /// [`Error::AlreadyExists`] if an object with the same name exists.
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K>;

    /// Fails with [`Error::NotFound`] if the object does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K>;

    /// Replaces the stored object. The `resourceVersion` of `object` must
    /// match the stored one if set, otherwise this fails with
    /// [`Error::Conflict`].
    async fn update<K: StoreObject>(&self, object: &K) -> Result<K>;

    /// Fails with [`Error::NotFound`] if the object does not exist.
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()>;
}

/// The namespace and name of `object`, which every [`Store`] requires.
pub(crate) fn object_key<K: StoreObject>(object: &K) -> Result<(String, String)> {
    let meta = object.meta();
    match &meta.name {
        Some(name) => Ok((meta.namespace.clone().unwrap_or_default(), name.clone())),
        None => MissingNameSnafu {
            kind: K::kind(&()),
        }
        .fail(),
    }
}
