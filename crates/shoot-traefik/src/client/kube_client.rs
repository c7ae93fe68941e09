use async_trait::async_trait;
use kube::{
    Api,
    api::{DeleteParams, PostParams},
    client::Client as KubeClient,
};
use snafu::IntoError;
use tracing::trace;

use crate::client::{
    AlreadyExistsSnafu, ConflictSnafu, Error, NotFoundSnafu, RequestSnafu, Result, Store,
    StoreObject, object_key,
};

const HTTP_NOT_FOUND: u16 = 404;
const HTTP_CONFLICT: u16 = 409;

/// A [`Store`] backed by the Kubernetes API.
///
/// It wraps an underlying [`kube::client::Client`] and sends every write
/// with the configured field manager.
#[derive(Clone)]
pub struct Client {
    client: KubeClient,
    post_params: PostParams,
    delete_params: DeleteParams,
}

impl Client {
    pub fn new(client: KubeClient, field_manager: Option<String>) -> Self {
        Self {
            client,
            post_params: PostParams {
                field_manager,
                ..PostParams::default()
            },
            delete_params: DeleteParams::default(),
        }
    }

    /// Returns a [`kube::client::Client`] that can be freely used.
    pub fn as_kube_client(&self) -> KubeClient {
        self.client.clone()
    }

    fn namespaced_api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// How a 409 returned by the API server is interpreted.
#[derive(Clone, Copy, Debug)]
enum OnConflict {
    AlreadyExists,
    Conflict,
}

/// Maps the status codes the engines branch on to dedicated variants.
fn classify<K: StoreObject>(
    source: kube::Error,
    namespace: &str,
    name: &str,
    on_conflict: OnConflict,
) -> Error {
    let kind = K::kind(&()).into_owned();
    let code = match &source {
        kube::Error::Api(status) => Some(status.code),
        _ => None,
    };

    match code {
        Some(HTTP_NOT_FOUND) => NotFoundSnafu {
            kind,
            namespace,
            name,
        }
        .build(),
        Some(HTTP_CONFLICT) => match on_conflict {
            OnConflict::AlreadyExists => AlreadyExistsSnafu {
                kind,
                namespace,
                name,
            }
            .build(),
            OnConflict::Conflict => ConflictSnafu {
                kind,
                namespace,
                name,
            }
            .build(),
        },
        _ => RequestSnafu {
            kind,
            namespace,
            name,
        }
        .into_error(source),
    }
}

#[async_trait]
impl Store for Client {
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object)?;
        trace!(kind = %K::kind(&()), %namespace, %name, "creating object");

        self.namespaced_api::<K>(&namespace)
            .create(&self.post_params, object)
            .await
            .map_err(|err| classify::<K>(err, &namespace, &name, OnConflict::AlreadyExists))
    }

    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K> {
        self.namespaced_api::<K>(namespace)
            .get(name)
            .await
            .map_err(|err| classify::<K>(err, namespace, name, OnConflict::Conflict))
    }

    async fn update<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object)?;
        trace!(kind = %K::kind(&()), %namespace, %name, "replacing object");

        self.namespaced_api::<K>(&namespace)
            .replace(&name, &self.post_params, object)
            .await
            .map_err(|err| classify::<K>(err, &namespace, &name, OnConflict::Conflict))
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()> {
        trace!(kind = %K::kind(&()), %namespace, %name, "deleting object");

        // Depending on the API, either the object or a Status is returned.
        // Neither is of interest here.
        self.namespaced_api::<K>(namespace)
            .delete(name, &self.delete_params)
            .await
            .map(|_| ())
            .map_err(|err| classify::<K>(err, namespace, name, OnConflict::Conflict))
    }
}
