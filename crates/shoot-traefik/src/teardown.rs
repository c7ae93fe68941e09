//! Removes everything [`converge::apply`](crate::converge::apply) persisted
//! for a target.
use k8s_openapi::api::core::v1::Secret;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, instrument};

use crate::{
    client::{self, Store, StoreObject},
    converge::MANAGED_RESOURCE_NAME,
    crd::ManagedResource,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to delete {kind} {namespace}/{name}"))]
    Delete {
        source: client::Error,
        kind: String,
        namespace: String,
        name: String,
    },
}

/// Deletes the [`ManagedResource`] and then the bundle Secret of
/// `namespace`.
///
/// Objects which do not exist are skipped, so this can be called any number
/// of times, also after an interrupted earlier call.
#[instrument(skip(store))]
pub async fn remove<S: Store>(store: &S, namespace: &str) -> Result<()> {
    delete_if_exists::<S, ManagedResource>(store, namespace, MANAGED_RESOURCE_NAME).await?;
    delete_if_exists::<S, Secret>(store, namespace, MANAGED_RESOURCE_NAME).await?;

    info!("removed traefik resources");
    Ok(())
}

async fn delete_if_exists<S, K>(store: &S, namespace: &str, name: &str) -> Result<()>
where
    S: Store,
    K: StoreObject,
{
    let kind = K::kind(&());
    match store.delete::<K>(namespace, name).await {
        Ok(()) => {
            debug!(%kind, name, "deleted");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            debug!(%kind, name, "already absent");
            Ok(())
        }
        Err(err) => Err(err).context(DeleteSnafu {
            kind,
            namespace,
            name,
        }),
    }
}
