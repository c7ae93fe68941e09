//! Converges a target namespace to hold the current [`ResourceBundle`].
//!
//! Two objects are persisted per target, both named
//! [`MANAGED_RESOURCE_NAME`]: an Opaque [`Secret`] with the bundle as data
//! and its [`Fingerprint`](crate::bundle::Fingerprint) as annotation, and a
//! [`ManagedResource`] referencing that Secret. The Secret is always written
//! first, so the [`ManagedResource`] never references a missing bundle.
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use kube::Resource;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, instrument};

use crate::{
    builder::meta::ObjectMetaBuilder,
    bundle::ResourceBundle,
    client::{self, Store, StoreObject},
    crd::{ManagedResource, ManagedResourceSpec, SecretReference},
    kvp::{DATA_CHECKSUM_ANNOTATION, NO_CLEANUP_LABEL},
};

/// The name of the bundle Secret and of the [`ManagedResource`].
pub const MANAGED_RESOURCE_NAME: &str = "extension-shoot-traefik";

const SECRET_TYPE_OPAQUE: &str = "Opaque";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create {kind} {namespace}/{name}"))]
    Create {
        source: client::Error,
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("failed to fetch existing {kind} {namespace}/{name}"))]
    FetchExisting {
        source: client::Error,
        kind: String,
        namespace: String,
        name: String,
    },

    #[snafu(display("failed to update {kind} {namespace}/{name}"))]
    Update {
        source: client::Error,
        kind: String,
        namespace: String,
        name: String,
    },
}

/// What happened to a single persisted object.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// The [`Outcome`]s of one [`apply`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Applied {
    pub secret: Outcome,
    pub managed_resource: Outcome,
}

/// The bundle Secret of `namespace` holding `bundle`.
pub fn bundle_secret(bundle: &ResourceBundle, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMetaBuilder::new()
            .name(MANAGED_RESOURCE_NAME)
            .namespace(namespace)
            .with_annotation(DATA_CHECKSUM_ANNOTATION, bundle.fingerprint().as_str())
            .build(),
        data: Some(bundle.to_secret_data()),
        type_: Some(SECRET_TYPE_OPAQUE.to_owned()),
        ..Secret::default()
    }
}

/// The [`ManagedResource`] of `namespace` referencing the bundle Secret.
pub fn managed_resource(namespace: &str) -> ManagedResource {
    let mut managed_resource = ManagedResource::new(MANAGED_RESOURCE_NAME, ManagedResourceSpec {
        secret_refs: vec![SecretReference {
            name: MANAGED_RESOURCE_NAME.to_owned(),
        }],
        inject_labels: Some(BTreeMap::from([(
            NO_CLEANUP_LABEL.to_owned(),
            "true".to_owned(),
        )])),
        keep_objects: Some(false),
    });
    managed_resource.metadata.namespace = Some(namespace.to_owned());
    managed_resource
}

/// Creates or updates the bundle Secret and the [`ManagedResource`] in
/// `namespace`.
///
/// Applying an unchanged bundle again leaves both objects untouched. Any
/// store failure other than "already exists" on create aborts the call;
/// it is not retried.
#[instrument(skip(store, bundle), fields(fingerprint = %bundle.fingerprint()))]
pub async fn apply<S: Store>(store: &S, bundle: &ResourceBundle, namespace: &str) -> Result<Applied> {
    let secret = create_or_update(store, &bundle_secret(bundle, namespace), secret_in_sync).await?;
    let managed_resource =
        create_or_update(store, &managed_resource(namespace), managed_resource_in_sync).await?;

    Ok(Applied {
        secret,
        managed_resource,
    })
}

/// Creates `desired`. If it exists already, the live object is fetched and
/// replaced with `desired` carrying the live `resourceVersion`, unless
/// `in_sync` reports that the live object matches `desired`.
async fn create_or_update<S, K>(store: &S, desired: &K, in_sync: fn(&K, &K) -> bool) -> Result<Outcome>
where
    S: Store,
    K: StoreObject,
{
    let kind = K::kind(&()).into_owned();
    let namespace = desired.meta().namespace.clone().unwrap_or_default();
    let name = desired.meta().name.clone().unwrap_or_default();

    let err = match store.create(desired).await {
        Ok(_) => {
            info!(%kind, %namespace, %name, "created");
            return Ok(Outcome::Created);
        }
        Err(err) => err,
    };
    if !err.is_already_exists() {
        return Err(err).context(CreateSnafu {
            kind,
            namespace,
            name,
        });
    }

    let live: K = store
        .get(&namespace, &name)
        .await
        .context(FetchExistingSnafu {
            kind: &kind,
            namespace: &namespace,
            name: &name,
        })?;

    if in_sync(&live, desired) {
        debug!(%kind, %namespace, %name, "already up to date");
        return Ok(Outcome::Unchanged);
    }

    let mut update = desired.clone();
    update.meta_mut().resource_version = live.meta().resource_version.clone();
    store.update(&update).await.context(UpdateSnafu {
        kind: &kind,
        namespace: &namespace,
        name: &name,
    })?;

    info!(%kind, %namespace, %name, "updated");
    Ok(Outcome::Updated)
}

fn secret_in_sync(live: &Secret, desired: &Secret) -> bool {
    let checksum = |secret: &Secret| {
        secret
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(DATA_CHECKSUM_ANNOTATION))
            .cloned()
    };

    live.type_ == desired.type_ && live.data == desired.data && checksum(live) == checksum(desired)
}

fn managed_resource_in_sync(live: &ManagedResource, desired: &ManagedResource) -> bool {
    live.spec == desired.spec
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::ConfigMap;
    use rstest::rstest;

    use super::*;
    use crate::{
        bundle::Fingerprint,
        client::{MemoryStore, Operation},
    };

    const NAMESPACE: &str = "shoot--dev--test";

    fn bundle(replicas: &str) -> ResourceBundle {
        let mut bundle = ResourceBundle::new();
        bundle
            .insert_yaml("configmap.yaml", &ConfigMap {
                data: Some(BTreeMap::from([("replicas".to_owned(), replicas.to_owned())])),
                ..ConfigMap::default()
            })
            .expect("entry must serialize");
        bundle
    }

    fn operations(store: &MemoryStore) -> Vec<(Operation, String)> {
        store
            .operations()
            .into_iter()
            .map(|op| (op.operation, op.kind))
            .collect()
    }

    #[tokio::test]
    async fn first_apply_creates_both_objects() {
        let store = MemoryStore::new();

        let applied = apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect("apply must succeed");

        assert_eq!(applied, Applied {
            secret: Outcome::Created,
            managed_resource: Outcome::Created,
        });
        assert_eq!(operations(&store), [
            (Operation::Create, "Secret".to_owned()),
            (Operation::Create, "ManagedResource".to_owned()),
        ]);

        let secret: Secret = store
            .get(NAMESPACE, MANAGED_RESOURCE_NAME)
            .await
            .expect("secret must exist");
        let data = secret.data.expect("secret must have data");
        assert_eq!(
            secret
                .metadata
                .annotations
                .and_then(|annotations| annotations.get(DATA_CHECKSUM_ANNOTATION).cloned()),
            Some(Fingerprint::of_secret_data(&data).to_string())
        );

        let managed_resource: ManagedResource = store
            .get(NAMESPACE, MANAGED_RESOURCE_NAME)
            .await
            .expect("managed resource must exist");
        assert_eq!(managed_resource.spec.secret_refs, [SecretReference {
            name: MANAGED_RESOURCE_NAME.to_owned()
        }]);
        assert_eq!(managed_resource.spec.keep_objects, Some(false));
    }

    #[tokio::test]
    async fn repeated_apply_is_a_no_op() {
        let store = MemoryStore::new();
        apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect("first apply must succeed");
        store.clear_operations();

        let applied = apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect("second apply must succeed");

        assert_eq!(applied, Applied {
            secret: Outcome::Unchanged,
            managed_resource: Outcome::Unchanged,
        });
        assert!(
            operations(&store)
                .iter()
                .all(|(operation, _)| *operation != Operation::Update)
        );
    }

    #[tokio::test]
    async fn changed_bundle_updates_only_the_secret() {
        let store = MemoryStore::new();
        apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect("first apply must succeed");

        let changed = bundle("3");
        let applied = apply(&store, &changed, NAMESPACE)
            .await
            .expect("second apply must succeed");

        assert_eq!(applied, Applied {
            secret: Outcome::Updated,
            managed_resource: Outcome::Unchanged,
        });
        let secret: Secret = store
            .get(NAMESPACE, MANAGED_RESOURCE_NAME)
            .await
            .expect("secret must exist");
        assert_eq!(secret.data, Some(changed.to_secret_data()));
    }

    #[rstest]
    #[case::create(Operation::Create, "Secret")]
    #[case::create_managed_resource(Operation::Create, "ManagedResource")]
    #[tokio::test]
    async fn create_failures_are_fatal(#[case] operation: Operation, #[case] kind: &str) {
        let store = MemoryStore::new();
        store.fail_on(operation, kind);

        let err = apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect_err("apply must fail");

        assert!(matches!(err, Error::Create { .. }), "{err:?}");
        assert!(err.to_string().contains(kind));
    }

    #[tokio::test]
    async fn failed_update_is_fatal() {
        let store = MemoryStore::new();
        apply(&store, &bundle("2"), NAMESPACE)
            .await
            .expect("first apply must succeed");
        store.fail_on(Operation::Update, "Secret");

        let err = apply(&store, &bundle("3"), NAMESPACE)
            .await
            .expect_err("apply must fail");

        assert!(matches!(err, Error::Update { .. }), "{err:?}");
        assert!(!store.operations().iter().any(|op| {
            op.kind == "ManagedResource" && op.operation == Operation::Update
        }));
    }
}
