use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use snafu::{OptionExt, ResultExt, ensure};

use crate::client::{
    AlreadyExistsSnafu, CodecSnafu, ConflictSnafu, NotFoundSnafu, Result, Store, StoreObject,
    UnavailableSnafu, object_key,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
}

/// A call made to a [`MemoryStore`], successful or not.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedOperation {
    pub operation: Operation,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct ObjectKey {
    api_version: String,
    kind: String,
    namespace: String,
    name: String,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectKey, serde_json::Value>,
    last_resource_version: u64,
    operations: Vec<RecordedOperation>,
    failures: BTreeSet<(Operation, String)>,
}

/// A [`Store`] keeping objects in memory.
///
/// It assigns increasing resource versions on every write, rejects stale
/// updates and records every call. Failures can be injected per operation
/// and kind with [`MemoryStore::fail_on`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following `operation` on objects of `kind` fails with
    /// [`Error::Unavailable`](crate::client::Error::Unavailable).
    pub fn fail_on(&self, operation: Operation, kind: &str) {
        self.lock().failures.insert((operation, kind.to_owned()));
    }

    /// All calls made so far, in order.
    pub fn operations(&self) -> Vec<RecordedOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Whether an object of type `K` is stored under `namespace`/`name`.
    pub fn contains<K: StoreObject>(&self, namespace: &str, name: &str) -> bool {
        self.lock()
            .objects
            .contains_key(&key::<K>(namespace, name))
    }

    /// The number of stored objects, of any type.
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key<K: StoreObject>(namespace: &str, name: &str) -> ObjectKey {
    ObjectKey {
        api_version: K::api_version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
        namespace: namespace.to_owned(),
        name: name.to_owned(),
    }
}

impl State {
    /// Records the call and fails if a failure was injected for it.
    fn record(&mut self, operation: Operation, key: &ObjectKey) -> Result<()> {
        self.operations.push(RecordedOperation {
            operation,
            kind: key.kind.clone(),
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        });

        ensure!(
            !self.failures.contains(&(operation, key.kind.clone())),
            UnavailableSnafu {
                kind: &key.kind,
                namespace: &key.namespace,
                name: &key.name,
            }
        );
        Ok(())
    }

    fn next_resource_version(&mut self) -> String {
        self.last_resource_version += 1;
        self.last_resource_version.to_string()
    }

    fn decode<K: StoreObject>(key: &ObjectKey, value: &serde_json::Value) -> Result<K> {
        serde_json::from_value(value.clone()).context(CodecSnafu {
            kind: &key.kind,
            namespace: &key.namespace,
            name: &key.name,
        })
    }

    fn store<K: StoreObject>(&mut self, key: ObjectKey, mut object: K) -> Result<K> {
        object.meta_mut().resource_version = Some(self.next_resource_version());
        let value = serde_json::to_value(&object).context(CodecSnafu {
            kind: &key.kind,
            namespace: &key.namespace,
            name: &key.name,
        })?;
        self.objects.insert(key, value);
        Ok(object)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object)?;
        let key = key::<K>(&namespace, &name);
        let mut state = self.lock();
        state.record(Operation::Create, &key)?;

        ensure!(
            !state.objects.contains_key(&key),
            AlreadyExistsSnafu {
                kind: &key.kind,
                namespace,
                name,
            }
        );

        state.store(key, object.clone())
    }

    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K> {
        let key = key::<K>(namespace, name);
        let mut state = self.lock();
        state.record(Operation::Get, &key)?;

        let value = state.objects.get(&key).context(NotFoundSnafu {
            kind: &key.kind,
            namespace,
            name,
        })?;
        State::decode(&key, value)
    }

    async fn update<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object)?;
        let key = key::<K>(&namespace, &name);
        let mut state = self.lock();
        state.record(Operation::Update, &key)?;

        let stored = state.objects.get(&key).context(NotFoundSnafu {
            kind: &key.kind,
            namespace: &namespace,
            name: &name,
        })?;
        let stored: K = State::decode(&key, stored)?;

        if let Some(resource_version) = &object.meta().resource_version {
            ensure!(
                stored.meta().resource_version.as_ref() == Some(resource_version),
                ConflictSnafu {
                    kind: &key.kind,
                    namespace,
                    name,
                }
            );
        }

        state.store(key, object.clone())
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()> {
        let key = key::<K>(namespace, name);
        let mut state = self.lock();
        state.record(Operation::Delete, &key)?;

        state.objects.remove(&key).context(NotFoundSnafu {
            kind: &key.kind,
            namespace,
            name,
        })?;
        Ok(())
    }
}
