//! The serialized resource bundle of one reconciliation and its content
//! [`Fingerprint`].
use std::{collections::BTreeMap, fmt::Display};

use k8s_openapi::ByteString;
use serde::Serialize;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize bundle entry {key:?}"))]
    SerializeEntry {
        source: serde_yaml::Error,
        key: String,
    },
}

/// Maps a file-like key, e.g. `deployment.yaml`, to the serialized object.
///
/// Entries are kept sorted by key, so iteration order and the
/// [`Fingerprint`] only depend on the content.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceBundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `object` as YAML and stores it under `key`, replacing any
    /// previous entry.
    pub fn insert_yaml<T: Serialize>(&mut self, key: impl Into<String>, object: &T) -> Result<()> {
        let key = key.into();
        let yaml = serde_yaml::to_string(object).context(SerializeEntrySnafu { key: &key })?;
        self.entries.insert(key, yaml.into_bytes());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_entries(self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
    }

    /// The bundle as Secret data.
    pub fn to_secret_data(&self) -> BTreeMap<String, ByteString> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), ByteString(value.clone())))
            .collect()
    }
}

/// The lowercase hex SHA-256 digest over all keys and values of a bundle,
/// in key order. Every key and value is prefixed with its length.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// `entries` must be sorted by key.
    fn of_entries<'a>(entries: impl Iterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut hasher = Sha256::new();
        for part in entries.flat_map(|(key, value)| [key.as_bytes(), value]) {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Computes the fingerprint of Secret data, e.g. of a stored bundle.
    pub fn of_secret_data(data: &BTreeMap<String, ByteString>) -> Self {
        Self::of_entries(data.iter().map(|(k, v)| (k.as_str(), v.0.as_slice())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn bundle(entries: &[(&str, &str)]) -> ResourceBundle {
        let mut bundle = ResourceBundle::new();
        for (key, value) in entries {
            bundle
                .insert_yaml(*key, &BTreeMap::from([("value", *value)]))
                .expect("entry must serialize");
        }
        bundle
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let a = bundle(&[("a.yaml", "1"), ("b.yaml", "2")]);
        let b = bundle(&[("b.yaml", "2"), ("a.yaml", "1")]);

        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = bundle(&[("a.yaml", "1")]);
        let b = bundle(&[("a.yaml", "2")]);

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_separates_keys_from_values() {
        let a = Fingerprint::of_entries([("ab", "c".as_bytes())].into_iter());
        let b = Fingerprint::of_entries([("a", "bc".as_bytes())].into_iter());

        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_of_secret_data_matches() {
        let bundle = bundle(&[("a.yaml", "1"), ("b.yaml", "2")]);

        assert_eq!(
            Fingerprint::of_secret_data(&bundle.to_secret_data()),
            bundle.fingerprint()
        );
    }

    #[test]
    fn entries_are_yaml() {
        let bundle = bundle(&[("a.yaml", "1")]);

        assert_eq!(bundle.get("a.yaml"), Some("value: '1'\n".as_bytes()));
        assert_eq!(bundle.keys().collect::<Vec<_>>(), ["a.yaml"]);
        assert_eq!(bundle.len(), 1);
    }
}
