//! Key space: deterministic mapping from object identity to storage key.
//!
//! Namespaced kinds key objects as `/{kind}/{namespace}/{name}`, cluster-scoped
//! kinds as `/{kind}/{name}`. The kind prefix keeps kinds apart should two
//! stores ever share a table.

use std::fmt;

use kvapi_types::ResourceKind;

use crate::error::{StoreError, StoreResult};

/// A storage key derived by [`KeySpace`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct KeySpace {
    prefix: String,
    namespaced: bool,
}

impl KeySpace {
    pub fn new(kind: &ResourceKind) -> Self {
        Self {
            prefix: format!("/{}", kind.name),
            namespaced: kind.namespaced,
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    /// Derive the key for an object. Cluster-scoped key spaces ignore
    /// `namespace`.
    pub fn object_key(&self, namespace: &str, name: &str) -> StoreResult<StorageKey> {
        validate_path_segment("name", name)?;
        if self.namespaced {
            if !namespace.is_empty() {
                validate_path_segment("namespace", namespace)?;
            }
            Ok(StorageKey(format!("{}/{}/{}", self.prefix, namespace, name)))
        } else {
            Ok(StorageKey(format!("{}/{}", self.prefix, name)))
        }
    }
}

/// Names end up as key path segments, so they must be non-empty and
/// slash-free, and may not be a relative path component.
pub fn validate_path_segment(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::BadRequest(format!("{field} is required")));
    }
    if value == "." || value == ".." {
        return Err(StoreError::BadRequest(format!(
            "{field} may not be \"{value}\""
        )));
    }
    if value.contains('/') {
        return Err(StoreError::BadRequest(format!(
            "{field} \"{value}\" may not contain '/'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_keys_include_namespace() {
        let keys = KeySpace::new(&ResourceKind::namespaced("widgets"));
        assert_eq!(keys.object_key("ns", "a").unwrap().as_str(), "/widgets/ns/a");
        assert_eq!(keys.object_key("", "a").unwrap().as_str(), "/widgets//a");
    }

    #[test]
    fn cluster_scoped_keys_ignore_namespace() {
        let keys = KeySpace::new(&ResourceKind::cluster_scoped("nodes"));
        assert_eq!(keys.object_key("ns", "n1").unwrap(), keys.object_key("", "n1").unwrap());
        assert_eq!(keys.object_key("", "n1").unwrap().as_str(), "/nodes/n1");
    }

    #[test]
    fn empty_name_is_bad_request() {
        let keys = KeySpace::new(&ResourceKind::namespaced("widgets"));
        let err = keys.object_key("ns", "").unwrap_err();
        assert_eq!(err, StoreError::BadRequest("name is required".into()));
    }

    #[test]
    fn rejects_unsafe_segments() {
        let keys = KeySpace::new(&ResourceKind::namespaced("widgets"));
        assert!(keys.object_key("ns", "a/b").unwrap_err().is_bad_request());
        assert!(keys.object_key("ns", "..").unwrap_err().is_bad_request());
        assert!(keys.object_key("n/s", "a").unwrap_err().is_bad_request());
    }

    #[test]
    fn kinds_do_not_collide() {
        let a = KeySpace::new(&ResourceKind::namespaced("widgets"));
        let b = KeySpace::new(&ResourceKind::namespaced("gadgets"));
        assert_ne!(a.object_key("ns", "x").unwrap(), b.object_key("ns", "x").unwrap());
    }
}
