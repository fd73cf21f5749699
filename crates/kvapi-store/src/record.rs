//! Versioned records and resource-version arithmetic.
//!
//! Resource versions are per-key decimal counters: "1" on creation, plus
//! one on every successful update. They restart at "1" when a key is
//! deleted and created again; the fresh uid, not the version, tells the
//! incarnations apart. Real etcd revisions are global and never reused,
//! so callers must not compare versions across keys or incarnations.

use crate::error::{StoreError, StoreResult};

/// Version stamped on a freshly created object.
pub const INITIAL_RESOURCE_VERSION: u64 = 1;

/// One stored object plus the identity the table indexes it by.
#[derive(Clone, Debug)]
pub(crate) struct Record<T> {
    pub namespace: String,
    pub name: String,
    pub value: T,
}

impl<T> Record<T> {
    /// Whether the record falls inside a list/watch scope.
    pub fn in_scope(&self, namespace: Option<&str>) -> bool {
        namespace.map_or(true, |ns| self.namespace == ns)
    }
}

/// Parse a stored resource version.
///
/// A stored version that is not a decimal counter means the table was
/// corrupted; this is reported, never silently reset.
pub fn parse_resource_version(raw: &str) -> StoreResult<u64> {
    raw.parse::<u64>().map_err(|_| {
        StoreError::Internal(format!("stored resourceVersion {raw:?} is not a counter"))
    })
}

/// The version that follows `raw`.
pub fn next_resource_version(raw: &str) -> StoreResult<String> {
    let current = parse_resource_version(raw)?;
    let next = current
        .checked_add(1)
        .ok_or_else(|| StoreError::Internal(format!("resourceVersion {raw} overflowed")))?;
    Ok(next.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_by_one() {
        assert_eq!(next_resource_version("1").unwrap(), "2");
        assert_eq!(next_resource_version("41").unwrap(), "42");
    }

    #[test]
    fn corrupt_versions_are_internal_errors() {
        for raw in ["", "abc", "-1", "1.5", "0x10"] {
            let err = next_resource_version(raw).unwrap_err();
            assert!(err.is_internal(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn overflow_is_internal_error() {
        let err = next_resource_version(&u64::MAX.to_string()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn scope_filter() {
        let rec = Record {
            namespace: "ns1".to_string(),
            name: "a".to_string(),
            value: (),
        };
        assert!(rec.in_scope(None));
        assert!(rec.in_scope(Some("ns1")));
        assert!(!rec.in_scope(Some("ns2")));
    }
}
