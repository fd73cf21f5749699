use std::fmt;

use serde::{Deserialize, Serialize};

/// Describes one resource kind served by a store.
///
/// Supplied once when a store is constructed and immutable afterwards. The
/// name is used in error messages and as the key prefix that keeps kinds
/// apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKind {
    /// Plural resource name, e.g. `widgets`.
    pub name: String,
    /// Whether object identity includes a namespace.
    pub namespaced: bool,
}

impl ResourceKind {
    /// A kind whose objects live in namespaces.
    pub fn namespaced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaced: true,
        }
    }

    /// A kind whose objects are global to the store.
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaced: false,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
