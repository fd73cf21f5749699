//! In-memory object storage for API resources.
//!
//! This crate implements an etcd-like store that keeps every object of one
//! resource kind in a process-local table, keyed by namespace and name, and
//! announces each successful mutation to live watchers.
//!
//! # Operations
//!
//! All stores implement the [`Storage`] trait:
//!
//! - [`MemoryStore`] -- `HashMap`-based store with a single exclusivity domain
//! - [`StatusStore`] -- decorator limiting updates to an object's status
//!
//! # Rules
//!
//! 1. Every create stamps a fresh uid, a creation timestamp and version "1".
//! 2. Every successful update bumps the version by one; failed calls change nothing.
//! 3. Callers only ever see copies; nothing hands out references into the table.
//! 4. Watchers see mutations committed after they registered, in commit order.
//! 5. A slow watcher loses events; it never stalls a writer.

pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod key;
pub mod memory;
pub mod record;
pub mod status;
pub mod traits;
pub mod watch;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{StoreConfig, DEFAULT_WATCH_CAPACITY};
pub use context::{DeleteOptions, ListOptions, Preconditions, RequestContext};
pub use error::{StoreError, StoreResult};
pub use identity::{Clock, RandomUids, SteppingClock, SystemClock, UidGenerator};
pub use key::{KeySpace, StorageKey};
pub use memory::{MemoryStore, MemoryStoreBuilder};
pub use status::{CopyStatusFn, StatusStore};
pub use traits::{
    DefaultUpdatedObjectInfo, Getter, Storage, UpdateFn, UpdateOptions, UpdatedObjectInfo,
    Updater, ValidateObjectFn, ValidateObjectUpdateFn,
};
pub use watch::{EventType, WatchEvent, Watcher};
