//! Foundation types for kvapi.
//!
//! This crate provides the identity and structural types shared by every
//! other kvapi crate. The store itself never inspects an object beyond the
//! accessors defined here.
//!
//! # Key Types
//!
//! - [`ObjectMeta`] -- Identity fields: name, namespace, uid, creation time, resource version
//! - [`Resource`] -- Accessor trait the store uses to read and stamp identity fields
//! - [`ResourceKind`] -- Type identifier plus namespaced/cluster-scoped flag
//! - [`ObjectList`] -- Generic list type returned by list operations
//! - [`DynamicObject`] -- Schemaless JSON-backed resource

pub mod dynamic;
pub mod error;
pub mod kind;
pub mod list;
pub mod meta;
pub mod resource;

pub use dynamic::DynamicObject;
pub use error::TypeError;
pub use kind::ResourceKind;
pub use list::ObjectList;
pub use meta::ObjectMeta;
pub use resource::Resource;
