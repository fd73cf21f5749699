//! Status sub-resource projection.
//!
//! A [`StatusStore`] wraps another store and narrows what an update may
//! change: the stored object is kept as-is except for the part a caller
//! supplied copier moves over from the incoming object. Everything else in
//! the body, spec fields included, is discarded.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use kvapi_types::Resource;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{StoreError, StoreResult};
use crate::traits::{Getter, Storage, UpdateOptions, UpdatedObjectInfo, Updater};

/// Copies the status portion of `src` into `dst`.
pub type CopyStatusFn<T> = dyn Fn(&T, &mut T) + Send + Sync;

/// Get and Update against the status portion of objects held by `S`.
pub struct StatusStore<T, S> {
    inner: S,
    copy_status: Arc<CopyStatusFn<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource, S: Storage<T>> StatusStore<T, S> {
    pub fn new(inner: S, copy_status: impl Fn(&T, &mut T) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            copy_status: Arc::new(copy_status),
            _marker: PhantomData,
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Turns the caller's desired object into "stored object with new status".
struct StatusUpdatedObjectInfo<'a, T> {
    info: &'a dyn UpdatedObjectInfo<T>,
    copy_status: &'a CopyStatusFn<T>,
    name: &'a str,
    kind: &'a str,
}

impl<T: Resource> UpdatedObjectInfo<T> for StatusUpdatedObjectInfo<'_, T> {
    fn updated_object(&self, ctx: &RequestContext, old: Option<&T>) -> StoreResult<T> {
        let Some(old) = old else {
            return Err(StoreError::NotFound {
                kind: self.kind.to_string(),
                name: self.name.to_string(),
            });
        };
        let desired = self.info.updated_object(ctx, Some(old))?;

        let mut result = old.clone();
        (self.copy_status)(&desired, &mut result);

        // Carry the caller's version so a stale status write still conflicts.
        let desired_rv = desired.meta()?.resource_version;
        if !desired_rv.is_empty() {
            let mut meta = result.meta()?;
            meta.resource_version = desired_rv;
            result.set_meta(meta)?;
        }
        Ok(result)
    }
}

impl<T: Resource, S: Storage<T>> Getter<T> for StatusStore<T, S> {
    fn get(&self, ctx: &RequestContext, name: &str) -> StoreResult<T> {
        self.inner.get(ctx, name)
    }
}

impl<T: Resource, S: Storage<T>> Updater<T> for StatusStore<T, S> {
    /// Replace only the status of an existing object. Never creates; the
    /// caller's create hook and create flag are ignored.
    fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        info: &dyn UpdatedObjectInfo<T>,
        options: UpdateOptions<'_, T>,
    ) -> StoreResult<(T, bool)> {
        let wrapped = StatusUpdatedObjectInfo {
            info,
            copy_status: self.copy_status.as_ref(),
            name,
            kind: &self.inner.kind().name,
        };
        let options = UpdateOptions {
            create_validation: None,
            update_validation: options.update_validation,
            force_allow_create: false,
        };
        let (object, _) = self.inner.update(ctx, name, &wrapped, options)?;
        debug!(kind = %self.inner.kind(), name, "status updated");
        Ok((object, false))
    }
}

impl<T, S: fmt::Debug> fmt::Debug for StatusStore<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
