//! Storage interfaces shared by the in-memory store and its decorators.

use kvapi_types::{ObjectList, Resource, ResourceKind};

use crate::context::{DeleteOptions, ListOptions, RequestContext};
use crate::error::StoreResult;
use crate::watch::Watcher;

/// Create-time veto: `(ctx, candidate) -> error`.
pub type ValidateObjectFn<T> = dyn Fn(&RequestContext, &T) -> StoreResult<()> + Send + Sync;

/// Update-time veto: `(ctx, new, old) -> error`.
pub type ValidateObjectUpdateFn<T> =
    dyn Fn(&RequestContext, &T, &T) -> StoreResult<()> + Send + Sync;

/// Produces the desired new value of an object from its current value.
///
/// `old` is a private copy of the stored object, or `None` when nothing is
/// stored under the key. The returned value replaces the stored one in
/// full; the store computes no patches.
pub trait UpdatedObjectInfo<T>: Send + Sync {
    fn updated_object(&self, ctx: &RequestContext, old: Option<&T>) -> StoreResult<T>;
}

/// Replaces the stored object with a fixed value.
#[derive(Clone, Debug)]
pub struct DefaultUpdatedObjectInfo<T>(pub T);

impl<T: Clone + Send + Sync> UpdatedObjectInfo<T> for DefaultUpdatedObjectInfo<T> {
    fn updated_object(&self, _ctx: &RequestContext, _old: Option<&T>) -> StoreResult<T> {
        Ok(self.0.clone())
    }
}

/// Adapts a closure into an [`UpdatedObjectInfo`].
pub struct UpdateFn<F>(pub F);

impl<T, F> UpdatedObjectInfo<T> for UpdateFn<F>
where
    F: Fn(&RequestContext, Option<&T>) -> StoreResult<T> + Send + Sync,
{
    fn updated_object(&self, ctx: &RequestContext, old: Option<&T>) -> StoreResult<T> {
        (self.0)(ctx, old)
    }
}

/// Hooks and flags for a single update call.
pub struct UpdateOptions<'a, T> {
    /// Runs when the update turns into a create.
    pub create_validation: Option<&'a ValidateObjectFn<T>>,
    /// Runs before an existing object is overwritten.
    pub update_validation: Option<&'a ValidateObjectUpdateFn<T>>,
    /// Create the object if absent, even if the store is not configured to.
    pub force_allow_create: bool,
}

impl<T> Default for UpdateOptions<'_, T> {
    fn default() -> Self {
        Self {
            create_validation: None,
            update_validation: None,
            force_allow_create: false,
        }
    }
}

impl<T> Clone for UpdateOptions<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UpdateOptions<'_, T> {}

/// Single-object read.
pub trait Getter<T: Resource>: Send + Sync {
    /// Return a copy of the named object in the context namespace.
    fn get(&self, ctx: &RequestContext, name: &str) -> StoreResult<T>;
}

/// Single-object read-modify-write.
pub trait Updater<T: Resource>: Send + Sync {
    /// Apply `info` to the named object. Returns the stored value and
    /// whether the call created it.
    fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        info: &dyn UpdatedObjectInfo<T>,
        options: UpdateOptions<'_, T>,
    ) -> StoreResult<(T, bool)>;
}

/// The full object store surface for one resource kind.
pub trait Storage<T: Resource>: Getter<T> + Updater<T> {
    /// The kind this store serves.
    fn kind(&self) -> &ResourceKind;

    /// Zero value handed to request decoders.
    fn new_object(&self) -> T {
        T::default()
    }

    /// Empty list of this kind.
    fn new_list(&self) -> ObjectList<T> {
        ObjectList::empty(self.kind().name.clone())
    }

    fn create(
        &self,
        ctx: &RequestContext,
        object: T,
        validation: Option<&ValidateObjectFn<T>>,
    ) -> StoreResult<T>;

    fn list(&self, ctx: &RequestContext, options: &ListOptions) -> StoreResult<ObjectList<T>>;

    /// Remove the named object. Returns the last stored value and whether
    /// it was deleted.
    fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn<T>>,
        options: &DeleteOptions,
    ) -> StoreResult<(T, bool)>;

    /// Best-effort delete of every object in scope. Returns what was
    /// actually deleted.
    fn delete_collection(
        &self,
        ctx: &RequestContext,
        validation: Option<&ValidateObjectFn<T>>,
        options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> StoreResult<ObjectList<T>>;

    fn watch(&self, ctx: &RequestContext, options: &ListOptions) -> StoreResult<Watcher<T>>;
}
