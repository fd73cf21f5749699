use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvapi_types::{ObjectList, ObjectMeta, Resource, ResourceKind};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::context::{DeleteOptions, ListOptions, Preconditions, RequestContext};
use crate::error::{StoreError, StoreResult};
use crate::identity::{Clock, RandomUids, SystemClock, UidGenerator};
use crate::key::{validate_path_segment, KeySpace, StorageKey};
use crate::record::{next_resource_version, Record, INITIAL_RESOURCE_VERSION};
use crate::traits::{
    Getter, Storage, UpdateOptions, UpdatedObjectInfo, Updater, ValidateObjectFn,
};
use crate::watch::{EventType, WatchRegistry, WatchRelease, Watcher};

/// In-memory, HashMap-based object store for one resource kind.
///
/// The record table and the watcher registry sit behind a single `RwLock`.
/// Reads share it; every mutation and every watch registration takes it
/// exclusively, so a watcher registered before a mutation always sees that
/// mutation and one registered after never does. Fan-out happens under the
/// write lock but only enqueues, it never waits on a reader.
///
/// Values are cloned on the way in and on the way out; callers never hold
/// a reference into the table.
///
/// Update callbacks and validation hooks run while the write lock is held.
/// They must not call back into the same store.
pub struct MemoryStore<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    kind: ResourceKind,
    keys: KeySpace,
    config: StoreConfig,
    uids: Arc<dyn UidGenerator>,
    clock: Arc<dyn Clock>,
    state: RwLock<State<T>>,
}

struct State<T> {
    table: HashMap<StorageKey, Record<T>>,
    watchers: WatchRegistry<T>,
}

impl<T: Resource> WatchRelease for Shared<T> {
    fn release(&self, id: u64) {
        match self.state.write() {
            Ok(mut state) => {
                if state.watchers.remove(id) {
                    debug!(kind = %self.kind, watcher = id, "watcher released");
                }
            }
            Err(e) => {
                warn!(kind = %self.kind, watcher = id, error = %e, "cannot release watcher");
            }
        }
    }
}

/// Builder for [`MemoryStore`] with injectable collaborators.
pub struct MemoryStoreBuilder {
    kind: ResourceKind,
    config: StoreConfig,
    uids: Arc<dyn UidGenerator>,
    clock: Arc<dyn Clock>,
}

impl MemoryStoreBuilder {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            config: StoreConfig::default(),
            uids: Arc::new(RandomUids),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn uid_generator(mut self, uids: impl UidGenerator + 'static) -> Self {
        self.uids = Arc::new(uids);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build<T: Resource>(self) -> MemoryStore<T> {
        info!(
            kind = %self.kind,
            namespaced = self.kind.namespaced,
            watch_capacity = self.config.watch_capacity,
            allow_create_on_update = self.config.allow_create_on_update,
            "store created"
        );
        MemoryStore {
            shared: Arc::new(Shared {
                keys: KeySpace::new(&self.kind),
                kind: self.kind,
                config: self.config,
                uids: self.uids,
                clock: self.clock,
                state: RwLock::new(State {
                    table: HashMap::new(),
                    watchers: WatchRegistry::default(),
                }),
            }),
        }
    }
}

impl<T: Resource> MemoryStore<T> {
    /// Create an empty store with the default configuration.
    pub fn new(kind: ResourceKind) -> Self {
        MemoryStoreBuilder::new(kind).build()
    }

    pub fn with_config(kind: ResourceKind, config: StoreConfig) -> Self {
        MemoryStoreBuilder::new(kind).config(config).build()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        match self.read() {
            Ok(state) => state.table.len(),
            Err(e) => {
                warn!(kind = %self.shared.kind, error = %e, "cannot count objects");
                0
            }
        }
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        match self.read() {
            Ok(state) => state.watchers.len(),
            Err(e) => {
                warn!(kind = %self.shared.kind, error = %e, "cannot count watchers");
                0
            }
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State<T>>> {
        self.shared
            .state
            .read()
            .map_err(|e| StoreError::Internal(format!("store lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State<T>>> {
        self.shared
            .state
            .write()
            .map_err(|e| StoreError::Internal(format!("store lock poisoned: {e}")))
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::NotFound {
            kind: self.shared.kind.name.clone(),
            name: name.to_string(),
        }
    }

    fn conflict(&self, name: &str, reason: String) -> StoreError {
        StoreError::Conflict {
            kind: self.shared.kind.name.clone(),
            name: name.to_string(),
            reason,
        }
    }

    /// Namespace for a single-object call: the context namespace, empty when
    /// absent or when the kind is cluster-scoped.
    fn request_namespace<'a>(&self, ctx: &'a RequestContext) -> &'a str {
        if self.shared.keys.is_namespaced() {
            ctx.namespace_or_empty()
        } else {
            ""
        }
    }

    /// Namespace a new object is stored under. The body namespace defaults
    /// to the request namespace; the two must agree when both are set.
    fn create_namespace(&self, ctx: &RequestContext, meta: &ObjectMeta) -> StoreResult<String> {
        if !self.shared.keys.is_namespaced() {
            return Ok(String::new());
        }
        match (meta.namespace.as_str(), ctx.namespace()) {
            ("", None) => Err(StoreError::BadRequest("namespace is required".into())),
            ("", Some(ns)) => Ok(ns.to_string()),
            (own, None) => Ok(own.to_string()),
            (own, Some(ns)) if own == ns => Ok(own.to_string()),
            (own, Some(ns)) => Err(StoreError::BadRequest(format!(
                "namespace {own:?} does not match request namespace {ns:?}"
            ))),
        }
    }

    /// The body may omit its name, but must not name a different object.
    fn check_body_name(&self, meta: &ObjectMeta, name: &str) -> StoreResult<()> {
        if !meta.name.is_empty() && meta.name != name {
            return Err(StoreError::BadRequest(format!(
                "name {:?} in body does not match {name:?}",
                meta.name
            )));
        }
        Ok(())
    }

    fn check_preconditions(
        &self,
        name: &str,
        preconditions: &Preconditions,
        current: &ObjectMeta,
    ) -> StoreResult<()> {
        if let Some(uid) = &preconditions.uid {
            if *uid != current.uid {
                return Err(self.conflict(
                    name,
                    format!("precondition failed: uid {uid} does not match {}", current.uid),
                ));
            }
        }
        if let Some(rv) = &preconditions.resource_version {
            if *rv != current.resource_version {
                return Err(self.conflict(
                    name,
                    format!(
                        "precondition failed: resourceVersion {rv} does not match {}",
                        current.resource_version
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Stamp identity fields on a new object, store it, and announce it.
    /// Caller holds the write lock and has checked the key is free.
    fn insert_new(&self, state: &mut State<T>, key: StorageKey, mut object: T) -> StoreResult<T> {
        let mut meta = object.meta()?;
        meta.uid = self.shared.uids.next_uid();
        meta.creation_timestamp = Some(self.shared.clock.now());
        meta.resource_version = INITIAL_RESOURCE_VERSION.to_string();
        let namespace = meta.namespace.clone();
        let name = meta.name.clone();
        let uid = meta.uid.clone();
        object.set_meta(meta)?;

        state.watchers.broadcast(EventType::Added, &namespace, &object);
        state.table.insert(
            key.clone(),
            Record {
                namespace,
                name,
                value: object.clone(),
            },
        );
        debug!(kind = %self.shared.kind, %key, %uid, "object created");
        Ok(object)
    }
}

impl<T: Resource> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Resource> Getter<T> for MemoryStore<T> {
    fn get(&self, ctx: &RequestContext, name: &str) -> StoreResult<T> {
        let key = self.shared.keys.object_key(self.request_namespace(ctx), name)?;
        let state = self.read()?;
        state
            .table
            .get(&key)
            .map(|record| record.value.clone())
            .ok_or_else(|| self.not_found(name))
    }
}

impl<T: Resource> Updater<T> for MemoryStore<T> {
    fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        info: &dyn UpdatedObjectInfo<T>,
        options: UpdateOptions<'_, T>,
    ) -> StoreResult<(T, bool)> {
        let namespace = self.request_namespace(ctx);
        let key = self.shared.keys.object_key(namespace, name)?;

        let mut state = self.write()?;
        let existing = state.table.get(&key).map(|record| record.value.clone());

        let Some(old) = existing else {
            if !(self.shared.config.allow_create_on_update || options.force_allow_create) {
                return Err(self.not_found(name));
            }
            let mut object = info.updated_object(ctx, None)?;
            let mut meta = object.meta()?;
            self.check_body_name(&meta, name)?;
            meta.name = name.to_string();
            let resolved = self.create_namespace(ctx, &meta)?;
            if resolved != namespace {
                return Err(StoreError::BadRequest(format!(
                    "namespace {resolved:?} does not match request namespace {namespace:?}"
                )));
            }
            meta.namespace = resolved;
            object.set_meta(meta)?;
            if let Some(validate) = options.create_validation {
                validate(ctx, &object)?;
            }
            let stored = self.insert_new(&mut state, key, object)?;
            return Ok((stored, true));
        };

        let old_meta = old.meta()?;
        let mut object = info.updated_object(ctx, Some(&old))?;
        let mut meta = object.meta()?;
        self.check_body_name(&meta, name)?;
        if self.shared.keys.is_namespaced()
            && !meta.namespace.is_empty()
            && meta.namespace != old_meta.namespace
        {
            return Err(StoreError::BadRequest(format!(
                "namespace {:?} in body does not match {:?}",
                meta.namespace, old_meta.namespace
            )));
        }
        if !meta.resource_version.is_empty() && meta.resource_version != old_meta.resource_version
        {
            return Err(self.conflict(
                name,
                format!(
                    "resourceVersion {} is stale, stored object is at {}",
                    meta.resource_version, old_meta.resource_version
                ),
            ));
        }

        meta.resource_version = next_resource_version(&old_meta.resource_version)?;
        meta.name = old_meta.name.clone();
        meta.namespace = old_meta.namespace.clone();
        meta.uid = old_meta.uid.clone();
        meta.creation_timestamp = old_meta.creation_timestamp;
        let resource_version = meta.resource_version.clone();
        object.set_meta(meta)?;

        if let Some(validate) = options.update_validation {
            validate(ctx, &object, &old)?;
        }

        state
            .watchers
            .broadcast(EventType::Modified, &old_meta.namespace, &object);
        state.table.insert(
            key.clone(),
            Record {
                namespace: old_meta.namespace,
                name: old_meta.name,
                value: object.clone(),
            },
        );
        debug!(kind = %self.shared.kind, %key, %resource_version, "object updated");
        Ok((object, false))
    }
}

impl<T: Resource> Storage<T> for MemoryStore<T> {
    fn kind(&self) -> &ResourceKind {
        &self.shared.kind
    }

    fn create(
        &self,
        ctx: &RequestContext,
        mut object: T,
        validation: Option<&ValidateObjectFn<T>>,
    ) -> StoreResult<T> {
        let mut meta = object.meta()?;
        validate_path_segment("name", &meta.name)?;
        meta.namespace = self.create_namespace(ctx, &meta)?;
        let key = self.shared.keys.object_key(&meta.namespace, &meta.name)?;
        let name = meta.name.clone();
        object.set_meta(meta)?;

        if let Some(validate) = validation {
            validate(ctx, &object)?;
        }

        let mut state = self.write()?;
        if state.table.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: self.shared.kind.name.clone(),
                name,
            });
        }
        self.insert_new(&mut state, key, object)
    }

    fn list(&self, ctx: &RequestContext, options: &ListOptions) -> StoreResult<ObjectList<T>> {
        let scope = if self.shared.keys.is_namespaced() {
            options.scope(ctx)
        } else {
            None
        };

        let state = self.read()?;
        let mut matching: Vec<(&StorageKey, &Record<T>)> = state
            .table
            .iter()
            .filter(|(_, record)| record.in_scope(scope))
            .collect();
        matching.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut list = self.new_list();
        list.items = matching
            .into_iter()
            .map(|(_, record)| record.value.clone())
            .collect();
        Ok(list)
    }

    fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn<T>>,
        options: &DeleteOptions,
    ) -> StoreResult<(T, bool)> {
        let key = self.shared.keys.object_key(self.request_namespace(ctx), name)?;

        let mut state = self.write()?;
        let Some(current) = state.table.get(&key).map(|record| record.value.clone()) else {
            return Err(self.not_found(name));
        };
        if let Some(preconditions) = &options.preconditions {
            self.check_preconditions(name, preconditions, &current.meta()?)?;
        }
        if let Some(validate) = validation {
            validate(ctx, &current)?;
        }

        let Some(record) = state.table.remove(&key) else {
            return Err(self.not_found(name));
        };
        state
            .watchers
            .broadcast(EventType::Deleted, &record.namespace, &record.value);
        debug!(kind = %self.shared.kind, %key, name = %record.name, "object deleted");
        Ok((record.value, true))
    }

    fn delete_collection(
        &self,
        ctx: &RequestContext,
        validation: Option<&ValidateObjectFn<T>>,
        options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> StoreResult<ObjectList<T>> {
        let candidates = self.list(ctx, list_options)?;
        let total = candidates.len();
        let mut deleted = self.new_list();

        for item in candidates {
            let meta = match item.meta() {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(kind = %self.shared.kind, error = %e, "skipping unreadable object");
                    continue;
                }
            };
            let item_ctx = ctx.clone().with_namespace(meta.namespace.clone());
            match self.delete(&item_ctx, &meta.name, validation, options) {
                Ok((object, _)) => deleted.items.push(object),
                Err(e) if e.is_not_found() => {
                    debug!(kind = %self.shared.kind, object = %meta, "already gone");
                }
                Err(e) => {
                    warn!(kind = %self.shared.kind, object = %meta, error = %e, "delete failed");
                }
            }
        }

        info!(
            kind = %self.shared.kind,
            deleted = deleted.len(),
            total,
            "collection delete finished"
        );
        Ok(deleted)
    }

    fn watch(&self, ctx: &RequestContext, options: &ListOptions) -> StoreResult<Watcher<T>> {
        let scope = if self.shared.keys.is_namespaced() {
            options.scope(ctx).map(str::to_string)
        } else {
            None
        };
        let release: Arc<dyn WatchRelease> = self.shared.clone();
        let release = Arc::downgrade(&release);

        let mut state = self.write()?;
        Ok(state.watchers.register(
            scope,
            self.shared.config.watch_capacity,
            ctx.cancellation(),
            release,
        ))
    }
}

impl<T: Resource> fmt::Debug for MemoryStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("kind", &self.shared.kind.name)
            .field("object_count", &self.len())
            .field("watcher_count", &self.watcher_count())
            .finish()
    }
}
