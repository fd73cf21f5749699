//! Operation scripts: a JSON array of store calls replayed in order.
//!
//! ```json
//! [
//!   {"op": "create", "namespace": "ns", "object": {"metadata": {"name": "a"}, "foo": "x"}},
//!   {"op": "update-status", "namespace": "ns", "name": "a", "object": {"status": {"phase": "Ready"}}},
//!   {"op": "delete", "namespace": "ns", "name": "a"}
//! ]
//! ```

use std::path::Path;

use anyhow::Context;
use kvapi_store::{
    DefaultUpdatedObjectInfo, DeleteOptions, Getter, ListOptions, MemoryStore, Preconditions,
    RequestContext, StatusStore, Storage, StoreResult, UpdateOptions, Updater, WatchEvent,
};
use kvapi_types::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    Create {
        #[serde(default)]
        namespace: Option<String>,
        object: Value,
    },
    Get {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
    },
    List {
        #[serde(default)]
        namespace: Option<String>,
    },
    Update {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        object: Value,
        #[serde(default)]
        allow_create: bool,
    },
    UpdateStatus {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        object: Value,
    },
    Delete {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        #[serde(default)]
        uid: Option<String>,
        #[serde(default)]
        resource_version: Option<String>,
    },
    DeleteCollection {
        #[serde(default)]
        namespace: Option<String>,
    },
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Get { .. } => "get",
            Self::List { .. } => "list",
            Self::Update { .. } => "update",
            Self::UpdateStatus { .. } => "update-status",
            Self::Delete { .. } => "delete",
            Self::DeleteCollection { .. } => "delete-collection",
        }
    }

    fn namespace(&self) -> Option<&str> {
        match self {
            Self::Create { namespace, .. }
            | Self::Get { namespace, .. }
            | Self::List { namespace }
            | Self::Update { namespace, .. }
            | Self::UpdateStatus { namespace, .. }
            | Self::Delete { namespace, .. }
            | Self::DeleteCollection { namespace } => namespace.as_deref(),
        }
    }
}

/// Parse a script from JSON text.
pub fn parse(text: &str) -> anyhow::Result<Vec<Operation>> {
    serde_json::from_str(text).context("script must be a JSON array of operations")
}

/// Read and parse a script file.
pub fn load(path: &Path) -> anyhow::Result<Vec<Operation>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing script {}", path.display()))
}

/// Result of one replayed operation.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<DynamicObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a replay produced.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub events: Vec<WatchEvent<DynamicObject>>,
    pub dropped_events: u64,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.succeeded()).count()
    }
}

/// Outcome of a single call before it is folded into a [`StepReport`].
struct Outcome {
    created: Option<bool>,
    objects: Vec<DynamicObject>,
}

impl Outcome {
    fn one(object: DynamicObject) -> Self {
        Self {
            created: None,
            objects: vec![object],
        }
    }

    fn many(objects: Vec<DynamicObject>) -> Self {
        Self {
            created: None,
            objects,
        }
    }
}

/// Replay `operations` against `store`, with a cluster-wide watch opened
/// before the first step. Failed steps are recorded and replay continues.
pub async fn replay(
    store: &MemoryStore<DynamicObject>,
    operations: &[Operation],
) -> anyhow::Result<RunReport> {
    let status = StatusStore::new(store.clone(), DynamicObject::copy_status);
    let mut watcher = store
        .watch(&RequestContext::new(), &ListOptions::default())
        .context("opening watch")?;

    let mut steps = Vec::with_capacity(operations.len());
    for (index, op) in operations.iter().enumerate() {
        let step = index + 1;
        let ctx = RequestContext::new().with_namespace(op.namespace().unwrap_or_default());
        let report = match apply(store, &status, &ctx, op) {
            Ok(outcome) => StepReport {
                step,
                op: op.label(),
                created: outcome.created,
                objects: outcome.objects,
                error: None,
            },
            Err(e) => {
                debug!(step, op = op.label(), error = %e, "step failed");
                StepReport {
                    step,
                    op: op.label(),
                    created: None,
                    objects: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        steps.push(report);
    }

    let dropped_events = watcher.dropped();
    watcher.stop();
    let mut events = Vec::new();
    while let Some(event) = watcher.next().await {
        events.push(event);
    }

    Ok(RunReport {
        steps,
        events,
        dropped_events,
    })
}

fn apply(
    store: &MemoryStore<DynamicObject>,
    status: &StatusStore<DynamicObject, MemoryStore<DynamicObject>>,
    ctx: &RequestContext,
    op: &Operation,
) -> StoreResult<Outcome> {
    match op {
        Operation::Create { object, .. } => store
            .create(ctx, DynamicObject::new(object.clone()), None)
            .map(Outcome::one),
        Operation::Get { name, .. } => store.get(ctx, name).map(Outcome::one),
        Operation::List { .. } => store
            .list(ctx, &ListOptions::default())
            .map(|list| Outcome::many(list.items)),
        Operation::Update {
            name,
            object,
            allow_create,
            ..
        } => {
            let options = UpdateOptions {
                force_allow_create: *allow_create,
                ..Default::default()
            };
            let info = DefaultUpdatedObjectInfo(DynamicObject::new(object.clone()));
            let (object, created) = store.update(ctx, name, &info, options)?;
            Ok(Outcome {
                created: Some(created),
                objects: vec![object],
            })
        }
        Operation::UpdateStatus { name, object, .. } => {
            let info = DefaultUpdatedObjectInfo(DynamicObject::new(object.clone()));
            let (object, _) = status.update(ctx, name, &info, UpdateOptions::default())?;
            Ok(Outcome::one(object))
        }
        Operation::Delete {
            name,
            uid,
            resource_version,
            ..
        } => {
            let preconditions = (uid.is_some() || resource_version.is_some()).then(|| Preconditions {
                uid: uid.clone(),
                resource_version: resource_version.clone(),
            });
            let (object, _) = store.delete(ctx, name, None, &DeleteOptions { preconditions })?;
            Ok(Outcome::one(object))
        }
        Operation::DeleteCollection { .. } => store
            .delete_collection(ctx, None, &DeleteOptions::default(), &ListOptions::default())
            .map(|list| Outcome::many(list.items)),
    }
}
