use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::meta::ObjectMeta;
use crate::resource::Resource;

const METADATA: &str = "metadata";
const STATUS: &str = "status";

/// `metadata` keys owned by [`ObjectMeta`]. Any other key is left alone.
const MODELED_METADATA_KEYS: [&str; 7] = [
    "name",
    "namespace",
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "labels",
    "annotations",
];

/// A schemaless resource backed by a JSON object.
///
/// Identity lives under the top-level `metadata` key. A missing `metadata`
/// key reads as empty metadata; a `metadata` value that does not decode as
/// [`ObjectMeta`], or a top-level value that is not a JSON object, is
/// reported as [`TypeError::MalformedMetadata`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicObject(Value);

impl DynamicObject {
    /// Wrap an existing JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, TypeError> {
        serde_json::from_str(text)
            .map(Self)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Borrow the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume the wrapper and return the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a top-level field. No-op if the value is not a JSON object.
    pub fn set(&mut self, field: &str, value: Value) {
        if let Some(map) = self.0.as_object_mut() {
            map.insert(field.to_string(), value);
        }
    }

    /// Copy the top-level `status` field from `src` onto `dst`.
    ///
    /// If `src` has no status, `dst` loses its status too: the submitted
    /// object is authoritative for the status field group.
    pub fn copy_status(src: &Self, dst: &mut Self) {
        let Some(map) = dst.0.as_object_mut() else {
            return;
        };
        match src.0.get(STATUS) {
            Some(status) => {
                map.insert(STATUS.to_string(), status.clone());
            }
            None => {
                map.remove(STATUS);
            }
        }
    }
}

impl Default for DynamicObject {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Value> for DynamicObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Resource for DynamicObject {
    fn meta(&self) -> Result<ObjectMeta, TypeError> {
        let map = self
            .0
            .as_object()
            .ok_or_else(|| TypeError::MalformedMetadata("object is not a JSON map".into()))?;
        match map.get(METADATA) {
            None | Some(Value::Null) => Ok(ObjectMeta::default()),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| TypeError::MalformedMetadata(e.to_string())),
        }
    }

    /// Write the modeled fields into `metadata`. Unset fields are removed;
    /// keys [`ObjectMeta`] does not model are kept as they are.
    fn set_meta(&mut self, meta: ObjectMeta) -> Result<(), TypeError> {
        let Value::Object(fields) =
            serde_json::to_value(&meta).map_err(|e| TypeError::Serialization(e.to_string()))?
        else {
            return Err(TypeError::Serialization("metadata is not a JSON map".into()));
        };
        let map = self
            .0
            .as_object_mut()
            .ok_or_else(|| TypeError::MalformedMetadata("object is not a JSON map".into()))?;
        match map.get_mut(METADATA) {
            Some(Value::Object(existing)) => {
                for key in MODELED_METADATA_KEYS {
                    existing.remove(key);
                }
                existing.extend(fields);
            }
            _ => {
                map.insert(METADATA.to_string(), Value::Object(fields));
            }
        }
        Ok(())
    }
}
