//! Fixtures shared by the unit tests.

use kvapi_types::{ObjectMeta, Resource, TypeError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WidgetStatus {
    pub phase: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Widget {
    pub metadata: ObjectMeta,
    pub foo: String,
    pub status: Option<WidgetStatus>,
}

impl Widget {
    pub fn new(namespace: &str, name: &str, foo: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            foo: foo.to_string(),
            status: None,
        }
    }

    pub fn with_phase(mut self, phase: &str) -> Self {
        self.status = Some(WidgetStatus {
            phase: phase.to_string(),
        });
        self
    }

    pub fn rv(&self) -> &str {
        &self.metadata.resource_version
    }

    pub fn copy_status(src: &Self, dst: &mut Self) {
        dst.status = src.status.clone();
    }
}

impl Resource for Widget {
    fn meta(&self) -> Result<ObjectMeta, TypeError> {
        Ok(self.metadata.clone())
    }

    fn set_meta(&mut self, meta: ObjectMeta) -> Result<(), TypeError> {
        self.metadata = meta;
        Ok(())
    }
}
