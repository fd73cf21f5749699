//! Per-call context and option types.

use tokio_util::sync::CancellationToken;

/// Ambient per-call values supplied by the request layer.
///
/// A missing namespace means "no filter" for list-style calls and an empty
/// namespace key component for single-object calls. The cancellation token
/// governs the lifetime of any watch opened with this context.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    namespace: Option<String>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request namespace. An empty string clears it.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Tie watches opened with this context to an external token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Namespace as a key component; empty when absent.
    pub fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Scoping for list, watch, and collection delete.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Overrides the context namespace when set.
    pub namespace: Option<String>,
}

impl ListOptions {
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    /// The namespace filter in effect for a call, if any.
    pub(crate) fn scope<'a>(&'a self, ctx: &'a RequestContext) -> Option<&'a str> {
        self.namespace
            .as_deref()
            .or(ctx.namespace())
            .filter(|ns| !ns.is_empty())
    }
}

/// Conditions that must hold for a delete to proceed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub uid: Option<String>,
    pub resource_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub preconditions: Option<Preconditions>,
}

impl DeleteOptions {
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            preconditions: Some(Preconditions {
                uid: Some(uid.into()),
                resource_version: None,
            }),
        }
    }

    pub fn with_resource_version(resource_version: impl Into<String>) -> Self {
        Self {
            preconditions: Some(Preconditions {
                uid: None,
                resource_version: Some(resource_version.into()),
            }),
        }
    }
}
