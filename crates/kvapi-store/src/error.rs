use kvapi_types::TypeError;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record exists at the derived key.
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// Create on an occupied key.
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: String, name: String },

    /// A required identity field is missing or malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A create, update, or delete hook vetoed the operation.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A resourceVersion or uid precondition did not hold.
    #[error("conflict on {kind} \"{name}\": {reason}")]
    Conflict {
        kind: String,
        name: String,
        reason: String,
    },

    /// Accessor failure on a malformed object, or a resource-version
    /// integrity violation.
    #[error("internal error: {0}")]
    Internal(String),

    /// Store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Error a validation hook returns to veto an operation.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::ValidationFailed(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
