use thiserror::Error;

/// Error surfaced to the HTTP route boundary and serialized into the
/// response envelope's `errorCode`/`errorMessage` pair.
///
/// Every fallible operation in the core (object store, KV adapter,
/// Merkle builder, lifecycle orchestrator, read path) ultimately
/// resolves to one of these kinds.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input, a state-machine precondition violated at the
    /// application level, or a business rule (duplicate address, tree
    /// already exists).
    #[error("{0}")]
    Validation(String),

    /// A GET endpoint found no record for the requested key.
    #[error("resource not found")]
    ResourceNotFound,

    /// A KV conditional write lost a race: either a concurrent writer
    /// got there first, or a compensating transition found the row in
    /// an unexpected state.
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    /// The KV or object store provider is throttling requests.
    #[error("throttled: {0}")]
    Throttled(String),

    /// A transactional write or replication conflict reported by the
    /// provider.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected provider-side failure.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The caller is not in any group authorized for this route.
    #[error("unauthorized access")]
    UnauthorizedAccess,

    /// Catch-all for provider failures that don't fit another kind.
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// The `errorCode` string placed in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::ConditionalCheckFailed => "ConditionalCheckFailed",
            Self::Throttled(_) => "Throttled",
            Self::Conflict(_) => "Conflict",
            Self::InternalError(_) => "InternalError",
            Self::UnauthorizedAccess => "UnauthorizedAccess",
            Self::Other(_) => "Other",
        }
    }

    /// HTTP status for the envelope. Every kind returns 200 under the
    /// envelope contract, except authorization failures.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnauthorizedAccess => 403,
            _ => 200,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
