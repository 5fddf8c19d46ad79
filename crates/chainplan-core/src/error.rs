use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainplanError {
    #[error("not initialized: run 'chainplan init'")]
    NotInitialized,

    #[error("unknown network '{0}': add it under `networks` in .chainplan/config.yaml")]
    UnknownNetwork(String),

    #[error("record belongs to network '{found}', not '{expected}'")]
    NetworkMismatch { expected: String, found: String },

    #[error("plan file not found: {0}")]
    PlanNotFound(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChainplanError>;

// ---------------------------------------------------------------------------
// PlanError
// ---------------------------------------------------------------------------

/// Problems with a plan that are detected before any external call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("{context} references unknown unit '{reference}'")]
    UnknownReference { context: String, reference: String },

    #[error("unit '{0}' is declared more than once")]
    DuplicateUnit(String),

    #[error("invalid literal in {context}: {reason}")]
    InvalidLiteral { context: String, reason: String },

    #[error("invalid method '{method}' in {context}: {reason}")]
    InvalidMethod {
        context: String,
        method: String,
        reason: String,
    },

    #[error("{context}: '{method}' takes {expected} argument(s), got {actual}")]
    ArityMismatch {
        context: String,
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: argument {position} of '{method}' expects {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        method: String,
        position: usize,
        expected: String,
        actual: String,
    },
}

// ---------------------------------------------------------------------------
// DeployError
// ---------------------------------------------------------------------------

/// Opaque failure reported by a chain client.
pub type ClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that stop a deployment run. Progress up to the failing step has
/// already been persisted when any of these is returned.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("deploying unit '{unit}' failed: {cause}")]
    UnitFailed {
        unit: String,
        #[source]
        cause: ClientError,
    },

    #[error("wiring step {index} ({label}) failed: {cause}")]
    WiringFailed {
        index: usize,
        label: String,
        #[source]
        cause: ClientError,
    },

    #[error("record does not match plan: {0}")]
    RecordMismatch(String),

    #[error("cancelled after {completed} completed step(s); re-run to resume")]
    Cancelled { completed: usize },

    #[error("failed to persist deployment record: {0}")]
    Persist(#[source] ChainplanError),
}
