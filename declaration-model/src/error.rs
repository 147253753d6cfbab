use thiserror::Error;

/// Error kinds surfaced by the core pipeline. `ValidationWarning` from the
/// design notes is deliberately not a variant here: it is non-fatal and is
/// recorded on the record's `validation_errors` instead of being thrown.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("query error in stage `{stage}`: {message}")]
    Query { stage: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),
}
