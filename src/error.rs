use thiserror::Error;

/// Error taxonomy for the derivation engine.
///
/// Every downstream error (store, tool, filesystem) is wrapped into one of
/// these variants with a short operational context before it crosses a
/// component boundary; `main.rs` and the front-ends are the only places that
/// turn a `VithError` into a wire-level status code.
#[derive(Error, Debug)]
pub enum VithError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("invalid output: {0}")]
    OutputInvalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("tool failed: {0}")]
    ToolError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl VithError {
    /// Short machine-readable state label used as the `state` metric tag.
    pub fn metric_state(&self) -> &'static str {
        match self {
            VithError::InputInvalid(_) => "input_invalid",
            VithError::OutputInvalid(_) => "output_invalid",
            VithError::NotFound(_) => "not_found",
            VithError::Forbidden(_) => "forbidden",
            VithError::Conflict(_) => "invalid",
            VithError::ToolError(_) | VithError::IoError(_) | VithError::Cancelled(_) => "error",
            VithError::Unavailable(_) => "error",
        }
    }

    /// Chain a best-effort cleanup failure onto this error without losing the
    /// original cause. Cleanup errors are logged, never replace the cause.
    pub fn with_cleanup_context(self, context: &str, cleanup_err: impl std::fmt::Display) -> Self {
        match self {
            VithError::ToolError(msg) => {
                VithError::ToolError(format!("{msg} (cleanup '{context}' also failed: {cleanup_err})"))
            }
            VithError::IoError(msg) => {
                VithError::IoError(format!("{msg} (cleanup '{context}' also failed: {cleanup_err})"))
            }
            other => other,
        }
    }
}

impl From<std::io::Error> for VithError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => VithError::NotFound(err.to_string()),
            _ => VithError::IoError(err.to_string()),
        }
    }
}

impl From<opendal::Error> for VithError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => VithError::NotFound(err.to_string()),
            ErrorKind::AlreadyExists => VithError::Conflict(err.to_string()),
            _ => VithError::IoError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for VithError {
    fn from(err: reqwest::Error) -> Self {
        VithError::ToolError(err.to_string())
    }
}

/// Wraps `err` with a short operational context, preserving the original
/// variant so HTTP/AMQP status mapping still applies.
pub fn context<T>(result: Result<T, VithError>, ctx: &str) -> Result<T, VithError> {
    result.map_err(|e| match e {
        VithError::InputInvalid(m) => VithError::InputInvalid(format!("{ctx}: {m}")),
        VithError::OutputInvalid(m) => VithError::OutputInvalid(format!("{ctx}: {m}")),
        VithError::NotFound(m) => VithError::NotFound(format!("{ctx}: {m}")),
        VithError::Forbidden(m) => VithError::Forbidden(format!("{ctx}: {m}")),
        VithError::Conflict(m) => VithError::Conflict(format!("{ctx}: {m}")),
        VithError::ToolError(m) => VithError::ToolError(format!("{ctx}: {m}")),
        VithError::IoError(m) => VithError::IoError(format!("{ctx}: {m}")),
        VithError::Cancelled(m) => VithError::Cancelled(format!("{ctx}: {m}")),
        VithError::Unavailable(m) => VithError::Unavailable(format!("{ctx}: {m}")),
    })
}

pub type Result<T> = std::result::Result<T, VithError>;
