//! Error taxonomy, spec.md §7: one `thiserror` variant per tag, `From`
//! impls for wrapped lower-level errors, a crate-local `Result` alias.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ShannonError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("policy denied: {reason}")]
    PolicyDenied { reason: String, require_approval: bool },

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("non-determinism detected: {0}")]
    NonDeterminism(String),

    #[error("invalid decomposition: {0}")]
    InvalidDecomposition(String),

    #[error("approval timed out")]
    ApprovalTimeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShannonError {
    /// The stable `kind` string surfaced in `WORKFLOW_FAILED` events and to
    /// callers, spec.md §7 "failures carry a stable `kind` string".
    pub fn kind(&self) -> &'static str {
        match self {
            ShannonError::InvalidInput(_) => "InvalidInput",
            ShannonError::PolicyDenied { .. } => "PolicyDenied",
            ShannonError::BudgetExceeded(_) => "BudgetExceeded",
            ShannonError::ServiceUnavailable(_) => "ServiceUnavailable",
            ShannonError::Timeout(_) => "Timeout",
            ShannonError::NonDeterminism(_) => "NonDeterminism",
            ShannonError::InvalidDecomposition(_) => "InvalidDecomposition",
            ShannonError::ApprovalTimeout => "ApprovalTimeout",
            ShannonError::Internal(_) => "Internal",
        }
    }

    /// Whether the runtime may retry the activity that raised this error,
    /// spec.md §4.10 "no retry on `Invalid*` or `PolicyDenied`".
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShannonError::ServiceUnavailable(_) | ShannonError::Timeout(_))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ShannonError::Internal(msg.into())
    }
}

impl From<anyhow::Error> for ShannonError {
    fn from(err: anyhow::Error) -> Self {
        ShannonError::Internal(err.to_string())
    }
}

impl From<shannon_traits::ToolError> for ShannonError {
    fn from(err: shannon_traits::ToolError) -> Self {
        ShannonError::ServiceUnavailable(format!("{}: {}", err.kind, err.message))
    }
}

pub type Result<T> = std::result::Result<T, ShannonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_not_retryable() {
        assert!(!ShannonError::InvalidInput("bad".into()).is_retryable());
    }

    #[test]
    fn service_unavailable_is_retryable() {
        assert!(ShannonError::ServiceUnavailable("down".into()).is_retryable());
    }

    #[test]
    fn kind_strings_match_taxonomy() {
        assert_eq!(ShannonError::ApprovalTimeout.kind(), "ApprovalTimeout");
        assert_eq!(
            ShannonError::PolicyDenied { reason: "x".into(), require_approval: false }.kind(),
            "PolicyDenied"
        );
    }
}
