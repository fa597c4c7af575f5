use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid scan payload: {0}")]
    InvalidPayload(String),

    #[error("Scanner error: {0}")]
    ScannerError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Removal failed: {0}")]
    RemovalFailed(String),

    #[error("No verifier is paired")]
    NotPaired,

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<prover::ProverError> for KeyError {
    fn from(err: prover::ProverError) -> Self {
        match err {
            prover::ProverError::IncompletePayload(msg)
            | prover::ProverError::MalformedPayload(msg) => KeyError::InvalidPayload(msg),
            prover::ProverError::Storage(msg) => KeyError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyError>;

impl KeyError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            KeyError::PermissionDenied(what) => {
                format!(
                    "Permission denied: {}. The app cannot run without the requested permissions.",
                    what
                )
            }
            KeyError::InvalidPayload(_) => {
                "The scanned code is not a valid verifier code. Please scan again.".to_string()
            }
            KeyError::ScannerError(details) => {
                format!("Scanner error: {}. Please try scanning again.", details)
            }
            KeyError::ConnectionFailed(details) => {
                format!(
                    "Could not reach the verifier: {}. Move closer and try again.",
                    details
                )
            }
            KeyError::RemovalFailed(details) => {
                format!("Failed to remove verifier: {}. Please try again.", details)
            }
            KeyError::NotPaired => {
                "No verifier is paired yet. Scan a verifier code to get started.".to_string()
            }
            KeyError::Precondition(details) => {
                format!("An internal error occurred: {}.", details)
            }
            KeyError::Internal(details) => {
                format!("An internal error occurred: {}. Please try again.", details)
            }
        }
    }

    /// Get error category for logging and surfacing decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            KeyError::PermissionDenied(_) => ErrorCategory::Permission,
            KeyError::InvalidPayload(_) => ErrorCategory::Validation,
            KeyError::ScannerError(_) => ErrorCategory::Scanner,
            KeyError::ConnectionFailed(_) => ErrorCategory::Network,
            KeyError::RemovalFailed(_) => ErrorCategory::Session,
            KeyError::NotPaired => ErrorCategory::Session,
            KeyError::Precondition(_) => ErrorCategory::Internal,
            KeyError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// True for the one failure kind that must end the process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, KeyError::PermissionDenied(_))
    }
}

/// Error categories for logging and surfacing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Permission,
    Validation,
    Scanner,
    Network,
    Session,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Permission => write!(f, "permission"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Scanner => write!(f, "scanner"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Session => write!(f, "session"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}
