/// tokenfit error types
#[derive(Debug, thiserror::Error)]
pub enum TokenFitError {
    /// Budget, window or trim parameter outside its allowed range
    #[error("Invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Parameter name as the caller knows it
        parameter: &'static str,
        /// Which constraint was violated
        reason: String,
    },

    /// Token counting failed inside a tokenizer implementation
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TokenFitError {
    /// Create invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(parameter: &'static str, reason: S) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Create tokenizer error
    pub fn tokenizer<S: Into<String>>(msg: S) -> Self {
        Self::Tokenizer(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error was raised by parameter validation
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message_names_parameter() {
        let err = TokenFitError::invalid_parameter("stride", "stride exceeds window size");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `stride`: stride exceeds window size"
        );
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_other_errors_are_not_parameter_errors() {
        assert!(!TokenFitError::tokenizer("boom").is_invalid_parameter());
        assert!(!TokenFitError::config("bad").is_invalid_parameter());
    }
}
