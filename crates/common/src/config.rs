use crate::error::TokenFitError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix (`TOKENFIT_CHUNK_SIZE`, ...)
pub const ENV_PREFIX: &str = "TOKENFIT";

/// tokenfit application configuration
///
/// Holds the defaults a caller applies when it does not pass explicit
/// segmentation or trimming parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Token ceiling per chunk
    pub chunk_size: usize,

    /// Chunks per sliding window (1 disables windowing)
    pub window_size: usize,

    /// Chunks to advance between windows
    pub stride: usize,

    /// Conversation turns kept by the trimmer (prefix excluded)
    pub max_steps: usize,

    /// Token budget for a trimmed conversation (prefix included)
    pub max_tokens: usize,

    /// Characters per token for the heuristic tokenizer
    pub chars_per_token: usize,

    /// Fixed token tax per conversation message for the heuristic tokenizer
    pub message_overhead: usize,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            window_size: 1,
            stride: 1,
            max_steps: 20,
            max_tokens: 4096,
            chars_per_token: 4,
            message_overhead: 4,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, TokenFitError> {
        Self::load(None)
    }

    /// Load configuration: defaults, then optional file, then environment
    ///
    /// # Arguments
    /// * `path` - Optional config file (format picked from the extension)
    pub fn load(path: Option<&Path>) -> Result<Self, TokenFitError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = ::config::Config::try_from(&Self::default())
            .map_err(|e| TokenFitError::config(format!("Failed to build defaults: {}", e)))?;

        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(TokenFitError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(::config::File::from(path));
        }

        let config: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| TokenFitError::config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        tracing::debug!("Configuration loaded: {:?}", config);

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TokenFitError> {
        let positive = [
            ("chunk_size", self.chunk_size),
            ("window_size", self.window_size),
            ("stride", self.stride),
            ("max_steps", self.max_steps),
            ("max_tokens", self.max_tokens),
            ("chars_per_token", self.chars_per_token),
        ];

        for (name, value) in positive {
            if value == 0 {
                return Err(TokenFitError::config(format!("{} must be at least 1", name)));
            }
        }

        if self.stride > self.window_size {
            return Err(TokenFitError::config(format!(
                "stride ({}) exceeds window size ({})",
                self.stride, self.window_size
            )));
        }

        if self.log_level.is_empty() {
            return Err(TokenFitError::config("Log level cannot be empty"));
        }

        Ok(())
    }
}
