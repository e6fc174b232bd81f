use tokenfit_common::{AppConfig, Result, TokenFitError};

use crate::types::ConversationMessage;

/// Token and window limits for one segmentation call
///
/// Only constructible through [`Budget::new`], so every value in
/// circulation satisfies `chunk_size >= 1`, `window_size >= 1` and
/// `1 <= stride <= window_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    chunk_size: usize,
    window_size: usize,
    stride: usize,
}

impl Budget {
    /// Create a validated budget
    pub fn new(chunk_size: usize, window_size: usize, stride: usize) -> Result<Self> {
        if chunk_size < 1 {
            return Err(TokenFitError::invalid_parameter(
                "chunk_size",
                "chunk size must be at least 1 token",
            ));
        }
        if window_size < 1 {
            return Err(TokenFitError::invalid_parameter(
                "window_size",
                "window size must be at least 1 chunk",
            ));
        }
        if stride < 1 {
            return Err(TokenFitError::invalid_parameter(
                "stride",
                "stride must be at least 1 chunk",
            ));
        }
        if stride > window_size {
            return Err(TokenFitError::invalid_parameter(
                "stride",
                format!(
                    "stride exceeds window size ({} > {}); chunks between windows would be skipped",
                    stride, window_size
                ),
            ));
        }

        Ok(Self {
            chunk_size,
            window_size,
            stride,
        })
    }

    /// Budget without windowing (`window_size = stride = 1`)
    pub fn chunked(chunk_size: usize) -> Result<Self> {
        Self::new(chunk_size, 1, 1)
    }

    /// Create from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.window_size, config.stride)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Whether windows overlap or group more than one chunk
    pub fn is_windowed(&self) -> bool {
        self.window_size > 1
    }
}

/// Limits for conversation trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimConfig {
    max_steps: usize,
    max_tokens: usize,
    fixed_prefix: Option<ConversationMessage>,
}

impl TrimConfig {
    /// Create a validated trim configuration without prefix
    pub fn new(max_steps: usize, max_tokens: usize) -> Result<Self> {
        if max_steps < 1 {
            return Err(TokenFitError::invalid_parameter(
                "max_steps",
                "at least one conversation step must be kept",
            ));
        }
        if max_tokens < 1 {
            return Err(TokenFitError::invalid_parameter(
                "max_tokens",
                "token budget must be at least 1",
            ));
        }

        Ok(Self {
            max_steps,
            max_tokens,
            fixed_prefix: None,
        })
    }

    /// Create from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.max_steps, config.max_tokens)
    }

    /// Message always kept ahead of the trimmed history (typically the system prompt)
    pub fn with_prefix(mut self, prefix: ConversationMessage) -> Self {
        self.fixed_prefix = Some(prefix);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn fixed_prefix(&self) -> Option<&ConversationMessage> {
        self.fixed_prefix.as_ref()
    }
}
