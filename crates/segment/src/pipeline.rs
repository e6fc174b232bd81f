use tokenfit_common::{AppConfig, Result};
use tracing::info;

use crate::budget::{Budget, TrimConfig};
use crate::merger::merge;
use crate::splitter::split;
use crate::tokenizer::Tokenizer;
use crate::trimmer::trim;
use crate::types::{ConversationMessage, TextChunk};
use crate::window::window;

/// Split and merge `text` into chunks with offsets and oversized flags
pub fn chunk_text<T>(text: &str, budget: &Budget, tokenizer: &T) -> Result<Vec<TextChunk>>
where
    T: Tokenizer + ?Sized,
{
    let pieces = split(text, budget, tokenizer)?;
    merge(&pieces, budget, tokenizer)
}

/// Split text into chunks of at most `chunk_size` tokens
///
/// Oversized atomic pieces (no separator to break them) are returned
/// whole rather than truncated.
pub fn split_text<T>(text: &str, chunk_size: usize, tokenizer: &T) -> Result<Vec<String>>
where
    T: Tokenizer + ?Sized,
{
    let budget = Budget::chunked(chunk_size)?;
    let chunks = chunk_text(text, &budget, tokenizer)?;
    Ok(chunks.into_iter().map(|c| c.text).collect())
}

/// Split text into chunks, then group them into overlapping windows
pub fn split_windowed<T>(
    text: &str,
    chunk_size: usize,
    window_size: usize,
    stride: usize,
    tokenizer: &T,
) -> Result<Vec<String>>
where
    T: Tokenizer + ?Sized,
{
    let budget = Budget::new(chunk_size, window_size, stride)?;
    let chunks = chunk_text(text, &budget, tokenizer)?;
    Ok(window(&chunks, &budget))
}

/// Trim a conversation to its most recent turns within step and token limits
pub fn trim_conversation<T>(
    history: &[ConversationMessage],
    max_steps: usize,
    max_tokens: usize,
    prefix: Option<ConversationMessage>,
    tokenizer: &T,
) -> Result<Vec<ConversationMessage>>
where
    T: Tokenizer + ?Sized,
{
    let mut config = TrimConfig::new(max_steps, max_tokens)?;
    if let Some(prefix) = prefix {
        config = config.with_prefix(prefix);
    }

    Ok(trim(history, &config, tokenizer)?.messages)
}

/// Reusable segmentation setup: one budget, one tokenizer
pub struct Segmenter<T> {
    budget: Budget,
    tokenizer: T,
}

impl<T: Tokenizer> Segmenter<T> {
    /// Create new segmenter
    pub fn new(budget: Budget, tokenizer: T) -> Self {
        Self { budget, tokenizer }
    }

    /// Create with the budget from application configuration
    pub fn from_config(config: &AppConfig, tokenizer: T) -> Result<Self> {
        Ok(Self::new(Budget::from_config(config)?, tokenizer))
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Chunks with metadata, before windowing
    pub fn chunks(&self, text: &str) -> Result<Vec<TextChunk>> {
        chunk_text(text, &self.budget, &self.tokenizer)
    }

    /// Final segments: chunks, windowed when the budget asks for it
    pub fn windows(&self, text: &str) -> Result<Vec<String>> {
        let chunks = self.chunks(text)?;
        let oversized = chunks.iter().filter(|c| c.oversized).count();
        let segments = window(&chunks, &self.budget);

        info!(
            "Segmented {} bytes into {} chunks ({} oversized), {} segments",
            text.len(),
            chunks.len(),
            oversized,
            segments.len()
        );

        Ok(segments)
    }
}
