//! Token counting capability.
//!
//! The segmentation core never counts tokens itself. Callers hand in a
//! [`Tokenizer`]; any `Fn(&str) -> usize` closure qualifies, and a few
//! provider-agnostic counters are bundled for tests and the CLI.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tokenfit_common::{AppConfig, Result};

use crate::types::ConversationMessage;

/// Counts tokens in text and in conversation messages
///
/// Implementations must be deterministic. Errors returned here reach
/// the caller untouched.
pub trait Tokenizer: Send + Sync {
    /// Count tokens in a plain text string
    fn count(&self, text: &str) -> Result<usize>;

    /// Count tokens in a message, including any per-message framing cost
    fn count_message(&self, message: &ConversationMessage) -> Result<usize> {
        self.count(&message.content)
    }
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self(text))
    }
}

/// Character-ratio token estimate
///
/// `ceil(chars / chars_per_token)` for text, plus a fixed overhead for
/// every conversation message.
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    chars_per_token: usize,
    message_overhead: usize,
}

impl HeuristicTokenizer {
    /// Create new heuristic tokenizer (a ratio of 0 is treated as 1)
    pub fn new(chars_per_token: usize, message_overhead: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
            message_overhead,
        }
    }

    /// Create from application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.chars_per_token, config.message_overhead)
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.chars().count().div_ceil(self.chars_per_token))
    }

    fn count_message(&self, message: &ConversationMessage) -> Result<usize> {
        Ok(self
            .count(&message.content)?
            .saturating_add(self.message_overhead))
    }
}

/// One token per character
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.chars().count())
    }
}

/// One token per whitespace-separated word
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Default number of counts kept by [`CachedTokenizer::new`]
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(capacity) => capacity,
    None => panic!("cache capacity must be non-zero"),
};

/// Memoizing wrapper around another tokenizer
///
/// The splitter and merger re-count overlapping text many times; this
/// keeps an expensive tokenizer from paying for it twice. The cache is
/// bounded and evicts the least recently used count. Failed counts are
/// not cached.
#[derive(Debug)]
pub struct CachedTokenizer<T> {
    inner: T,
    cache: Mutex<LruCache<String, usize>>,
}

impl<T: Tokenizer> CachedTokenizer<T> {
    /// Wrap a tokenizer with an empty cache of [`DEFAULT_CACHE_CAPACITY`] entries
    pub fn new(inner: T) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Wrap a tokenizer with an empty cache holding at most `capacity` counts
    pub fn with_capacity(inner: T, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Maximum number of cached entries
    pub fn capacity(&self) -> NonZeroUsize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).cap()
    }

    /// Number of cached entries
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop every cached count
    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Tokenizer> Tokenizer for CachedTokenizer<T> {
    fn count(&self, text: &str) -> Result<usize> {
        if let Some(&hit) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(text) {
            return Ok(hit);
        }

        // Counted outside the lock so a slow tokenizer does not serialize callers
        let tokens = self.inner.count(text)?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(text.to_string(), tokens);

        Ok(tokens)
    }

    fn count_message(&self, message: &ConversationMessage) -> Result<usize> {
        self.inner.count_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokenfit_common::TokenFitError;

    #[test]
    fn test_closure_tokenizer() {
        let tok = |s: &str| s.len();
        assert_eq!(tok.count("hello").unwrap(), 5);
        assert_eq!(tok.count_message(&ConversationMessage::user("hey")).unwrap(), 3);
    }

    #[test]
    fn test_heuristic_rounds_up() {
        let tok = HeuristicTokenizer::default();
        assert_eq!(tok.count("").unwrap(), 0);
        assert_eq!(tok.count("abcd").unwrap(), 1);
        assert_eq!(tok.count("abcde").unwrap(), 2);
    }

    #[test]
    fn test_heuristic_counts_chars_not_bytes() {
        let tok = HeuristicTokenizer::new(1, 0);
        assert_eq!(tok.count("안녕하세요").unwrap(), 5);
    }

    #[test]
    fn test_heuristic_message_overhead() {
        let tok = HeuristicTokenizer::new(4, 4);
        let message = ConversationMessage::user("abcdefgh");
        assert_eq!(tok.count_message(&message).unwrap(), 6);
    }

    #[test]
    fn test_heuristic_zero_ratio_clamped() {
        let tok = HeuristicTokenizer::new(0, 0);
        assert_eq!(tok.count("abc").unwrap(), 3);
    }

    #[test]
    fn test_word_and_char_tokenizers() {
        assert_eq!(WordTokenizer.count("one two  three\nfour").unwrap(), 4);
        assert_eq!(CharTokenizer.count("one two").unwrap(), 7);
    }

    #[test]
    fn test_cached_tokenizer_memoizes() {
        let calls = AtomicUsize::new(0);
        let inner = |s: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            s.len()
        };
        let tok = CachedTokenizer::new(inner);

        assert_eq!(tok.count("abc").unwrap(), 3);
        assert_eq!(tok.count("abc").unwrap(), 3);
        assert_eq!(tok.count("abcd").unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(tok.cached_entries(), 2);

        tok.clear();
        assert_eq!(tok.cached_entries(), 0);
    }

    #[test]
    fn test_cached_tokenizer_evicts_least_recent() {
        let calls = AtomicUsize::new(0);
        let inner = |s: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            s.len()
        };
        let capacity = NonZeroUsize::new(2).unwrap();
        let tok = CachedTokenizer::with_capacity(inner, capacity);
        assert_eq!(tok.capacity(), capacity);

        tok.count("a").unwrap();
        tok.count("bb").unwrap();
        // Touch "a" so "bb" becomes the eviction candidate
        tok.count("a").unwrap();
        tok.count("ccc").unwrap();
        assert_eq!(tok.cached_entries(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // "a" survived, "bb" has to be counted again
        tok.count("a").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        tok.count("bb").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_cached_tokenizer_bounded_over_long_text() {
        let text: String = (0..2_000).map(|i| format!("word{} ", i)).collect();
        let capacity = NonZeroUsize::new(64).unwrap();
        let tok = CachedTokenizer::with_capacity(CharTokenizer, capacity);

        let budget = crate::budget::Budget::chunked(40).unwrap();
        let chunks = crate::pipeline::chunk_text(&text, &budget, &tok).unwrap();
        assert!(chunks.len() > 1);
        assert!(tok.cached_entries() <= 64);
    }

    struct Failing;

    impl Tokenizer for Failing {
        fn count(&self, _text: &str) -> Result<usize> {
            Err(TokenFitError::tokenizer("vocabulary not loaded"))
        }
    }

    #[test]
    fn test_cached_tokenizer_does_not_cache_errors() {
        let tok = CachedTokenizer::new(Failing);
        assert!(tok.count("abc").is_err());
        assert_eq!(tok.cached_entries(), 0);
    }
}
