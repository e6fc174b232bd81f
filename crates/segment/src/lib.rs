//! tokenfit text segmentation
//!
//! Token-budgeted text splitting, chunk merging, sliding windows and
//! conversation trimming over a caller-supplied tokenizer

mod budget;
mod merger;
mod pipeline;
mod splitter;
mod tokenizer;
mod trimmer;
mod types;
mod window;

pub use budget::{Budget, TrimConfig};
pub use merger::merge;
pub use pipeline::{chunk_text, split_text, split_windowed, trim_conversation, Segmenter};
pub use splitter::split;
pub use tokenizer::{
    CachedTokenizer, CharTokenizer, HeuristicTokenizer, Tokenizer, WordTokenizer,
    DEFAULT_CACHE_CAPACITY,
};
pub use trimmer::{trim, TrimOutcome};
pub use types::{ConversationMessage, Role, TextChunk};
pub use window::window;
