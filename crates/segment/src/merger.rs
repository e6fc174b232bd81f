use tokenfit_common::Result;
use tracing::{debug, warn};

use crate::budget::Budget;
use crate::tokenizer::Tokenizer;
use crate::types::TextChunk;

/// Merge adjacent pieces into chunks of at most `budget.chunk_size()` tokens
///
/// Pieces are accumulated left to right. Every candidate `buffer + piece`
/// is counted as a whole: tokenizers are not additive across a boundary,
/// so summing the counts of the parts would under- or overshoot.
///
/// A piece that alone exceeds the budget is emitted on its own with
/// `oversized` set. Empty buffers are never emitted.
pub fn merge<T, S>(pieces: &[S], budget: &Budget, tokenizer: &T) -> Result<Vec<TextChunk>>
where
    T: Tokenizer + ?Sized,
    S: AsRef<str>,
{
    let limit = budget.chunk_size();
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;
    let mut offset = 0;

    for piece in pieces {
        let piece = piece.as_ref();
        let candidate = format!("{}{}", buffer, piece);

        if tokenizer.count(&candidate)? <= limit {
            buffer = candidate;
            offset += piece.len();
            continue;
        }

        if !buffer.is_empty() {
            debug!("Flushing chunk at {}..{} before piece of {} bytes", start, offset, piece.len());
            chunks.push(TextChunk {
                text: std::mem::take(&mut buffer),
                start,
                end: offset,
                oversized: false,
            });
            start = offset;

            if tokenizer.count(piece)? <= limit {
                buffer = piece.to_string();
                offset += piece.len();
                continue;
            }
        }

        warn!(
            "Emitting oversized chunk at {}..{} (chunk size {})",
            offset,
            offset + piece.len(),
            limit
        );
        chunks.push(TextChunk {
            text: piece.to_string(),
            start: offset,
            end: offset + piece.len(),
            oversized: true,
        });
        offset += piece.len();
        start = offset;
    }

    if !buffer.is_empty() {
        chunks.push(TextChunk {
            text: buffer,
            start,
            end: offset,
            oversized: false,
        });
    }

    debug!("Merged {} pieces into {} chunks", pieces.len(), chunks.len());

    Ok(chunks)
}
