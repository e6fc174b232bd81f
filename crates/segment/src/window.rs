use tracing::debug;

use crate::budget::Budget;

/// Group chunks into overlapping windows
///
/// Windows start every `budget.stride()` chunks and span up to
/// `budget.window_size()` of them, clamped at the end of the list, so
/// `n` chunks give `ceil(n / stride)` windows. Window text is trimmed and
/// blank windows are dropped. With a window size of 1 the chunk texts
/// come back unchanged.
pub fn window<S: AsRef<str>>(chunks: &[S], budget: &Budget) -> Vec<String> {
    if !budget.is_windowed() {
        return chunks.iter().map(|c| c.as_ref().to_string()).collect();
    }

    let size = budget.window_size();
    let stride = budget.stride();
    let mut windows = Vec::with_capacity(chunks.len().div_ceil(stride));

    for start in (0..chunks.len()).step_by(stride) {
        let end = (start + size).min(chunks.len());
        let combined: String = chunks[start..end].iter().map(|c| c.as_ref()).collect();

        let trimmed = combined.trim();
        if trimmed.is_empty() {
            debug!("Dropping blank window {}..{}", start, end);
            continue;
        }

        windows.push(trimmed.to_string());
    }

    debug!(
        "Assembled {} windows from {} chunks (size {}, stride {})",
        windows.len(),
        chunks.len(),
        size,
        stride
    );

    windows
}
