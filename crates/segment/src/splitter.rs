use std::sync::LazyLock;

use regex::Regex;
use tokenfit_common::Result;
use tracing::{debug, warn};

use crate::budget::Budget;
use crate::tokenizer::Tokenizer;

/// Natural boundaries, strongest first
const SEPARATOR_PATTERNS: [(&str, &str); 6] = [
    ("paragraph", r"\n{2,}"),
    ("sentence", r"\.\s+"),
    ("semicolon", "; "),
    ("colon", ": "),
    ("comma", ", "),
    ("whitespace", r"\s+"),
];

static SEPARATORS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SEPARATOR_PATTERNS
        .iter()
        .map(|(name, pattern)| {
            let regex = Regex::new(pattern).expect("separator patterns are valid regexes");
            (*name, regex)
        })
        .collect()
});

/// Piece of the input together with whether it fits the budget
#[derive(Clone, Copy)]
struct Piece<'a> {
    text: &'a str,
    fits: bool,
}

/// Split text into pieces that fit `budget.chunk_size()` where possible
///
/// Separators are tried strongest first and only pieces still over
/// budget are broken further. Every separator stays attached to the
/// fragment before it, so the pieces concatenate back to `text`.
/// A piece no separator can reduce is returned whole, over budget.
pub fn split<'a, T>(text: &'a str, budget: &Budget, tokenizer: &T) -> Result<Vec<&'a str>>
where
    T: Tokenizer + ?Sized,
{
    let limit = budget.chunk_size();

    if tokenizer.count(text)? <= limit {
        return Ok(vec![text]);
    }

    let mut pieces = vec![Piece { text, fits: false }];

    for (name, separator) in SEPARATORS.iter() {
        if pieces.iter().all(|p| p.fits) {
            break;
        }
        pieces = refine(pieces, separator, limit, tokenizer)?;
        debug!(
            "Split pass '{}': {} pieces, {} over budget",
            name,
            pieces.len(),
            pieces.iter().filter(|p| !p.fits).count()
        );
    }

    for piece in pieces.iter().filter(|p| !p.fits) {
        warn!(
            "Keeping oversized atomic piece ({} bytes) above chunk size {}",
            piece.text.len(),
            limit
        );
    }

    Ok(pieces.into_iter().map(|p| p.text).collect())
}

/// One separator pass: break every over-budget piece, keep the rest
fn refine<'a, T>(
    pieces: Vec<Piece<'a>>,
    separator: &Regex,
    limit: usize,
    tokenizer: &T,
) -> Result<Vec<Piece<'a>>>
where
    T: Tokenizer + ?Sized,
{
    let mut refined = Vec::with_capacity(pieces.len());

    for piece in pieces {
        if piece.fits {
            refined.push(piece);
            continue;
        }

        let fragments = break_at(piece.text, separator);
        if fragments.len() == 1 {
            // No match: still the same oversized piece
            refined.push(piece);
            continue;
        }

        for fragment in fragments {
            let fits = tokenizer.count(fragment)? <= limit;
            refined.push(Piece { text: fragment, fits });
        }
    }

    Ok(refined)
}

/// Break `piece` after every match of `separator`
fn break_at<'a>(piece: &'a str, separator: &Regex) -> Vec<&'a str> {
    let mut fragments = Vec::new();
    let mut last = 0;

    for found in separator.find_iter(piece) {
        fragments.push(&piece[last..found.end()]);
        last = found.end();
    }

    if last < piece.len() {
        fragments.push(&piece[last..]);
    }

    fragments
}
