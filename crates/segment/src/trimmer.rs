use tokenfit_common::Result;
use tracing::{debug, warn};

use crate::budget::TrimConfig;
use crate::tokenizer::Tokenizer;
use crate::types::ConversationMessage;

/// Result of trimming a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimOutcome {
    /// Prefix (if configured) followed by the kept suffix, oldest first
    pub messages: Vec<ConversationMessage>,

    /// Tokens of the prefix plus the kept suffix
    pub total_tokens: usize,

    /// History messages left out
    pub dropped: usize,
}

/// Keep the largest recent suffix of `history` that fits `config`
///
/// History is walked newest to oldest. Selection stops once
/// `max_steps` messages are kept, or when the next message would push
/// the running total (which starts at the prefix cost) past
/// `max_tokens`. The newest message is always kept, even when it alone
/// is over budget, so the result never loses the latest turn.
pub fn trim<T>(history: &[ConversationMessage], config: &TrimConfig, tokenizer: &T) -> Result<TrimOutcome>
where
    T: Tokenizer + ?Sized,
{
    let prefix = config.fixed_prefix();
    let mut total_tokens = match prefix {
        Some(message) => tokenizer.count_message(message)?,
        None => 0,
    };
    let mut selected = 0;

    for message in history.iter().rev() {
        if selected >= config.max_steps() {
            debug!("Step limit {} reached", config.max_steps());
            break;
        }

        let tokens = tokenizer.count_message(message)?;
        if total_tokens.saturating_add(tokens) > config.max_tokens() {
            if selected > 0 {
                debug!(
                    "Token limit {} reached at {} tokens ({} more needed)",
                    config.max_tokens(),
                    total_tokens,
                    tokens
                );
                break;
            }
            warn!(
                "Latest message ({} tokens) exceeds token budget {}, keeping it anyway",
                tokens,
                config.max_tokens()
            );
        }

        total_tokens = total_tokens.saturating_add(tokens);
        selected += 1;
    }

    let first_kept = history.len() - selected;
    let mut messages = Vec::with_capacity(selected + 1);
    messages.extend(prefix.cloned());
    messages.extend_from_slice(&history[first_kept..]);

    debug!(
        "Trimmed conversation: kept {} of {} messages, {} tokens",
        selected,
        history.len(),
        total_tokens
    );

    Ok(TrimOutcome {
        messages,
        total_tokens,
        dropped: first_kept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{CharTokenizer, HeuristicTokenizer};
    use crate::types::Role;
    use tokenfit_common::TokenFitError;

    fn numbered(n: usize) -> Vec<ConversationMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ConversationMessage::new(role, i.to_string())
            })
            .collect()
    }

    fn contents(messages: &[ConversationMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_keeps_most_recent_steps() {
        let config = TrimConfig::new(2, 10_000).unwrap();
        let outcome = trim(&numbered(10), &config, &CharTokenizer).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["8", "9"]);
        assert_eq!(outcome.dropped, 8);
        assert_eq!(outcome.total_tokens, 2);
    }

    #[test]
    fn test_prefix_first_and_not_counted_as_step() {
        let config = TrimConfig::new(3, 10_000)
            .unwrap()
            .with_prefix(ConversationMessage::system("sys"));
        let outcome = trim(&numbered(10), &config, &CharTokenizer).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["sys", "7", "8", "9"]);
        assert_eq!(outcome.messages[0].role, Role::System);
        assert_eq!(outcome.total_tokens, 6);
    }

    #[test]
    fn test_token_limit_includes_prefix() {
        let history = vec![
            ConversationMessage::user("aaaa"),
            ConversationMessage::assistant("bbbb"),
            ConversationMessage::user("cccc"),
        ];
        let config = TrimConfig::new(10, 10)
            .unwrap()
            .with_prefix(ConversationMessage::system("pp"));
        let outcome = trim(&history, &config, &CharTokenizer).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["pp", "bbbb", "cccc"]);
        assert_eq!(outcome.total_tokens, 10);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_oversized_latest_message_kept_alone() {
        let history = vec![
            ConversationMessage::user("short"),
            ConversationMessage::user("this one is far too long"),
        ];
        let config = TrimConfig::new(5, 4).unwrap();
        let outcome = trim(&history, &config, &CharTokenizer).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["this one is far too long"]);
        assert!(outcome.total_tokens > 4);
    }

    #[test]
    fn test_prefix_over_budget_still_keeps_latest() {
        let config = TrimConfig::new(5, 3)
            .unwrap()
            .with_prefix(ConversationMessage::system("a long system prompt"));
        let outcome = trim(&numbered(4), &config, &CharTokenizer).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["a long system prompt", "3"]);
    }

    #[test]
    fn test_empty_history() {
        let config = TrimConfig::new(2, 10).unwrap();
        let outcome = trim(&[], &config, &CharTokenizer).unwrap();
        assert!(outcome.messages.is_empty());
        assert_eq!(outcome.total_tokens, 0);

        let config = config.with_prefix(ConversationMessage::system("s"));
        let outcome = trim(&[], &config, &CharTokenizer).unwrap();
        assert_eq!(contents(&outcome.messages), vec!["s"]);
    }

    #[test]
    fn test_message_overhead_counts() {
        // Each message costs 1 content token + 5 overhead
        let tok = HeuristicTokenizer::new(1, 5);
        let config = TrimConfig::new(10, 13).unwrap();
        let outcome = trim(&numbered(5), &config, &tok).unwrap();

        assert_eq!(contents(&outcome.messages), vec!["3", "4"]);
        assert_eq!(outcome.total_tokens, 12);
    }

    #[test]
    fn test_bounds_hold_across_budgets() {
        let history: Vec<ConversationMessage> = ["hi", "hello there", "ok", "a longer reply here", "bye"]
            .iter()
            .map(|s| ConversationMessage::user(*s))
            .collect();
        let prefix = ConversationMessage::system("sys");

        for max_steps in 1..7 {
            for max_tokens in 1..40 {
                let config = TrimConfig::new(max_steps, max_tokens)
                    .unwrap()
                    .with_prefix(prefix.clone());
                let outcome = trim(&history, &config, &CharTokenizer).unwrap();

                assert_eq!(outcome.messages[0], prefix);
                let kept = &outcome.messages[1..];
                assert!(!kept.is_empty());
                assert!(kept.len() <= max_steps);
                assert_eq!(kept, &history[history.len() - kept.len()..]);
                if kept.len() > 1 {
                    assert!(outcome.total_tokens <= max_tokens);
                }
            }
        }
    }

    #[test]
    fn test_huge_counts_saturate() {
        let tok = |s: &str| if s == "huge" { usize::MAX } else { s.len() };
        let config = TrimConfig::new(5, 10)
            .unwrap()
            .with_prefix(ConversationMessage::system("p"));
        let history = vec![ConversationMessage::user("ok"), ConversationMessage::user("huge")];

        let outcome = trim(&history, &config, &tok).unwrap();
        assert_eq!(contents(&outcome.messages), vec!["p", "huge"]);
        assert_eq!(outcome.total_tokens, usize::MAX);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_tokenizer_error_propagates() {
        struct Offline;
        impl Tokenizer for Offline {
            fn count(&self, _text: &str) -> Result<usize> {
                Err(TokenFitError::tokenizer("offline"))
            }
        }

        let config = TrimConfig::new(2, 10).unwrap();
        let err = trim(&numbered(3), &config, &Offline).unwrap_err();
        assert!(matches!(err, TokenFitError::Tokenizer(_)));
    }
}
