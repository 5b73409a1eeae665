//! Token estimation used for sizing and limit checks.

use crate::types::Message;

/// Fixed cost of a conversation regardless of its messages.
pub const CONVERSATION_OVERHEAD: usize = 3;
/// Per-message role and formatting cost.
pub const MESSAGE_OVERHEAD: usize = 4;
/// Per-call cost for assistant tool calls.
pub const TOOL_CALL_OVERHEAD: usize = 8;

/// Estimates how many tokens messages will occupy.
///
/// Implementations must be monotonic: more text never costs fewer tokens.
pub trait TokenEstimator: Send + Sync {
    fn message_tokens(&self, message: &Message) -> usize;

    fn conversation_overhead(&self) -> usize {
        CONVERSATION_OVERHEAD
    }

    fn conversation_tokens(&self, messages: &[Message]) -> usize {
        self.conversation_overhead()
            + messages.iter().map(|m| self.message_tokens(m)).sum::<usize>()
    }
}

/// Roughly four characters per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn message_tokens(&self, message: &Message) -> usize {
        let mut tokens = MESSAGE_OVERHEAD + estimate_text_tokens(&message.content);
        if let Some(name) = &message.name {
            tokens += estimate_text_tokens(name);
        }
        if let Some(id) = &message.tool_call_id {
            tokens += estimate_text_tokens(id);
        }
        for call in &message.tool_calls {
            tokens += TOOL_CALL_OVERHEAD
                + estimate_text_tokens(&call.name)
                + estimate_text_tokens(&call.arguments);
        }
        tokens
    }
}

pub fn estimate_text_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    #[test]
    fn text_tokens_round_up() {
        assert_eq!(estimate_text_tokens(""), 0);
        assert_eq!(estimate_text_tokens("abc"), 1);
        assert_eq!(estimate_text_tokens("abcde"), 2);
    }

    #[test]
    fn tool_calls_add_fixed_overhead() {
        let plain = Message::assistant("");
        let with_call = Message::assistant_with_tool_calls("", vec![ToolCall::new("c1", "", "")]);
        let estimator = CharEstimator;
        assert_eq!(
            estimator.message_tokens(&with_call) - estimator.message_tokens(&plain),
            TOOL_CALL_OVERHEAD
        );
    }

    #[test]
    fn conversation_includes_overhead() {
        let msgs = vec![Message::user("abcd"), Message::assistant("abcd")];
        assert_eq!(CharEstimator.conversation_tokens(&msgs), 3 + 5 + 5);
        assert_eq!(CharEstimator.conversation_tokens(&[]), 3);
    }
}
