//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage reported by a provider for one completion, or accumulated
/// over a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Merge another usage into this one (accumulate). Counters saturate.
    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_all_counters() {
        let mut total = Usage::new(10, 40);
        total.merge(&Usage::new(20, 55));
        assert_eq!(total.input_tokens, 30);
        assert_eq!(total.output_tokens, 95);
        assert_eq!(total.total_tokens, 125);
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        assert_eq!(Usage::new(u32::MAX, 1).total_tokens, u32::MAX);

        let mut total = Usage::new(4_000_000_000, 0);
        total.merge(&Usage::new(400_000_000, 0));
        assert_eq!(total.input_tokens, u32::MAX);
        assert_eq!(total.total_tokens, u32::MAX);
    }

    #[test]
    fn missing_fields_deserialize_as_zero() {
        let usage: Usage = serde_json::from_str(r#"{"total_tokens": 7}"#).unwrap();
        assert_eq!(usage, Usage { input_tokens: 0, output_tokens: 0, total_tokens: 7 });
    }
}
