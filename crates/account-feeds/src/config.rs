use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::FailurePolicy;
use crate::source::RetryPolicy;

/// Tunables of one retrieval cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Deadline of a single request attempt in milliseconds (default: 5000)
    pub deadline_ms: u64,
    /// Retries after the first attempt (default: 3)
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds (default: 1000)
    pub backoff_ms: u64,
    /// Cycle behaviour when a source fails (default: all_or_nothing)
    pub failure_policy: FailurePolicy,
    /// Overrides the default browser user agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            deadline_ms: retry.deadline.as_millis() as u64,
            max_retries: retry.max_retries,
            backoff_ms: retry.backoff.as_millis() as u64,
            failure_policy: FailurePolicy::default(),
            user_agent: None,
        }
    }
}

impl FeedConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            deadline: Duration::from_millis(self.deadline_ms),
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = FeedConfig::default();
        assert_eq!(config.deadline_ms, 5000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_ms, 1000);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: FeedConfig =
            serde_json::from_value(json!({"max_retries": 1, "failure_policy": "isolate"}))
                .unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.deadline_ms, 5000);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.user_agent, None);
    }
}
