//! What the consumer does with a message whose processing failed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default number of extra attempts under [`FailurePolicy::Retry`].
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts under [`FailurePolicy::Retry`].
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Failure handling for a single message.
///
/// Whatever the policy, the message is committed once the decision has been
/// carried out, so one bad message never blocks the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and move on.
    #[default]
    Drop,

    /// Retry transient failures up to `max_retries` extra times, sleeping
    /// `backoff` between attempts, then drop. Permanent failures are dropped
    /// immediately.
    Retry { max_retries: u32, backoff: Duration },

    /// Hand the failed message to a dead-letter sink.
    DeadLetter,
}

impl FailurePolicy {
    /// Retry policy with the default limits.
    pub fn retry() -> Self {
        FailurePolicy::Retry {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Returns the policy name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Drop => "drop",
            FailurePolicy::Retry { .. } => "retry",
            FailurePolicy::DeadLetter => "dead-letter",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    /// Parses `drop`, `retry` or `dead-letter` (case-insensitive; `_` is
    /// accepted in place of `-`). `retry` uses the default limits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "drop" => Ok(FailurePolicy::Drop),
            "retry" => Ok(FailurePolicy::retry()),
            "dead-letter" => Ok(FailurePolicy::DeadLetter),
            other => Err(format!("unknown failure policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_drop() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Drop);
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("drop".parse::<FailurePolicy>(), Ok(FailurePolicy::Drop));
        assert_eq!("RETRY".parse::<FailurePolicy>(), Ok(FailurePolicy::retry()));
        assert_eq!("dead-letter".parse::<FailurePolicy>(), Ok(FailurePolicy::DeadLetter));
        assert_eq!("dead_letter".parse::<FailurePolicy>(), Ok(FailurePolicy::DeadLetter));
        assert!("requeue".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn display_matches_parse_input() {
        for policy in [
            FailurePolicy::Drop,
            FailurePolicy::retry(),
            FailurePolicy::DeadLetter,
        ] {
            assert_eq!(policy.to_string().parse::<FailurePolicy>(), Ok(policy));
        }
    }
}
