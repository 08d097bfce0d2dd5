use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seed used by the permissive default policy
pub const DEFAULT_SEED: u64 = 1337;

/// Retry and timeout settings the scoring engine applies to judge API calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    /// Maximum number of retries for a failed judge call
    pub max_retries: u32,
    /// Upper bound, in seconds, on the wait between retries
    pub max_wait: u64,
    /// Timeout, in seconds, for a single judge call
    pub timeout: u64,
    /// Seed for the engine's own randomness
    pub seed: u64,
}

impl RunPolicy {
    /// Generous limits for judge providers with low rate-limit tiers.
    ///
    /// Tight budgets against such providers leave runs with missing or zero
    /// scores instead of a slow but complete result.
    pub fn permissive() -> Self {
        Self {
            max_retries: 120,
            max_wait: 7200,
            timeout: 3600,
            seed: DEFAULT_SEED,
        }
    }

    /// Use the supplied policy, or synthesize the permissive one
    pub fn resolve(policy: Option<RunPolicy>) -> Self {
        policy.unwrap_or_else(Self::permissive)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn max_wait_duration(&self) -> Duration {
        Duration::from_secs(self.max_wait)
    }

    /// Exponential backoff for the given retry attempt (0-based), capped at `max_wait`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_secs(secs).min(self.max_wait_duration())
    }
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_values() {
        let policy = RunPolicy::permissive();
        assert_eq!(policy.max_retries, 120);
        assert_eq!(policy.max_wait, 7200);
        assert_eq!(policy.timeout, 3600);
        assert_eq!(policy.seed, 1337);
    }

    #[test]
    fn test_resolve_without_policy_is_stable() {
        assert_eq!(RunPolicy::resolve(None), RunPolicy::resolve(None));
        assert_eq!(RunPolicy::resolve(None), RunPolicy::default());
    }

    #[test]
    fn test_resolve_keeps_supplied_policy() {
        let supplied = RunPolicy {
            max_retries: 3,
            max_wait: 10,
            timeout: 30,
            seed: 7,
        };
        assert_eq!(RunPolicy::resolve(Some(supplied)), supplied);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RunPolicy {
            max_retries: 10,
            max_wait: 5,
            timeout: 30,
            seed: 0,
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(5));
        assert_eq!(policy.backoff(200), Duration::from_secs(5));
    }

    #[test]
    fn test_policy_from_toml() {
        let policy: RunPolicy =
            toml::from_str("max_retries = 2\nmax_wait = 60\ntimeout = 120\nseed = 9\n").unwrap();
        assert_eq!(policy.timeout_duration(), Duration::from_secs(120));
        assert_eq!(policy.max_wait_duration(), Duration::from_secs(60));
    }
}
