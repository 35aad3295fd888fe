/// Retry bookkeeping for oracle calls
///
/// The policy is a pure decision function over an explicit per-call
/// `RetryState`; whoever drives the call (the lookup client) owns the
/// suspension between attempts.
use crate::config::RetryConfig;
use crate::errors::{Classify, FailureClass};
use crate::logger::{self, LogTag};
use crate::throttle::RateLimiter;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_throttled_attempts: u32,
    pub max_transient_attempts: u32,
    pub transient_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_throttled_attempts: config.max_throttled_attempts.max(1),
            max_transient_attempts: config.max_transient_attempts.max(1),
            transient_delay: Duration::from_secs(config.transient_delay_secs),
        }
    }

    /// Record a failed attempt of `class` and decide what happens next
    ///
    /// `throttle_delay` is the backoff delay to use if the failure is a
    /// throttling error; it is ignored for the other classes.
    pub fn decide(
        &self,
        state: &mut RetryState,
        class: FailureClass,
        throttle_delay: Duration,
    ) -> RetryDecision {
        let decision = match class {
            FailureClass::Fatal => RetryDecision::GiveUp,
            FailureClass::Throttled => {
                state.throttled += 1;
                if state.throttled >= self.max_throttled_attempts {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Retry(throttle_delay)
                }
            }
            FailureClass::Transient => {
                state.transient += 1;
                if state.transient >= self.max_transient_attempts {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Retry(self.transient_delay)
                }
            }
        };

        state.next_delay = match decision {
            RetryDecision::Retry(delay) => Some(delay),
            RetryDecision::GiveUp => None,
        };
        decision
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Per-call retry state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts started so far
    pub attempt: u32,
    /// Throttling failures so far
    pub throttled: u32,
    /// Transient failures so far
    pub transient: u32,
    /// Delay before the next attempt, if one was scheduled
    pub next_delay: Option<Duration>,
}

impl RetryState {
    /// Mark the start of a new attempt
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.next_delay = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// Final failure of a driven call
#[derive(Debug, Clone)]
pub struct RetryFailure<E> {
    pub error: E,
    pub state: RetryState,
}

/// Drive `call` until it succeeds or the policy gives up
///
/// Every attempt first waits for a slot in `limiter`. Throttling failures
/// advance the limiter's shared backoff (a server `retry-after` longer than
/// the backoff wins); any success resets it.
pub async fn drive<T, E, F, Fut>(
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    tag: LogTag,
    label: &str,
    mut call: F,
) -> Result<T, RetryFailure<E>>
where
    E: Classify + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut state = RetryState::default();

    loop {
        state.begin_attempt();
        limiter.acquire().await;

        let error = match call().await {
            Ok(value) => {
                limiter.record_success();
                return Ok(value);
            }
            Err(e) => e,
        };

        let class = error.class();
        let throttle_delay = if class == FailureClass::Throttled {
            let backoff = limiter.record_throttled();
            let hinted = error
                .retry_after_ms()
                .map(Duration::from_millis)
                .unwrap_or_default();
            backoff.max(hinted)
        } else {
            Duration::ZERO
        };

        match policy.decide(&mut state, class, throttle_delay) {
            RetryDecision::Retry(delay) => {
                logger::debug(
                    tag.clone(),
                    &format!(
                        "{} attempt {} failed ({}): {}; retrying in {:.1}s",
                        label,
                        state.attempt,
                        class,
                        error,
                        delay.as_secs_f64()
                    ),
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp => return Err(RetryFailure { error, state }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OracleError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_throttled_attempts: 3,
            max_transient_attempts: 2,
            transient_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_fatal_is_never_retried() {
        let mut state = RetryState::default();
        state.begin_attempt();
        assert_eq!(
            policy().decide(&mut state, FailureClass::Fatal, Duration::from_secs(60)),
            RetryDecision::GiveUp
        );
        assert_eq!(state.next_delay, None);
    }

    #[test]
    fn test_throttled_uses_backoff_delay_until_budget_spent() {
        let policy = policy();
        let mut state = RetryState::default();

        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Throttled, Duration::from_secs(60)),
            RetryDecision::Retry(Duration::from_secs(60))
        );
        assert_eq!(state.next_delay, Some(Duration::from_secs(60)));

        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Throttled, Duration::from_secs(120)),
            RetryDecision::Retry(Duration::from_secs(120))
        );

        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Throttled, Duration::from_secs(240)),
            RetryDecision::GiveUp
        );
        assert_eq!(state.attempt, 3);
        assert_eq!(state.throttled, 3);
    }

    #[test]
    fn test_transient_uses_fixed_delay_and_separate_budget() {
        let policy = policy();
        let mut state = RetryState::default();

        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Throttled, Duration::from_secs(60)),
            RetryDecision::Retry(Duration::from_secs(60))
        );
        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Transient, Duration::from_secs(999)),
            RetryDecision::Retry(Duration::from_secs(2))
        );
        state.begin_attempt();
        assert_eq!(
            policy.decide(&mut state, FailureClass::Transient, Duration::ZERO),
            RetryDecision::GiveUp
        );
    }

    fn rate_limited() -> OracleError {
        OracleError::RateLimited {
            provider: "test".to_string(),
            retry_after_ms: None,
        }
    }

    fn network() -> OracleError {
        OracleError::Network {
            provider: "test".to_string(),
            message: "connection reset".to_string(),
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            "test",
            100,
            Duration::from_secs(60),
            Duration::from_secs(60),
            Duration::from_secs(300),
        )
    }

    async fn run_script(
        policy: &RetryPolicy,
        limiter: &RateLimiter,
        script: Vec<Result<u32, OracleError>>,
    ) -> (Result<u32, RetryFailure<OracleError>>, usize) {
        let script = Mutex::new(VecDeque::from(script));
        let calls = Mutex::new(0usize);
        let outcome = drive(policy, limiter, LogTag::Oracle, "test", || {
            *calls.lock() += 1;
            let next = script.lock().pop_front().unwrap_or(Ok(0));
            async move { next }
        })
        .await;
        let count = *calls.lock();
        (outcome, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_throttled_then_success_waits_one_backoff() {
        let limiter = limiter();
        let start = Instant::now();

        let (outcome, calls) =
            run_script(&RetryPolicy::default(), &limiter, vec![Err(rate_limited()), Ok(7)]).await;

        assert_eq!(outcome.unwrap(), 7);
        assert_eq!(calls, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(limiter.consecutive_throttles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_retry_after_longer_than_backoff_wins() {
        let limiter = limiter();
        let start = Instant::now();
        let hinted = OracleError::RateLimited {
            provider: "test".to_string(),
            retry_after_ms: Some(90_000),
        };

        let (outcome, _) =
            run_script(&RetryPolicy::default(), &limiter, vec![Err(hinted), Ok(1)]).await;

        assert!(outcome.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_transient_budget_exhausted() {
        let limiter = limiter();
        let start = Instant::now();

        let (outcome, calls) = run_script(
            &RetryPolicy::default(),
            &limiter,
            vec![Err(network()), Err(network()), Err(network()), Ok(1)],
        )
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(failure.state.transient, 3);
        assert_eq!(failure.error.class(), FailureClass::Transient);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_fatal_is_single_attempt() {
        let limiter = limiter();
        let auth = OracleError::Auth {
            provider: "test".to_string(),
            message: "Invalid API key".to_string(),
        };

        let (outcome, calls) = run_script(&RetryPolicy::default(), &limiter, vec![Err(auth)]).await;

        assert_eq!(calls, 1);
        assert_eq!(outcome.unwrap_err().state.attempt, 1);
    }
}
