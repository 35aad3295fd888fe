//! Two-stage wallet lookup
//!
//! Stage 1 asks the oracle whether any post references the wallet. Only when
//! it does, stage 2 asks who most likely owns it. Each stage is one oracle
//! call driven through `retry::drive`, so every attempt is admitted by the
//! shared rate limiter.

pub mod parse;
pub mod types;

pub use types::{normalize_handle, Confidence, LookupResult, Ownership, Record};

use crate::errors::{FailureClass, LookupError, OracleError, Stage};
use crate::logger::{self, LogTag};
use crate::retry::{self, RetryFailure, RetryPolicy};
use crate::throttle::RateLimiter;
use async_trait::async_trait;
use std::sync::Arc;

/// External search service answering the two lookup questions
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    /// Does any post reference `wallet`?
    async fn post_exists(&self, wallet: &str) -> Result<bool, OracleError>;

    /// Most likely owner of `wallet` and how sure the oracle is
    async fn analyze_ownership(&self, wallet: &str) -> Result<Ownership, OracleError>;
}

pub struct LookupClient {
    oracle: Arc<dyn Oracle>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl LookupClient {
    pub fn new(oracle: Arc<dyn Oracle>, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            oracle,
            limiter,
            policy,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Classify one wallet
    pub async fn lookup(&self, wallet: &str) -> Result<LookupResult, LookupError> {
        let label = format!("[{}] {} existence", self.oracle.name(), short(wallet));
        let exists = retry::drive(&self.policy, &self.limiter, LogTag::Oracle, &label, || {
            self.oracle.post_exists(wallet)
        })
        .await
        .map_err(|failure| into_lookup_error(Stage::Existence, failure))?;

        if !exists {
            logger::debug(
                LogTag::Oracle,
                &format!("{}: no posts found", short(wallet)),
            );
            return Ok(LookupResult::no_posts());
        }

        let label = format!("[{}] {} ownership", self.oracle.name(), short(wallet));
        let ownership = retry::drive(&self.policy, &self.limiter, LogTag::Oracle, &label, || {
            self.oracle.analyze_ownership(wallet)
        })
        .await
        .map_err(|failure| into_lookup_error(Stage::Ownership, failure))?;

        let result = LookupResult::found(ownership);
        logger::debug(
            LogTag::Oracle,
            &format!(
                "{}: posts found, owner {} ({})",
                short(wallet),
                result.handle.as_deref().unwrap_or("unknown"),
                result.confidence
            ),
        );
        Ok(result)
    }
}

fn into_lookup_error(stage: Stage, failure: RetryFailure<OracleError>) -> LookupError {
    let RetryFailure { error, state } = failure;
    if error.class() == FailureClass::Fatal {
        LookupError::Fatal {
            stage,
            source: error,
        }
    } else {
        LookupError::RetriesExhausted {
            stage,
            attempts: state.attempt,
            source: error,
        }
    }
}

/// Abbreviated wallet for log lines
pub fn short(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() <= 14 {
        return wallet.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
