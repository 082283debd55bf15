//! Bounded retry with a fixed pause, modelled as an explicit state machine.
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{config::RetryPolicy, error::TableError};

/// Attempts logged at warn level are the ones divisible by this.
const LOG_EVERY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Nothing attempted yet.
    Idle,
    /// `attempt` calls failed so far and the budget is not spent.
    Retrying { attempt: u32 },
    Succeeded,
    /// Budget spent; the caller tries again on its next tick.
    GivenUp,
}

#[derive(Debug, Clone)]
pub struct Retry {
    policy: RetryPolicy,
    state: RetryState,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        match self.state {
            RetryState::Retrying { attempt } => attempt,
            RetryState::GivenUp => self.policy.times,
            RetryState::Idle | RetryState::Succeeded => 0,
        }
    }

    pub fn on_success(&mut self) -> RetryState {
        self.state = RetryState::Succeeded;
        self.state
    }

    pub fn on_failure(&mut self) -> RetryState {
        let attempt = self.failures() + 1;
        self.state = if attempt >= self.policy.times {
            RetryState::GivenUp
        } else {
            RetryState::Retrying { attempt }
        };
        self.state
    }

    pub fn reset(&mut self) {
        self.state = RetryState::Idle;
    }

    /// Call `op` until it succeeds, the budget is spent or `ctx` is canceled.
    ///
    /// Returns the last error on exhaustion and [`TableError::Canceled`] on cancellation.
    pub async fn run<T, F, Fut>(
        &mut self,
        ctx: &CancellationToken,
        what: &'static str,
        mut op: F,
    ) -> Result<T, TableError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TableError>>,
    {
        self.reset();
        if self.policy.times == 0 {
            self.state = RetryState::GivenUp;
            return Err(TableError::Other(format!("{what}: retry budget is zero")));
        }
        loop {
            let attempt = self.failures();
            let result = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(TableError::Canceled),
                r = op() => r,
            };
            let err = match result {
                Ok(v) => {
                    self.on_success();
                    return Ok(v);
                }
                Err(err) => err,
            };
            if ctx.is_cancelled() {
                return Err(TableError::Canceled);
            }
            if attempt % LOG_EVERY == 0 {
                warn!(what, retry_times = attempt, error = %err, "registry call failed, retrying");
            }
            if self.on_failure() == RetryState::GivenUp {
                return Err(err);
            }
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(TableError::Canceled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }
}
