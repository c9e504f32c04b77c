//! Policies for controlling retry, concurrency, timeout and error reporting
//! behavior.

use log::debug;
use tokio::time::Duration;

use crate::{error::ChatError, response::ChatResponse};

#[derive(Clone, Debug, Default)]
pub struct Policies {
  pub retry_policy:       RetryPolicy,
  pub concurrency_policy: ConcurrencyPolicy,
  pub timeout_policy:     TimeoutPolicy,
}

/// A policy for configuring how requests should retry when they fail.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
  /// Never retry.
  Never,
  /// Retry the request immediately.
  Immediate { max_retries: u32 },
  /// Retry the request after a fixed delay.
  ConstantDelay { max_retries: u32, delay: Duration },
  /// Retry the request after a delay that doubles on every attempt, capped
  /// at `max_delay`.
  ExponentialBackoff {
    max_retries:   u32,
    initial_delay: Duration,
    max_delay:     Duration,
  },
}

impl RetryPolicy {
  pub fn immediate(max_retries: u32) -> Self {
    Self::Immediate { max_retries }
  }

  pub fn constant_delay(max_retries: u32, delay: Duration) -> Self {
    Self::ConstantDelay { max_retries, delay }
  }

  pub fn exponential_backoff(
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
  ) -> Self {
    Self::ExponentialBackoff {
      max_retries,
      initial_delay,
      max_delay,
    }
  }

  pub fn max_retries(&self) -> u32 {
    match self {
      RetryPolicy::Never => 0,
      RetryPolicy::Immediate { max_retries }
      | RetryPolicy::ConstantDelay { max_retries, .. }
      | RetryPolicy::ExponentialBackoff { max_retries, .. } => *max_retries,
    }
  }

  /// The delay before retry number `attempt` (zero-based).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    match self {
      RetryPolicy::Never | RetryPolicy::Immediate { .. } => Duration::ZERO,
      RetryPolicy::ConstantDelay { delay, .. } => *delay,
      RetryPolicy::ExponentialBackoff {
        initial_delay,
        max_delay,
        ..
      } => exponential_backoff(attempt, *initial_delay, *max_delay),
    }
  }

  /// Starts tracking the retries of a single request.
  pub fn start(&self) -> Retrier {
    Retrier {
      policy:  self.clone(),
      retries: 0,
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::exponential_backoff(
      5,
      Duration::from_secs(1),
      Duration::from_secs(10),
    )
  }
}

fn exponential_backoff(
  attempt: u32,
  initial_delay: Duration,
  max_delay: Duration,
) -> Duration {
  let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
  initial_delay
    .checked_mul(factor)
    .map_or(max_delay, |delay| delay.min(max_delay))
}

/// Retry bookkeeping for one request.
#[derive(Debug)]
pub struct Retrier {
  policy:  RetryPolicy,
  retries: u32,
}

impl Retrier {
  pub fn retries(&self) -> u32 {
    self.retries
  }

  /// Records a failed attempt. Waits out the policy's delay and returns true
  /// if another attempt is allowed, otherwise returns false immediately.
  pub async fn failed_request(&mut self) -> bool {
    if self.retries >= self.policy.max_retries() {
      return false;
    }
    let delay = self.policy.delay_for(self.retries);
    self.retries += 1;
    if !delay.is_zero() {
      debug!("retry {} after {:?}", self.retries, delay);
      tokio::time::sleep(delay).await;
    }
    true
  }
}

/// A policy for configuring how many requests can be executed concurrently.
/// A limit of zero is treated as one.
#[derive(Clone, Debug)]
pub struct ConcurrencyPolicy {
  pub max_concurrent_requests: usize,
}

impl ConcurrencyPolicy {
  pub fn new(n: usize) -> Self {
    Self {
      max_concurrent_requests: n,
    }
  }
}

impl Default for ConcurrencyPolicy {
  fn default() -> Self {
    Self {
      max_concurrent_requests: 10,
    }
  }
}

/// A policy bounding how long a single attempt may take.
#[derive(Clone, Debug)]
pub struct TimeoutPolicy {
  pub timeout: Duration,
}

impl TimeoutPolicy {
  pub fn new(timeout: Duration) -> Self {
    Self { timeout }
  }
}

impl Default for TimeoutPolicy {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
    }
  }
}

/// How remote failures reach the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
  /// Remote failures are returned as `Err`.
  Propagate,
  /// Remote failures are stored in [`ChatResponse::error`] and the call
  /// returns `Ok`.
  Embed,
}

impl ErrorPolicy {
  /// Applies the policy to the outcome of a call. Local failures, such as a
  /// missing conversation, are always propagated.
  pub fn apply(
    self,
    conversation_id: u64,
    model: &str,
    result: Result<ChatResponse, ChatError>,
  ) -> Result<ChatResponse, ChatError> {
    match (self, result) {
      (ErrorPolicy::Embed, Err(err)) if err.is_remote() => {
        Ok(ChatResponse::failed(conversation_id, model, err))
      }
      (_, result) => result,
    }
  }
}
