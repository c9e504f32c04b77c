//! The crate-wide error type.

use thiserror::Error;
use tokio::time::Duration;

pub type Result<T> = std::result::Result<T, ChatError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ChatError {
  /// No API key was configured when the client was built.
  #[error("no api key configured")]
  MissingApiKey,

  /// The remote service answered with an error payload.
  #[error("api error: {message}")]
  Api { message: String },

  /// The request never produced a response from the remote service.
  #[error("transport error: {0}")]
  Transport(String),

  #[error("request timed out after {0:?}")]
  Timeout(Duration),

  /// A parameter could not be expressed in the outbound request.
  #[error("invalid parameter {name}: {reason}")]
  InvalidParameter {
    name:   &'static str,
    reason: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("conversation {0} not found")]
  ConversationNotFound(u64),

  /// The remote service answered without any completion text.
  #[error("response contained no completion")]
  EmptyResponse,

  /// The client's request semaphore was closed.
  #[error("client is shut down")]
  Closed,
}

impl ChatError {
  /// Whether the failure came from the remote call, as opposed to local
  /// setup. Only remote failures are subject to the error policy.
  pub fn is_remote(&self) -> bool {
    matches!(
      self,
      ChatError::Api { .. }
        | ChatError::Transport(_)
        | ChatError::Timeout(_)
        | ChatError::EmptyResponse
    )
  }

  /// Whether retrying the same request may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, ChatError::Transport(_) | ChatError::Timeout(_))
  }
}
