//! The result of a chat turn.

use core::fmt::{Display, Formatter};

use crate::error::ChatError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
  pub prompt_tokens:     u32,
  pub completion_tokens: u32,
  pub total_tokens:      u32,
}

#[derive(Debug)]
pub struct ChatResponse {
  /// Id assigned by the remote service; empty when the call failed.
  pub id:              String,
  pub conversation_id: u64,
  pub model:           String,
  /// One entry per requested choice.
  pub choices:         Vec<String>,
  pub usage:           Option<TokenUsage>,
  /// Set instead of returning an error when remote failures are embedded.
  pub error:           Option<ChatError>,
}

impl ChatResponse {
  pub(crate) fn failed(conversation_id: u64, model: &str, error: ChatError) -> Self {
    Self {
      id: String::new(),
      conversation_id,
      model: model.to_string(),
      choices: vec![],
      usage: None,
      error: Some(error),
    }
  }

  pub fn is_successful(&self) -> bool {
    self.error.is_none()
  }

  /// The first choice, which is the one stored in the conversation.
  pub fn content(&self) -> Option<&str> {
    self.choices.first().map(String::as_str)
  }
}

impl Display for ChatResponse {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match (&self.error, self.content()) {
      (Some(err), _) => write!(f, "error: {}", err),
      (None, Some(content)) => write!(f, "{}", content),
      (None, None) => Ok(()),
    }
  }
}
