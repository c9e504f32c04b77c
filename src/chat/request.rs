use serde::{Deserialize, Serialize};

use crate::{
  chat::{ChatMessage, ChatParameters},
  options::ChatOptions,
};

/// The body posted to the chat completion endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
  pub model:      String,
  pub messages:   Vec<ChatMessage>,
  #[serde(flatten)]
  pub parameters: ChatParameters,
}

impl ChatRequest {
  /// Builds a request from the global options and an optional per-call
  /// override. The override's fields win over the option defaults, and the
  /// option's default model is used when `model` is `None`.
  pub fn build(
    options: &ChatOptions,
    parameters: Option<&ChatParameters>,
    model: Option<&str>,
    messages: Vec<ChatMessage>,
  ) -> Self {
    let parameters = match parameters {
      Some(parameters) => parameters.merged_over(&options.defaults),
      None => options.defaults.clone(),
    };
    Self {
      model: options.effective_model(model).to_string(),
      messages,
      parameters,
    }
  }
}
