//! Sending a single chat completion request.

use std::collections::HashMap;

use async_openai::{
  config::OpenAIConfig,
  error::OpenAIError,
  types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequest,
    CreateChatCompletionResponse, Role,
  },
  Client as OpenAIClient,
};
use async_trait::async_trait;
use serde_json::Value;

use crate::{
  chat::{request::ChatRequest, ChatMessage, ChatRole},
  error::{ChatError, Result},
  options::ChatOptions,
  response::TokenUsage,
  utils::get_openai_client,
};

/// A successful answer from the completion endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
  pub id:      String,
  pub model:   String,
  pub choices: Vec<String>,
  pub usage:   Option<TokenUsage>,
}

/// Something that can carry a [`ChatRequest`] to a completion endpoint.
///
/// Implementations perform exactly one attempt; timeouts and retries are
/// applied by the caller.
#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn complete(&self, request: &ChatRequest) -> Result<Completion>;
}

pub struct OpenAiTransport {
  client: OpenAIClient<OpenAIConfig>,
}

impl OpenAiTransport {
  pub fn new(options: &ChatOptions) -> Result<Self> {
    Ok(Self {
      client: get_openai_client(options)?,
    })
  }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
  async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
    let inner = build_inner_request(request)?;
    let response = self
      .client
      .chat()
      .create(inner)
      .await
      .map_err(map_openai_error)?;
    into_completion(response)
  }
}

fn map_openai_error(err: OpenAIError) -> ChatError {
  match err {
    OpenAIError::ApiError(api) => ChatError::Api {
      message: api.message,
    },
    other => ChatError::Transport(other.to_string()),
  }
}

fn into_completion(response: CreateChatCompletionResponse) -> Result<Completion> {
  let choices: Vec<String> = response
    .choices
    .into_iter()
    .filter_map(|choice| choice.message.content)
    .collect();
  if choices.is_empty() {
    return Err(ChatError::EmptyResponse);
  }
  Ok(Completion {
    id: response.id,
    model: response.model,
    choices,
    usage: response.usage.map(|usage| TokenUsage {
      prompt_tokens:     usage.prompt_tokens,
      completion_tokens: usage.completion_tokens,
      total_tokens:      usage.total_tokens,
    }),
  })
}

fn build_inner_request(
  request: &ChatRequest,
) -> Result<CreateChatCompletionRequest> {
  let params = &request.parameters;
  Ok(CreateChatCompletionRequest {
    model: request.model.clone(),
    messages: request.messages.iter().map(inner_message).collect(),
    temperature: params.temperature.map(|t| t as f32),
    top_p: params.top_p.map(|p| p as f32),
    n: params
      .n
      .map(|n| {
        u8::try_from(n).map_err(|_| ChatError::InvalidParameter {
          name:   "n",
          reason: format!("{} does not fit in a u8", n),
        })
      })
      .transpose()?,
    max_tokens: params
      .max_tokens
      .map(|max| {
        u16::try_from(max).map_err(|_| ChatError::InvalidParameter {
          name:   "max_tokens",
          reason: format!("{} does not fit in a u16", max),
        })
      })
      .transpose()?,
    presence_penalty: params.presence_penalty.map(|p| p as f32),
    frequency_penalty: params.frequency_penalty.map(|p| p as f32),
    logit_bias: params.logit_bias.clone().map(inner_logit_bias).transpose()?,
    ..Default::default()
  })
}

fn inner_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
  ChatCompletionRequestMessage {
    role:          match message.role {
      ChatRole::System => Role::System,
      ChatRole::User => Role::User,
      ChatRole::Assistant => Role::Assistant,
    },
    content:       Some(message.content.clone()),
    name:          None,
    function_call: None,
  }
}

fn inner_logit_bias(bias: Value) -> Result<HashMap<String, Value>> {
  match bias {
    Value::Object(map) => Ok(map.into_iter().collect()),
    other => Err(ChatError::InvalidParameter {
      name:   "logit_bias",
      reason: format!("expected a JSON object, got {}", other),
    }),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::chat::ChatParameters;

  fn request_with(parameters: ChatParameters) -> ChatRequest {
    ChatRequest {
      model: "gpt-3.5-turbo".into(),
      messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
      parameters,
    }
  }

  #[test]
  fn converts_parameters() {
    let inner = build_inner_request(&request_with(
      ChatParameters::new()
        .temperature(0.0)
        .n(2)
        .max_tokens(100)
        .logit_bias(json!({ "50256": -100 })),
    ))
    .unwrap();
    assert_eq!(inner.model, "gpt-3.5-turbo");
    assert_eq!(inner.messages.len(), 2);
    assert_eq!(inner.temperature, Some(0.0));
    assert_eq!(inner.top_p, None);
    assert_eq!(inner.n, Some(2));
    assert_eq!(inner.max_tokens, Some(100));
    assert_eq!(
      inner.logit_bias.unwrap().get("50256"),
      Some(&json!(-100))
    );
  }

  #[test]
  fn rejects_unrepresentable_values() {
    let err =
      build_inner_request(&request_with(ChatParameters::new().max_tokens(70_000)))
        .unwrap_err();
    assert!(matches!(
      err,
      ChatError::InvalidParameter {
        name: "max_tokens",
        ..
      }
    ));

    for n in [256, -1] {
      let err = build_inner_request(&request_with(ChatParameters::new().n(n)))
        .unwrap_err();
      assert!(matches!(err, ChatError::InvalidParameter { name: "n", .. }));
    }

    let err = build_inner_request(&request_with(
      ChatParameters::new().logit_bias(json!([1, 2])),
    ))
    .unwrap_err();
    assert!(matches!(
      err,
      ChatError::InvalidParameter {
        name: "logit_bias",
        ..
      }
    ));
  }
}
