//! Messages and sampling parameters for Chat models.

pub mod completion;
pub mod request;

use core::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling parameters accepted by the chat completion endpoint.
///
/// Every field is optional: an unset field is left out of the payload so the
/// remote service applies its own default, while an explicit value (including
/// zero) is always sent.
///
/// Refer to <https://platform.openai.com/docs/api-reference/chat/create> for
/// the meaning of each parameter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature:       Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub top_p:             Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub n:                 Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_tokens:        Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub presence_penalty:  Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency_penalty: Option<f64>,
  /// Token id to bias map, forwarded as-is.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logit_bias:        Option<Value>,
}

impl ChatParameters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn temperature(mut self, temperature: f64) -> Self {
    self.temperature = Some(temperature);
    self
  }

  pub fn top_p(mut self, top_p: f64) -> Self {
    self.top_p = Some(top_p);
    self
  }

  pub fn n(mut self, n: i64) -> Self {
    self.n = Some(n);
    self
  }

  pub fn max_tokens(mut self, max_tokens: i64) -> Self {
    self.max_tokens = Some(max_tokens);
    self
  }

  pub fn presence_penalty(mut self, presence_penalty: f64) -> Self {
    self.presence_penalty = Some(presence_penalty);
    self
  }

  pub fn frequency_penalty(mut self, frequency_penalty: f64) -> Self {
    self.frequency_penalty = Some(frequency_penalty);
    self
  }

  pub fn logit_bias(mut self, logit_bias: Value) -> Self {
    self.logit_bias = Some(logit_bias);
    self
  }

  /// Layers these parameters on top of `defaults`. Fields set here win;
  /// unset fields take the value from `defaults`.
  pub fn merged_over(&self, defaults: &ChatParameters) -> ChatParameters {
    ChatParameters {
      temperature:       self.temperature.or(defaults.temperature),
      top_p:             self.top_p.or(defaults.top_p),
      n:                 self.n.or(defaults.n),
      max_tokens:        self.max_tokens.or(defaults.max_tokens),
      presence_penalty:  self.presence_penalty.or(defaults.presence_penalty),
      frequency_penalty: self
        .frequency_penalty
        .or(defaults.frequency_penalty),
      logit_bias:        self
        .logit_bias
        .clone()
        .or_else(|| defaults.logit_bias.clone()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  System,
  User,
  Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    ChatRole,
  pub content: String,
}

impl ChatMessage {
  pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
    Self {
      role,
      content: content.into(),
    }
  }

  pub fn system(content: impl Into<String>) -> Self {
    Self::new(ChatRole::System, content)
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self::new(ChatRole::User, content)
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self::new(ChatRole::Assistant, content)
  }
}

impl Display for ChatMessage {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let role = match self.role {
      ChatRole::System => "system",
      ChatRole::User => "user",
      ChatRole::Assistant => "assistant",
    };
    write!(f, "{}: {}", role, self.content)
  }
}

/// Keeps at most `limit` messages, dropping the oldest first. A leading
/// system message is always kept and counts toward the limit.
pub fn trim_history(messages: &mut Vec<ChatMessage>, limit: usize) {
  if messages.len() <= limit {
    return;
  }
  let pinned = matches!(messages.first(), Some(m) if m.role == ChatRole::System)
    && limit > 0;
  let keep = if pinned { limit - 1 } else { limit };
  let start = if pinned { 1 } else { 0 };
  let excess = messages.len() - start - keep;
  messages.drain(start..start + excess);
}

/// Trims the messages about to be sent. The last message is the new
/// question and is always kept; the earlier history shares what is left of
/// `limit`.
pub fn trim_context(messages: &mut Vec<ChatMessage>, limit: usize) {
  let Some(question) = messages.pop() else {
    return;
  };
  trim_history(messages, limit.saturating_sub(1));
  messages.push(question);
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn unset_fields_are_omitted() {
    let params = ChatParameters::new().max_tokens(64);
    assert_eq!(
      serde_json::to_value(&params).unwrap(),
      json!({ "max_tokens": 64 })
    );
    assert_eq!(
      serde_json::to_string(&ChatParameters::new()).unwrap(),
      "{}"
    );
  }

  #[test]
  fn zero_temperature_is_sent() {
    let params = ChatParameters::new().temperature(0.0);
    assert_eq!(
      serde_json::to_string(&params).unwrap(),
      r#"{"temperature":0.0}"#
    );
  }

  #[test]
  fn wire_names_are_snake_case() {
    let params = ChatParameters::new()
      .temperature(0.7)
      .top_p(0.9)
      .n(2)
      .max_tokens(100)
      .presence_penalty(0.5)
      .frequency_penalty(-0.5)
      .logit_bias(json!({ "50256": -100 }));
    assert_eq!(
      serde_json::to_value(&params).unwrap(),
      json!({
        "temperature": 0.7,
        "top_p": 0.9,
        "n": 2,
        "max_tokens": 100,
        "presence_penalty": 0.5,
        "frequency_penalty": -0.5,
        "logit_bias": { "50256": -100 },
      })
    );
  }

  #[test]
  fn survives_a_serde_round_trip() {
    let params = ChatParameters::new()
      .temperature(0.0)
      .frequency_penalty(1.25)
      .logit_bias(json!({ "1": 5, "nested": { "a": [1, 2.5, null] } }));
    let text = serde_json::to_string(&params).unwrap();
    let back: ChatParameters = serde_json::from_str(&text).unwrap();
    assert_eq!(back, params);
    assert!(!text.contains("top_p"));
    assert!(!text.contains("\"n\""));
  }

  #[test]
  fn merge_prefers_the_override() {
    let defaults = ChatParameters::new().max_tokens(50).temperature(1.0);

    let merged = ChatParameters::new().max_tokens(100).merged_over(&defaults);
    assert_eq!(merged.max_tokens, Some(100));
    assert_eq!(merged.temperature, Some(1.0));

    let merged = ChatParameters::new().merged_over(&defaults);
    assert_eq!(merged.max_tokens, Some(50));

    let merged = ChatParameters::new()
      .max_tokens(100)
      .merged_over(&ChatParameters::new());
    assert_eq!(merged.max_tokens, Some(100));
    assert_eq!(merged.temperature, None);
  }

  #[test]
  fn merge_keeps_an_explicit_zero() {
    let defaults = ChatParameters::new().temperature(0.8);
    let merged = ChatParameters::new().temperature(0.0).merged_over(&defaults);
    assert_eq!(merged.temperature, Some(0.0));
  }

  #[test]
  fn trim_drops_oldest_and_pins_system() {
    let mut messages = vec![
      ChatMessage::system("be brief"),
      ChatMessage::user("1"),
      ChatMessage::assistant("2"),
      ChatMessage::user("3"),
      ChatMessage::assistant("4"),
    ];
    trim_history(&mut messages, 3);
    assert_eq!(
      messages,
      vec![
        ChatMessage::system("be brief"),
        ChatMessage::user("3"),
        ChatMessage::assistant("4"),
      ]
    );
  }

  #[test]
  fn context_always_keeps_the_question() {
    let mut messages =
      vec![ChatMessage::system("sys"), ChatMessage::user("question")];
    trim_context(&mut messages, 1);
    assert_eq!(messages, vec![ChatMessage::user("question")]);

    let mut messages = vec![ChatMessage::user("question")];
    trim_context(&mut messages, 0);
    assert_eq!(messages, vec![ChatMessage::user("question")]);

    let mut messages = vec![
      ChatMessage::system("sys"),
      ChatMessage::user("old"),
      ChatMessage::assistant("answer"),
      ChatMessage::user("question"),
    ];
    trim_context(&mut messages, 2);
    assert_eq!(
      messages,
      vec![ChatMessage::system("sys"), ChatMessage::user("question")]
    );
  }

  #[test]
  fn history_limit_zero_stores_nothing() {
    let mut messages =
      vec![ChatMessage::user("question"), ChatMessage::assistant("answer")];
    trim_history(&mut messages, 0);
    assert!(messages.is_empty());
  }

  #[test]
  fn negative_counts_pass_through() {
    let params: ChatParameters =
      serde_json::from_str(r#"{ "n": -1, "max_tokens": -5 }"#).unwrap();
    assert_eq!(params.n, Some(-1));
    assert_eq!(params.max_tokens, Some(-5));
    assert_eq!(
      serde_json::to_value(&params).unwrap(),
      json!({ "n": -1, "max_tokens": -5 })
    );
  }

  #[test]
  fn trim_without_system_keeps_latest() {
    let mut messages: Vec<_> =
      (0..12).map(|i| ChatMessage::user(i.to_string())).collect();
    trim_history(&mut messages, 10);
    assert_eq!(messages.len(), 10);
    assert_eq!(messages[0].content, "2");
  }
}
