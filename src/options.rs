//! Process-wide settings shared by every request.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::{
  chat::ChatParameters, error::Result, models, policies::ErrorPolicy,
};

/// Settings for configuring the chat client.
///
/// Build it once at startup and hand it to [`crate::ChatGpt`]. Nothing here
/// is validated: out-of-range values are forwarded and left for the remote
/// service to reject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
  /// Secret key used as the bearer token. Required once a client is built.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key:                  Option<String>,
  /// Maximum number of messages kept as context for a conversation.
  pub message_limit:            usize,
  /// How long a conversation stays cached after its last update.
  #[serde(with = "humantime_serde")]
  pub message_expiration:       Duration,
  /// When false, remote failures are returned inside the response instead
  /// of as an error.
  pub throw_exception_on_error: bool,
  /// Sent as the organization header, for keys shared across organizations.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub organization:             Option<String>,
  pub default_model:            String,
  /// Sampling defaults, overridden per call by [`ChatParameters`].
  #[serde(flatten)]
  pub defaults:                 ChatParameters,
}

impl Default for ChatOptions {
  fn default() -> Self {
    Self {
      api_key:                  None,
      message_limit:            10,
      message_expiration:       Duration::from_secs(60 * 60),
      throw_exception_on_error: true,
      organization:             None,
      default_model:            String::from(models::GPT_35_TURBO),
      defaults:                 ChatParameters::default(),
    }
  }
}

impl ChatOptions {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: Some(api_key.into()),
      ..Default::default()
    }
  }

  /// Reads `OPENAI_API_KEY`, `OPENAI_ORG_ID` and `OPENAI_DEFAULT_MODEL`,
  /// loading a `.env` file first if one exists. Missing variables keep their
  /// defaults.
  pub fn from_env() -> Self {
    dotenv::dotenv().ok();
    let defaults = Self::default();
    let options = Self {
      api_key: std::env::var("OPENAI_API_KEY").ok(),
      organization: std::env::var("OPENAI_ORG_ID").ok(),
      default_model: std::env::var("OPENAI_DEFAULT_MODEL")
        .unwrap_or(defaults.default_model.clone()),
      ..defaults
    };
    debug!(
      "loaded options from env (api key set: {}, model: {})",
      options.api_key.is_some(),
      options.default_model
    );
    options
  }

  pub fn from_json_str(s: &str) -> Result<Self> {
    Ok(serde_json::from_str(s)?)
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Self::from_json_str(&content)
  }

  pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
    self.api_key = Some(api_key.into());
    self
  }

  pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
    self.organization = Some(organization.into());
    self
  }

  pub fn with_message_limit(mut self, message_limit: usize) -> Self {
    self.message_limit = message_limit;
    self
  }

  pub fn with_message_expiration(mut self, expiration: Duration) -> Self {
    self.message_expiration = expiration;
    self
  }

  pub fn with_throw_exception_on_error(mut self, throw: bool) -> Self {
    self.throw_exception_on_error = throw;
    self
  }

  pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
    self.default_model = model.into();
    self
  }

  pub fn with_defaults(mut self, defaults: ChatParameters) -> Self {
    self.defaults = defaults;
    self
  }

  /// The model a call should use: its own choice, or the default model.
  pub fn effective_model<'a>(&'a self, model: Option<&'a str>) -> &'a str {
    model.unwrap_or(&self.default_model)
  }

  pub fn error_policy(&self) -> ErrorPolicy {
    if self.throw_exception_on_error {
      ErrorPolicy::Propagate
    } else {
      ErrorPolicy::Embed
    }
  }
}
