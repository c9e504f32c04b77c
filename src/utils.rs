use async_openai::{config::OpenAIConfig, Client as OpenAIClient};

use crate::{
  error::{ChatError, Result},
  options::ChatOptions,
};

pub fn get_openai_client(
  options: &ChatOptions,
) -> Result<OpenAIClient<OpenAIConfig>> {
  let api_key = options
    .api_key
    .as_deref()
    .filter(|key| !key.trim().is_empty())
    .ok_or(ChatError::MissingApiKey)?;
  let config = OpenAIConfig::new().with_api_key(api_key);
  let config = match &options.organization {
    Some(organization) => config.with_org_id(organization),
    None => config,
  };
  Ok(OpenAIClient::<OpenAIConfig>::with_config(config))
}

/// A fresh random id for a conversation.
pub fn new_conversation_id() -> u64 {
  use tinyrand::Rand;
  tinyrand_std::thread_rand().next_u64()
}
