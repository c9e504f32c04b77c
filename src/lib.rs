pub mod cache;
pub mod chat;
pub mod error;
pub mod models;
pub mod options;
pub mod policies;
pub mod prelude;
pub mod response;
pub mod utils;

use std::{collections::HashMap, sync::Arc};

use log::{debug, error, info, warn};
use tokio::{
  sync::{Mutex, Semaphore},
  time::timeout,
};

use crate::{
  cache::{ChatCache, MemoryCache},
  chat::{
    completion::{ChatTransport, Completion, OpenAiTransport},
    request::ChatRequest,
    trim_context, trim_history, ChatMessage, ChatParameters, ChatRole,
  },
  error::{ChatError, Result},
  options::ChatOptions,
  policies::Policies,
  response::ChatResponse,
  utils::new_conversation_id,
};

/// A chat client that remembers conversations between turns.
///
/// Cloning is cheap and clones share options, cache and the concurrency
/// limit, so a single client can be handed to many tasks. Turns on the same
/// conversation run one at a time; turns on different conversations run
/// concurrently.
#[derive(Clone)]
pub struct ChatGpt {
  options:   Arc<ChatOptions>,
  policies:  Policies,
  transport: Arc<dyn ChatTransport>,
  cache:     Arc<dyn ChatCache>,
  semaphore: Arc<Semaphore>,
  turns:     Arc<Mutex<HashMap<u64, Arc<Mutex<()>>>>>,
}

impl ChatGpt {
  /// Builds a client talking to OpenAI, with conversations kept in memory.
  ///
  /// Fails with [`ChatError::MissingApiKey`] if `options` has no API key.
  pub fn new(options: ChatOptions, policies: Policies) -> Result<Self> {
    let transport = OpenAiTransport::new(&options)?;
    Ok(Self::with_parts(
      options,
      policies,
      Arc::new(transport),
      Arc::new(MemoryCache::new()),
    ))
  }

  pub fn with_parts(
    options: ChatOptions,
    policies: Policies,
    transport: Arc<dyn ChatTransport>,
    cache: Arc<dyn ChatCache>,
  ) -> Self {
    // a zero limit would park every request forever
    let permits = policies.concurrency_policy.max_concurrent_requests.max(1);
    Self {
      semaphore: Arc::new(Semaphore::new(permits)),
      options: Arc::new(options),
      policies,
      transport,
      cache,
      turns: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn options(&self) -> &ChatOptions {
    &self.options
  }

  /// Starts a conversation with a system message, replacing any history the
  /// conversation already had. A new id is generated when none is given.
  pub async fn setup(
    &self,
    conversation_id: Option<u64>,
    system_message: &str,
  ) -> Result<u64> {
    let conversation_id = conversation_id.unwrap_or_else(new_conversation_id);
    let turn = self.turn_lock(conversation_id).await;
    let _turn = turn.lock().await;
    self
      .cache
      .set(
        conversation_id,
        vec![ChatMessage::system(system_message)],
        self.options.message_expiration,
      )
      .await?;
    debug!("set up conversation {}", conversation_id);
    Ok(conversation_id)
  }

  /// Asks a question in a brand-new conversation.
  pub async fn ask(
    &self,
    message: &str,
    parameters: Option<&ChatParameters>,
  ) -> Result<ChatResponse> {
    self
      .ask_in(new_conversation_id(), message, parameters, None)
      .await
  }

  /// Asks a question within a conversation, creating it if it does not
  /// exist. `parameters` override the sampling defaults of the options and
  /// `model` overrides the default model.
  pub async fn ask_in(
    &self,
    conversation_id: u64,
    message: &str,
    parameters: Option<&ChatParameters>,
    model: Option<&str>,
  ) -> Result<ChatResponse> {
    let model = self.options.effective_model(model).to_string();
    let turn = self.turn_lock(conversation_id).await;
    let _turn = turn.lock().await;
    let result = self
      .ask_inner(conversation_id, message, parameters, &model)
      .await;
    if let Err(err) = &result {
      warn!("conversation {} failed: {}", conversation_id, err);
    }
    self
      .options
      .error_policy()
      .apply(conversation_id, &model, result)
  }

  async fn ask_inner(
    &self,
    conversation_id: u64,
    message: &str,
    parameters: Option<&ChatParameters>,
    model: &str,
  ) -> Result<ChatResponse> {
    let mut messages =
      self.cache.get(conversation_id).await?.unwrap_or_default();
    messages.push(ChatMessage::user(message));
    trim_context(&mut messages, self.options.message_limit);

    let request =
      ChatRequest::build(&self.options, parameters, Some(model), messages);
    let completion = self.send(conversation_id, &request).await?;

    let mut messages = request.messages;
    if let Some(answer) = completion.choices.first() {
      messages.push(ChatMessage::new(ChatRole::Assistant, answer.clone()));
    }
    trim_history(&mut messages, self.options.message_limit);
    self
      .cache
      .set(conversation_id, messages, self.options.message_expiration)
      .await?;

    Ok(ChatResponse {
      id: completion.id,
      conversation_id,
      model: completion.model,
      choices: completion.choices,
      usage: completion.usage,
      error: None,
    })
  }

  /// The lock serializing turns on `conversation_id`. Locks nobody holds are
  /// dropped from the table on the way.
  async fn turn_lock(&self, conversation_id: u64) -> Arc<Mutex<()>> {
    let mut turns = self.turns.lock().await;
    turns.retain(|_, lock| Arc::strong_count(lock) > 1);
    turns.entry(conversation_id).or_default().clone()
  }

  /// Sends one request, honoring the concurrency, timeout and retry
  /// policies.
  async fn send(&self, id: u64, request: &ChatRequest) -> Result<Completion> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| ChatError::Closed)?;
    debug!("starting request for conversation {}", id);
    let mut retrier = self.policies.retry_policy.start();
    let limit = self.policies.timeout_policy.timeout;

    // continue trying until we get a response or we reach max retry
    loop {
      let timer = timing::start();
      let err = match timeout(limit, self.transport.complete(request)).await {
        Ok(Ok(completion)) => {
          info!(
            "got response for {} in {}s",
            id,
            timer.elapsed().as_secs_f32()
          );
          return Ok(completion);
        }
        Ok(Err(err)) => err,
        Err(_) => {
          debug!(
            "request for {} timed out after {}s",
            id,
            limit.as_secs_f32()
          );
          ChatError::Timeout(limit)
        }
      };

      if !err.is_retryable() {
        return Err(err);
      }
      if !retrier.failed_request().await {
        error!(
          "request for {} reached max retry ({})",
          id,
          retrier.retries()
        );
        return Err(err);
      }
    }
  }

  /// The stored history of a conversation, oldest message first.
  pub async fn get_conversation(
    &self,
    conversation_id: u64,
  ) -> Result<Vec<ChatMessage>> {
    self
      .cache
      .get(conversation_id)
      .await?
      .ok_or(ChatError::ConversationNotFound(conversation_id))
  }

  pub async fn delete_conversation(&self, conversation_id: u64) -> Result<()> {
    let turn = self.turn_lock(conversation_id).await;
    let _turn = turn.lock().await;
    self.cache.remove(conversation_id).await
  }
}
