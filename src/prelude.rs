//! Provides a useful collection of `chatgpt-orch` types

pub use crate::{
  cache::{ChatCache, MemoryCache},
  chat::{
    completion::{ChatTransport, Completion},
    request::ChatRequest,
    ChatMessage, ChatParameters, ChatRole,
  },
  error::{ChatError, Result},
  models,
  options::ChatOptions,
  policies::{
    ConcurrencyPolicy, ErrorPolicy, Policies, RetryPolicy, TimeoutPolicy,
  },
  response::{ChatResponse, TokenUsage},
  ChatGpt,
};
