//! Storage for conversation history between turns.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use log::debug;
use tokio::{
  sync::Mutex,
  time::{Duration, Instant},
};

use crate::{chat::ChatMessage, error::Result};

/// Where conversations live between calls. Implementations must be safe to
/// share between concurrent requests.
#[async_trait]
pub trait ChatCache: Send + Sync {
  async fn get(&self, conversation_id: u64) -> Result<Option<Vec<ChatMessage>>>;

  /// Stores `messages`, replacing any previous history. The entry expires
  /// `expiration` after this call.
  async fn set(
    &self,
    conversation_id: u64,
    messages: Vec<ChatMessage>,
    expiration: Duration,
  ) -> Result<()>;

  async fn remove(&self, conversation_id: u64) -> Result<()>;

  async fn exists(&self, conversation_id: u64) -> Result<bool> {
    Ok(self.get(conversation_id).await?.is_some())
  }
}

struct Entry {
  messages:   Vec<ChatMessage>,
  expires_at: Instant,
}

/// An in-process [`ChatCache`].
#[derive(Clone, Default)]
pub struct MemoryCache {
  entries: Arc<Mutex<HashMap<u64, Entry>>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drops every expired conversation.
  pub async fn purge_expired(&self) {
    let now = Instant::now();
    let mut entries = self.entries.lock().await;
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    debug!("purged {} expired conversations", before - entries.len());
  }
}

#[async_trait]
impl ChatCache for MemoryCache {
  async fn get(&self, conversation_id: u64) -> Result<Option<Vec<ChatMessage>>> {
    let mut entries = self.entries.lock().await;
    match entries.get(&conversation_id) {
      Some(entry) if entry.expires_at > Instant::now() => {
        Ok(Some(entry.messages.clone()))
      }
      Some(_) => {
        debug!("conversation {} expired", conversation_id);
        entries.remove(&conversation_id);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn set(
    &self,
    conversation_id: u64,
    messages: Vec<ChatMessage>,
    expiration: Duration,
  ) -> Result<()> {
    let now = Instant::now();
    let mut entries = self.entries.lock().await;
    // conversations that are never read again are only dropped here
    entries.retain(|_, entry| entry.expires_at > now);
    entries.insert(
      conversation_id,
      Entry {
        messages,
        expires_at: now + expiration,
      },
    );
    Ok(())
  }

  async fn remove(&self, conversation_id: u64) -> Result<()> {
    self.entries.lock().await.remove(&conversation_id);
    Ok(())
  }
}
