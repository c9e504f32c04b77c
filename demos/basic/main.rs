use std::time::Duration;

use anyhow::Context;
use chatgpt_orch::prelude::*;
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  env_logger::init();

  let options = ChatOptions::from_env()
    .with_defaults(ChatParameters::new().temperature(0.2).max_tokens(256));
  let chat = ChatGpt::new(
    options,
    Policies {
      concurrency_policy: ConcurrencyPolicy::new(5),
      timeout_policy: TimeoutPolicy::new(Duration::from_secs(15)),
      ..Default::default()
    },
  )
  .context("set OPENAI_API_KEY to run this demo")?;

  let conversation = chat
    .setup(None, "You are a helpful assistant. Answer in one sentence.")
    .await?;

  let mut handles = vec![];
  for topic in ["Rust", "Tokio", "Serde"] {
    let chat = chat.clone();
    handles.push(tokio::spawn(async move {
      let response = chat
        .ask(&format!("What is {}?", topic), None)
        .await?;
      info!("{}: {}", topic, response);
      anyhow::Ok(())
    }));
  }
  for result in futures::future::join_all(handles).await {
    result??;
  }

  let creative = ChatParameters::new().temperature(1.0).n(1);
  let first = chat
    .ask_in(conversation, "Name a prime number.", Some(&creative), None)
    .await?;
  info!("{}", first);
  let second = chat
    .ask_in(conversation, "Now double it.", None, Some(models::GPT_4))
    .await?;
  info!("{}", second);

  for message in chat.get_conversation(conversation).await? {
    info!("{}", message);
  }
  chat.delete_conversation(conversation).await?;
  Ok(())
}
