//! Identifiers of the chat models accepted by the completion endpoint.

/// The default model, used when neither the options nor the call name one.
pub const GPT_35_TURBO: &str = "gpt-3.5-turbo";
pub const GPT_35_TURBO_16K: &str = "gpt-3.5-turbo-16k";
pub const GPT_4: &str = "gpt-4";
pub const GPT_4_32K: &str = "gpt-4-32k";
