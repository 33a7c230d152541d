/// Remote chat service contract consumed by conversations
use crate::error::Result;
use crate::types::{Bot, Message};
use async_trait::async_trait;

/// Persisted history and model replies, one transcript per bot.
///
/// Every call is authenticated by the implementation; a rejected
/// credential comes back as `ChatError::Auth`.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Ordered transcript, oldest first. `NotFound` if the bot is missing
    /// or not visible to the caller.
    async fn history(&self, bot_id: i64) -> Result<Vec<Message>>;

    /// Persist a user message and return the generated reply text.
    async fn append(&self, bot_id: i64, text: &str) -> Result<String>;

    /// Remove the most recent user+bot exchange. `NotFound` if there is none.
    async fn delete_last_exchange(&self, bot_id: i64) -> Result<()>;

    /// Bot metadata for the conversation header.
    async fn bot(&self, bot_id: i64) -> Result<Bot>;
}
