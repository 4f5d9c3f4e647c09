use async_trait::async_trait;

use crate::{
    domain::{ChatId, GroupInfo, MessageId},
    Result,
};

/// Hexagonal port over the messaging account.
///
/// The Telegram adapter implements this over an MTProto user session. Chats are
/// referred to by [`ChatId`]; the adapter keeps whatever handle it needs to
/// address them again.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// All group conversations visible to the account (channels and DMs excluded).
    async fn list_groups(&self) -> Result<Vec<GroupInfo>>;

    /// Up to `limit` ids of messages the account itself sent to `chat`, in backend order.
    async fn own_message_ids(&self, chat: ChatId, limit: usize) -> Result<Vec<MessageId>>;

    /// Delete `ids` from `chat`, revoking them for every participant.
    ///
    /// A flood wait must be reported as [`crate::Error::RateLimited`]; the
    /// caller owns the retry decision.
    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId]) -> Result<usize>;
}

/// Synchronous source of user answers (terminal in production, scripted in tests).
pub trait Prompter: Send + Sync {
    /// Ask for a single line of text.
    fn line(&self, prompt: &str) -> Result<String>;

    /// Ask for a line without echoing it.
    fn secret(&self, prompt: &str) -> Result<String>;
}
