use serde::Serialize;

/// Telegram chat id (numeric, as reported by the client library).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, unique within a chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub i32);

/// A group conversation as listed by the backend, before its messages are fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub chat_id: ChatId,
    pub name: String,
}

/// One group together with the ids of the messages the account sent there.
///
/// The count is always derived from `message_ids`, so the two can never drift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRecord {
    chat_id: ChatId,
    name: String,
    message_ids: Vec<MessageId>,
}

impl GroupRecord {
    pub fn new(chat_id: ChatId, name: impl Into<String>, message_ids: Vec<MessageId>) -> Self {
        Self {
            chat_id,
            name: name.into(),
            message_ids,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message_ids(&self) -> &[MessageId] {
        &self.message_ids
    }

    pub fn message_count(&self) -> usize {
        self.message_ids.len()
    }
}

/// Outcome of cleaning a single group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub name: String,
    pub requested: usize,
    pub deleted: usize,
    pub batches: usize,
    pub rate_limit_waits: u32,
    pub dry_run: bool,
}
