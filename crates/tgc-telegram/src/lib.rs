//! Telegram adapter (grammers).
//!
//! This crate implements the `tgc-core` ChatBackend over an MTProto user session.
//! Bot API clients cannot see a user's dialogs or revoke their messages, so the
//! session logs in as the account itself.

use std::{collections::HashMap, path::PathBuf, time::Duration};

use async_trait::async_trait;
use grammers_client::{types::Chat, Client, Config as ClientConfig, InitParams, SignInError};
use grammers_mtsender::InvocationError;
use grammers_session::{PackedChat, Session};
use tokio::sync::Mutex;
use tracing::{debug, info};

use tgc_core::{
    config::Config,
    domain::{ChatId, GroupInfo, MessageId},
    errors::Error,
    ports::{ChatBackend, Prompter},
    Result,
};

/// An authorized Telegram session.
///
/// Created once at startup and released with [`TelegramBackend::close`], which
/// persists the session file for the next run.
pub struct TelegramBackend {
    client: Client,
    session_file: PathBuf,
    chats: Mutex<HashMap<i64, PackedChat>>,
}

impl TelegramBackend {
    /// Connect and, if the stored session is not authorized yet, log in interactively.
    pub async fn connect(cfg: &Config, prompter: &dyn Prompter) -> Result<Self> {
        let session = Session::load_file_or_create(&cfg.session_file)?;

        info!("Connecting to Telegram...");
        let client = Client::connect(ClientConfig {
            session,
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            params: InitParams {
                // Flood waits are surfaced to the core, which decides how long to sleep.
                flood_sleep_threshold: 0,
                ..Default::default()
            },
        })
        .await
        .map_err(|e| Error::External(format!("failed to connect: {e}")))?;

        let backend = Self {
            client,
            session_file: cfg.session_file.clone(),
            chats: Mutex::new(HashMap::new()),
        };

        let authorized = backend
            .client
            .is_authorized()
            .await
            .map_err(Self::map_err)?;
        if !authorized {
            backend.sign_in(cfg.phone.as_deref(), prompter).await?;
            backend.close()?;
        }

        Ok(backend)
    }

    async fn sign_in(&self, phone: Option<&str>, prompter: &dyn Prompter) -> Result<()> {
        let phone = match phone {
            Some(p) => p.to_string(),
            None => prompter.line("Phone number (international format)")?,
        };

        let token = self
            .client
            .request_login_code(phone.trim())
            .await
            .map_err(|e| Error::Auth(format!("could not request login code: {e}")))?;
        let code = prompter.line("Login code")?;

        match self.client.sign_in(&token, code.trim()).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().unwrap_or("none").to_string();
                let password = prompter.secret(&format!("2FA password (hint: {hint})"))?;
                self.client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| Error::Auth(e.to_string()))?;
            }
            Err(e) => return Err(Error::Auth(e.to_string())),
        }

        info!("Signed in.");
        Ok(())
    }

    /// Persist the session so the next run skips the login.
    pub fn close(&self) -> Result<()> {
        self.client.session().save_to_file(&self.session_file)?;
        debug!("Session saved to {}", self.session_file.display());
        Ok(())
    }

    async fn packed(&self, chat: ChatId) -> Result<PackedChat> {
        self.chats
            .lock()
            .await
            .get(&chat.0)
            .cloned()
            .ok_or_else(|| Error::External(format!("unknown chat {}", chat.0)))
    }

    fn map_err(e: InvocationError) -> Error {
        if let InvocationError::Rpc(rpc) = &e {
            if let Some(wait) = flood_wait(&rpc.name, rpc.value) {
                return Error::RateLimited { wait };
            }
        }
        Error::External(format!("telegram error: {e}"))
    }
}

/// Wait requested by an RPC error, if it is one of the "slow down" errors.
///
/// grammers splits `FLOOD_WAIT_30` into the name `FLOOD_WAIT` and the value `30`.
fn flood_wait(name: &str, value: Option<u32>) -> Option<Duration> {
    match name {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" | "SLOWMODE_WAIT" => {
            Some(Duration::from_secs(u64::from(value.unwrap_or(0))))
        }
        _ => None,
    }
}

#[async_trait]
impl ChatBackend for TelegramBackend {
    async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        let mut groups = Vec::new();
        let mut chats = self.chats.lock().await;
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(Self::map_err)? {
            let chat = dialog.chat();
            if !matches!(chat, Chat::Group(_)) {
                continue;
            }
            chats.insert(chat.id(), chat.pack());
            groups.push(GroupInfo {
                chat_id: ChatId(chat.id()),
                name: chat.name().to_string(),
            });
        }
        Ok(groups)
    }

    async fn own_message_ids(&self, chat: ChatId, limit: usize) -> Result<Vec<MessageId>> {
        let packed = self.packed(chat).await?;
        let mut ids = Vec::new();
        let mut messages = self
            .client
            .search_messages(packed)
            .sent_by_self()
            .limit(limit);
        while let Some(message) = messages.next().await.map_err(Self::map_err)? {
            ids.push(MessageId(message.id()));
        }
        Ok(ids)
    }

    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId]) -> Result<usize> {
        let packed = self.packed(chat).await?;
        let raw: Vec<i32> = ids.iter().map(|id| id.0).collect();
        self.client
            .delete_messages(packed, &raw)
            .await
            .map_err(Self::map_err)
    }
}
