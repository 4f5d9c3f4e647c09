use std::future::Future;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{domain::GroupRecord, errors::Error, ports::ChatBackend, Result};

/// Build one [`GroupRecord`] per group visible to the account.
///
/// Groups are fetched one at a time. Flood waits are slept through (up to
/// `max_rate_limit_retries` per call); any other backend error aborts the whole
/// build. Message order within a group is whatever the backend returned.
pub async fn build_inventory(
    backend: &dyn ChatBackend,
    message_limit: usize,
    max_rate_limit_retries: u32,
) -> Result<Vec<GroupRecord>> {
    info!("Fetching dialogs...");
    let groups = retry_rate_limited(max_rate_limit_retries, || backend.list_groups()).await?;
    info!("Fetched {} groups in total", groups.len());

    let total = groups.len();
    let mut records = Vec::with_capacity(total);
    for (idx, group) in groups.into_iter().enumerate() {
        info!("Fetching messages [{}/{}] {}", idx + 1, total, group.name);
        let chat = group.chat_id;
        let ids = retry_rate_limited(max_rate_limit_retries, || {
            backend.own_message_ids(chat, message_limit)
        })
        .await?;
        records.push(GroupRecord::new(group.chat_id, group.name, ids));
    }

    info!("Fetched messages from all groups.");
    Ok(records)
}

/// Re-run a read until it stops being rate limited.
async fn retry_rate_limited<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut waits = 0u32;
    loop {
        let err = match op().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let Some(wait) = err.rate_limit_wait() else {
            return Err(err);
        };
        if waits >= max_retries {
            return Err(Error::RateLimitExhausted { attempts: waits });
        }
        waits += 1;
        warn!(
            "Rate limited. Waiting {} seconds before retrying.",
            wait.as_secs()
        );
        sleep(wait).await;
    }
}
