use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    config::{DEFAULT_MAX_RATE_LIMIT_RETRIES, MAX_BATCH_SIZE},
    domain::{ChatId, DeletionReport, GroupRecord, MessageId},
    errors::Error,
    ports::ChatBackend,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteMode {
    /// Log what would be deleted, never call the backend.
    DryRun,
    Live,
}

#[derive(Clone, Copy, Debug)]
pub struct DeleterConfig {
    pub batch_size: usize,
    pub max_rate_limit_retries: u32,
}

impl Default for DeleterConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }
}

/// Lifecycle of one delete request.
///
/// `Pending -> Sent -> Done` on the happy path; `Sent -> RateLimited -> Sent`
/// while the backend asks us to wait; `Sent -> Failed` is terminal.
#[derive(Debug)]
enum BatchState {
    Pending,
    Sent,
    RateLimited(Duration),
    Failed(Error),
    Done(usize),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BatchOutcome {
    deleted: usize,
    rate_limit_waits: u32,
}

/// Deletes the account's messages from selected groups, batch by batch.
pub struct Deleter<'a> {
    backend: &'a dyn ChatBackend,
    cfg: DeleterConfig,
    mode: DeleteMode,
}

impl<'a> Deleter<'a> {
    pub fn new(backend: &'a dyn ChatBackend, cfg: DeleterConfig, mode: DeleteMode) -> Self {
        let batch_size = cfg.batch_size.clamp(1, MAX_BATCH_SIZE);
        Self {
            backend,
            cfg: DeleterConfig { batch_size, ..cfg },
            mode,
        }
    }

    /// Delete every message recorded for `group`.
    ///
    /// Batches go out strictly in order. A non rate-limit error stops the group
    /// immediately and is returned; batches already done stay deleted.
    pub async fn clean_group(&self, group: &GroupRecord) -> Result<DeletionReport> {
        let count = group.message_count();
        let mut report = DeletionReport {
            name: group.name().to_string(),
            requested: count,
            dry_run: self.mode == DeleteMode::DryRun,
            ..Default::default()
        };

        info!("Deleting {count} messages from {}...", group.name());
        if self.mode == DeleteMode::DryRun {
            info!("Dry-run: Would delete {count} messages from {}.", group.name());
            return Ok(report);
        }

        for batch in group.message_ids().chunks(self.cfg.batch_size) {
            let outcome = match self.delete_batch(group.chat_id(), batch).await {
                Ok(o) => o,
                Err(e) => {
                    warn!(
                        "Stopped after deleting {} of {count} messages from {}",
                        report.deleted,
                        group.name()
                    );
                    return Err(e);
                }
            };
            report.batches += 1;
            report.deleted += outcome.deleted;
            report.rate_limit_waits += outcome.rate_limit_waits;
            debug!(
                "Batch {} for {}: {} deleted",
                report.batches,
                group.name(),
                outcome.deleted
            );
        }

        info!("Deleted {} messages from {}.", report.deleted, group.name());
        Ok(report)
    }

    async fn delete_batch(&self, chat: ChatId, batch: &[MessageId]) -> Result<BatchOutcome> {
        let mut waits = 0u32;
        let mut state = BatchState::Pending;
        loop {
            state = match state {
                BatchState::Pending => BatchState::Sent,
                BatchState::Sent => match self.backend.delete_messages(chat, batch).await {
                    Ok(n) => BatchState::Done(n),
                    Err(e) => match e.rate_limit_wait() {
                        Some(wait) => BatchState::RateLimited(wait),
                        None => BatchState::Failed(e),
                    },
                },
                BatchState::RateLimited(wait) => {
                    if waits >= self.cfg.max_rate_limit_retries {
                        return Err(Error::RateLimitExhausted { attempts: waits });
                    }
                    waits += 1;
                    warn!(
                        "Rate limited. Waiting {} seconds before retrying.",
                        wait.as_secs()
                    );
                    sleep(wait).await;
                    BatchState::Sent
                }
                BatchState::Done(deleted) => {
                    return Ok(BatchOutcome {
                        deleted,
                        rate_limit_waits: waits,
                    })
                }
                BatchState::Failed(e) => return Err(e),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupInfo;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Records every delete call; scripted failures are consumed front to back.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<(ChatId, Vec<MessageId>)>>,
        call_times: Mutex<Vec<Instant>>,
        script: Mutex<VecDeque<Option<Error>>>,
    }

    impl FakeBackend {
        fn scripted(script: Vec<Option<Error>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(ChatId, Vec<MessageId>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
            Ok(Vec::new())
        }

        async fn own_message_ids(&self, _chat: ChatId, _limit: usize) -> Result<Vec<MessageId>> {
            Ok(Vec::new())
        }

        async fn delete_messages(&self, chat: ChatId, ids: &[MessageId]) -> Result<usize> {
            self.calls.lock().unwrap().push((chat, ids.to_vec()));
            self.call_times.lock().unwrap().push(Instant::now());
            if let Some(Some(e)) = self.script.lock().unwrap().pop_front() {
                return Err(e);
            }
            Ok(ids.len())
        }
    }

    fn group(n: usize) -> GroupRecord {
        GroupRecord::new(ChatId(7), "Group", (1..=n as i32).map(MessageId).collect())
    }

    fn rate_limited(secs: u64) -> Option<Error> {
        Some(Error::RateLimited {
            wait: Duration::from_secs(secs),
        })
    }

    #[tokio::test]
    async fn partitions_into_batches_of_at_most_100() {
        let backend = FakeBackend::default();
        let deleter = Deleter::new(&backend, DeleterConfig::default(), DeleteMode::Live);

        let g = group(250);
        let report = deleter.clean_group(&g).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls.iter().map(|(_, ids)| ids.len()).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
        let flattened: Vec<MessageId> = calls.into_iter().flat_map(|(_, ids)| ids).collect();
        assert_eq!(flattened, g.message_ids());
        assert_eq!(report.deleted, 250);
        assert_eq!(report.batches, 3);
    }

    #[tokio::test]
    async fn exact_multiple_of_batch_size_has_no_empty_batch() {
        let backend = FakeBackend::default();
        let deleter = Deleter::new(&backend, DeleterConfig::default(), DeleteMode::Live);

        deleter.clean_group(&group(200)).await.unwrap();
        deleter.clean_group(&group(0)).await.unwrap();

        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn dry_run_never_calls_backend() {
        let backend = FakeBackend::default();
        let deleter = Deleter::new(&backend, DeleterConfig::default(), DeleteMode::DryRun);

        let report = deleter.clean_group(&group(1000)).await.unwrap();

        assert!(backend.calls().is_empty());
        assert!(report.dry_run);
        assert_eq!(report.requested, 1000);
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_batch_is_retried_after_wait() {
        let backend = FakeBackend::scripted(vec![None, rate_limited(30)]);
        let deleter = Deleter::new(&backend, DeleterConfig::default(), DeleteMode::Live);

        let g = group(150);
        let report = deleter.clean_group(&g).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        // The second batch is reissued unchanged.
        assert_eq!(calls[1].1, calls[2].1);
        assert_eq!(calls[2].1.len(), 50);

        let times = backend.call_times.lock().unwrap().clone();
        assert!(times[2] - times[1] >= Duration::from_secs(30));

        assert_eq!(report.deleted, 150);
        assert_eq!(report.batches, 2);
        assert_eq!(report.rate_limit_waits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let backend = FakeBackend::scripted(vec![rate_limited(1), rate_limited(1), rate_limited(1)]);
        let cfg = DeleterConfig {
            batch_size: 100,
            max_rate_limit_retries: 2,
        };
        let deleter = Deleter::new(&backend, cfg, DeleteMode::Live);

        let err = deleter.clean_group(&group(10)).await.unwrap_err();

        assert!(matches!(err, Error::RateLimitExhausted { attempts: 2 }));
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn other_errors_stop_the_group() {
        let backend = FakeBackend::scripted(vec![
            None,
            Some(Error::External("CHAT_ADMIN_REQUIRED".to_string())),
        ]);
        let deleter = Deleter::new(&backend, DeleterConfig::default(), DeleteMode::Live);

        let err = deleter.clean_group(&group(350)).await.unwrap_err();

        assert!(matches!(err, Error::External(_)));
        // Third and fourth batches are skipped.
        assert_eq!(backend.calls().len(), 2);
    }

    #[test]
    fn oversized_batch_size_is_clamped() {
        let backend = FakeBackend::default();
        let cfg = DeleterConfig {
            batch_size: 500,
            max_rate_limit_retries: 1,
        };
        let deleter = Deleter::new(&backend, cfg, DeleteMode::Live);
        assert_eq!(deleter.cfg.batch_size, MAX_BATCH_SIZE);
    }
}
