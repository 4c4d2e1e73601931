use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client_error::ClientError;
use crate::domain::device_serial::DeviceSerial;
use crate::domain::retry_entry::{RetryEntry, RetryKind};
use crate::relay::Relay;
use crate::storage::{ActivityLog, RetryLedger};

/// Replays failed device events from the retry ledger.
#[derive(Clone)]
pub struct RetryProcessor {
    relay: Relay,
    ledger: RetryLedger,
    activity: ActivityLog,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome {
    Dropped,
    Replayed,
    Failed,
    Aged,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub dropped: usize,
    pub replayed: usize,
    pub failed: usize,
    pub aged: usize,
}

impl RetryReport {
    fn count(&mut self, outcome: RetryOutcome) {
        match outcome {
            RetryOutcome::Dropped => self.dropped += 1,
            RetryOutcome::Replayed => self.replayed += 1,
            RetryOutcome::Failed => self.failed += 1,
            RetryOutcome::Aged => self.aged += 1,
        }
    }
}

impl RetryProcessor {
    pub fn new(relay: Relay, ledger: RetryLedger, activity: ActivityLog) -> RetryProcessor {
        RetryProcessor {
            relay,
            ledger,
            activity,
        }
    }

    /// One pass over every pending entry.
    #[tracing::instrument(name = "Process pending retries", skip(self))]
    pub async fn process_pending(&self) -> Result<RetryReport, ClientError> {
        let entries = self.ledger.pending().await?;
        let mut report = RetryReport::default();

        for entry in entries {
            match self.process(&entry).await {
                Ok(outcome) => report.count(outcome),
                Err(err) => {
                    tracing::error!("Failed to update retry entry {}: {:?}", entry.id, err);
                    report.count(RetryOutcome::Failed);
                }
            }
        }

        Ok(report)
    }

    async fn process(&self, entry: &RetryEntry) -> Result<RetryOutcome, ClientError> {
        if entry.is_exhausted() {
            self.ledger.remove(entry).await?;
            tracing::warn!(
                "Dropped retry entry {} for serial {} after {} attempts",
                entry.id,
                entry.serial,
                entry.retry_count
            );
            return Ok(RetryOutcome::Dropped);
        }

        if entry.kind() == RetryKind::BonusCheck {
            // The bonus producer re-checks unflagged subscribers on its own
            let attempt = entry.next_attempt(entry.error_message.clone());
            self.ledger.record_attempt(entry, &attempt).await?;
            return Ok(RetryOutcome::Aged);
        }

        let serial = match DeviceSerial::parse(&entry.serial) {
            Ok(serial) => serial,
            Err(err) => {
                let attempt = entry.next_attempt(err);
                self.ledger.record_attempt(entry, &attempt).await?;
                return Ok(RetryOutcome::Failed);
            }
        };

        match self.relay.relay(&serial).await {
            Ok(subscriber) => {
                self.activity
                    .record(
                        "Retry succeeded",
                        format!("serial={}, uid={}", serial, subscriber.uid),
                    )
                    .await;
                self.ledger.remove(entry).await?;
                Ok(RetryOutcome::Replayed)
            }
            Err(err) => {
                tracing::warn!("Retry of serial {} failed: {:?}", serial, err);
                let attempt = entry.next_attempt(err.detail());
                self.ledger.record_attempt(entry, &attempt).await?;
                Ok(RetryOutcome::Failed)
            }
        }
    }
}

pub async fn run_retry_loop(
    processor: RetryProcessor,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        match processor.process_pending().await {
            Ok(report) if report != RetryReport::default() => tracing::info!(
                "Retry pass finished: replayed={}, failed={}, aged={}, dropped={}",
                report.replayed,
                report.failed,
                report.aged,
                report.dropped
            ),
            Ok(_) => {}
            Err(err) => tracing::error!("Failed to fetch the retry ledger: {:?}", err),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown signal received, stopping retry processor");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
