//! Long-running background loops of the relay service.

pub mod bonus_check;
pub mod retry_processor;
pub mod subscriber_sync;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::JobSettings;
use bonus_check::{spawn_bonus_pool, BonusCheck};
use retry_processor::{run_retry_loop, RetryProcessor};
use subscriber_sync::{run_sync_loop, SubscriberSync};

pub use subscriber_sync::SyncTrigger;

/// Owns the handles of every spawned loop and the token that stops them.
pub struct BackgroundJobs {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundJobs {
    pub fn spawn(
        config: &JobSettings,
        sync: SubscriberSync,
        trigger: SyncTrigger,
        retries: RetryProcessor,
        bonus: BonusCheck,
    ) -> BackgroundJobs {
        let shutdown = CancellationToken::new();
        let mut handles = vec![
            tokio::spawn(run_sync_loop(
                sync,
                trigger,
                config.get_sync_interval(),
                config.get_sync_cooldown(),
                shutdown.clone(),
            )),
            tokio::spawn(run_retry_loop(
                retries,
                config.get_retry_interval(),
                shutdown.clone(),
            )),
        ];

        handles.extend(spawn_bonus_pool(
            bonus,
            config.bonus_workers,
            config.bonus_queue_capacity,
            config.get_bonus_check_interval(),
            shutdown.clone(),
        ));

        tracing::info!("Started {} background tasks", handles.len());

        BackgroundJobs { shutdown, handles }
    }

    /// Cancels every loop and waits for all of them to return.
    pub async fn shutdown(self) {
        self.shutdown.cancel();

        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!("Background task failed: {:?}", err);
            }
        }

        tracing::info!("Background tasks stopped");
    }
}
