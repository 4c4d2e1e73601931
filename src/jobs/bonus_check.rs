//! Awards the loyalty bonus once a subscriber confirms the configured list.
//!
//! A producer re-scans the `subscribers` collection every cycle and feeds the
//! unflagged subscribers into a bounded queue consumed by a fixed pool of
//! workers. A cycle only ends once every job it queued has been handled, so a
//! subscriber is never checked by two workers at the same time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client_error::ClientError;
use crate::crm_client::CrmClient;
use crate::domain::retry_entry::{BONUS_EVENT, CHECK_SUBSCRIPTION_EVENT};
use crate::domain::subscriber_record::SubscriberRecord;
use crate::mailing_list_client::MailingListClient;
use crate::storage::{RetryLedger, SubscriberStore};

#[derive(Clone)]
pub struct BonusCheck {
    mailing_list: MailingListClient,
    crm: CrmClient,
    subscribers: SubscriberStore,
    ledger: RetryLedger,
    list_id: i64,
    amount: f64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BonusOutcome {
    Awarded,
    AlreadyAwarded,
    NotConfirmed,
}

#[derive(thiserror::Error, Debug)]
pub enum BonusError {
    #[error("failed to check the subscription: {0}")]
    CheckSubscription(#[source] ClientError),
    #[error("failed to award the bonus: {0}")]
    Award(#[source] ClientError),
    #[error("bonus was awarded but the subscriber was not flagged: {0}")]
    MarkAwarded(#[source] ClientError),
}

/// A queued subscriber. Dropping it tells the producer the job is done.
struct BonusJob {
    subscriber: SubscriberRecord,
    _cycle: mpsc::Sender<()>,
}

/// Unflagged subscribers, each `uid` at most once.
pub fn pending_bonus(subscribers: Vec<SubscriberRecord>) -> Vec<SubscriberRecord> {
    let mut queued = HashSet::new();

    subscribers
        .into_iter()
        .filter(|subscriber| !subscriber.bonus_status && queued.insert(subscriber.uid))
        .collect()
}

impl BonusCheck {
    pub fn new(
        mailing_list: MailingListClient,
        crm: CrmClient,
        subscribers: SubscriberStore,
        ledger: RetryLedger,
        list_id: i64,
        amount: f64,
    ) -> BonusCheck {
        BonusCheck {
            mailing_list,
            crm,
            subscribers,
            ledger,
            list_id,
            amount,
        }
    }

    #[tracing::instrument(
        name = "Check a subscriber for the bonus",
        skip(self, subscriber),
        fields(uid = subscriber.uid)
    )]
    pub async fn check(&self, subscriber: &SubscriberRecord) -> Result<BonusOutcome, BonusError> {
        if subscriber.bonus_status {
            return Ok(BonusOutcome::AlreadyAwarded);
        }

        let list_subscriber = self
            .mailing_list
            .get_subscriber(subscriber.uid)
            .await
            .map_err(BonusError::CheckSubscription)?;

        if !list_subscriber.is_confirmed_in(self.list_id) {
            return Ok(BonusOutcome::NotConfirmed);
        }

        self.crm
            .award_bonus(&subscriber.phone, self.amount)
            .await
            .map_err(BonusError::Award)?;
        self.subscribers
            .mark_bonus_awarded(&subscriber.id)
            .await
            .map_err(BonusError::MarkAwarded)?;

        tracing::info!("Awarded bonus to subscriber uid={}", subscriber.uid);

        Ok(BonusOutcome::Awarded)
    }

    /// Checks one subscriber and routes lookup and award failures to the retry ledger.
    pub async fn handle(&self, subscriber: &SubscriberRecord) {
        let err = match self.check(subscriber).await {
            Ok(_) => return,
            Err(err) => err,
        };
        let event = match &err {
            BonusError::CheckSubscription(_) => CHECK_SUBSCRIPTION_EVENT,
            BonusError::Award(_) => BONUS_EVENT,
            BonusError::MarkAwarded(_) => {
                tracing::error!("Subscriber uid={}: {:?}", subscriber.uid, err);
                return;
            }
        };

        tracing::error!("Subscriber uid={}: {:?}", subscriber.uid, err);
        self.ledger
            .try_record_failure(&subscriber.uid.to_string(), event, err.to_string())
            .await;
    }
}

/// Spawns the producer and `workers` consumers. All of them stop on `shutdown`.
pub fn spawn_bonus_pool(
    check: BonusCheck,
    workers: usize,
    queue_capacity: usize,
    interval: Duration,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
    let receiver = Arc::new(Mutex::new(receiver));
    let mut handles: Vec<JoinHandle<()>> = (0..workers.max(1))
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                check.clone(),
                receiver.clone(),
                shutdown.clone(),
            ))
        })
        .collect();

    handles.push(tokio::spawn(run_producer(
        check.subscribers.clone(),
        sender,
        interval,
        shutdown,
    )));

    handles
}

async fn run_producer(
    subscribers: SubscriberStore,
    queue: mpsc::Sender<BonusJob>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        match subscribers.list_all().await {
            Ok(all) => {
                if !enqueue_cycle(pending_bonus(all), &queue, &shutdown).await {
                    break;
                }
            }
            Err(err) => tracing::error!("Failed to fetch subscribers for the bonus check: {:?}", err),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Shutdown signal received, stopping bonus producer");
}

/// Queues one cycle and waits until the workers handled all of it. Returns false on shutdown.
async fn enqueue_cycle(
    pending: Vec<SubscriberRecord>,
    queue: &mpsc::Sender<BonusJob>,
    shutdown: &CancellationToken,
) -> bool {
    let (cycle, mut cycle_done) = mpsc::channel::<()>(1);

    tracing::info!("Queueing {} subscribers for the bonus check", pending.len());

    for subscriber in pending {
        let job = BonusJob {
            subscriber,
            _cycle: cycle.clone(),
        };

        tokio::select! {
            _ = shutdown.cancelled() => return false,
            sent = queue.send(job) => {
                if sent.is_err() {
                    return false;
                }
            }
        }
    }
    drop(cycle);

    // Resolves once every job, and with it every sender clone, was dropped
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = cycle_done.recv() => true,
    }
}

async fn run_worker(
    worker_id: usize,
    check: BonusCheck,
    queue: Arc<Mutex<mpsc::Receiver<BonusJob>>>,
    shutdown: CancellationToken,
) {
    loop {
        let job = {
            let mut queue = queue.lock().await;

            // Shutdown wins over jobs still waiting in the queue
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                job = queue.recv() => job,
            }
        };

        match job {
            Some(job) => check.handle(&job.subscriber).await,
            None => break,
        }
    }

    tracing::debug!("Bonus worker {} stopped", worker_id);
}
