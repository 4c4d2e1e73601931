//! Reconciliation of the datastore subscribers with the mailing-list membership.
//!
//! Each cycle reads the full membership of the configured list and the full
//! `subscribers` collection, then creates the missing records and patches the
//! contact fields that drifted. Records are matched by the mailing-list id
//! (`uid`) and the bonus flag is never written here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::client_error::ClientError;
use crate::domain::subscriber_record::{ContactUpdate, NewSubscriberRecord, SubscriberRecord};
use crate::mailing_list_client::{ListSubscriber, MailingListClient};
use crate::storage::SubscriberStore;

const MAILING_LIST_PAGE_SIZE: u32 = 1000;

/// Wakes the sync loop for one extra pass.
#[derive(Clone, Default)]
pub struct SyncTrigger(Arc<Notify>);

impl SyncTrigger {
    pub fn new() -> SyncTrigger {
        SyncTrigger::default()
    }

    /// Requests a pass without waiting for it. Requests made while a pass runs collapse into one.
    pub fn request(&self) {
        self.0.notify_one();
    }

    async fn requested(&self) {
        self.0.notified().await;
    }
}

#[derive(Clone)]
pub struct SubscriberSync {
    mailing_list: MailingListClient,
    subscribers: SubscriberStore,
    list_id: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("list id {0} is not a valid identifier")]
    InvalidListId(i64),
    #[error("failed to fetch mailing-list subscribers: {0}")]
    FetchMailingList(#[source] ClientError),
    #[error("failed to fetch datastore subscribers: {0}")]
    FetchDatastore(#[source] ClientError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct SyncPlan {
    pub creates: Vec<NewSubscriberRecord>,
    pub updates: Vec<(String, ContactUpdate)>,
}

/// Works out the writes that bring `existing` in line with `members`.
///
/// When an id shows up twice in `members`, the later occurrence wins.
pub fn plan_sync(existing: Vec<SubscriberRecord>, members: Vec<ListSubscriber>) -> SyncPlan {
    let existing: HashMap<i64, SubscriberRecord> = existing
        .into_iter()
        .map(|record| (record.uid, record))
        .collect();
    let members: BTreeMap<i64, ListSubscriber> = members
        .into_iter()
        .map(|member| (member.id, member))
        .collect();
    let mut plan = SyncPlan::default();

    for (uid, member) in members {
        let phone = member.phone();

        match existing.get(&uid) {
            Some(record) if record.contact_differs(&member.email, &phone) => {
                plan.updates.push((
                    record.id.clone(),
                    ContactUpdate {
                        email: member.email,
                        phone,
                    },
                ));
            }
            Some(_) => {}
            None => plan
                .creates
                .push(NewSubscriberRecord::new(uid, member.email, phone)),
        }
    }

    plan
}

impl SubscriberSync {
    pub fn new(
        mailing_list: MailingListClient,
        subscribers: SubscriberStore,
        list_id: i64,
    ) -> SubscriberSync {
        SubscriberSync {
            mailing_list,
            subscribers,
            list_id,
        }
    }

    #[tracing::instrument(name = "Reconcile subscribers", skip(self), fields(list_id = self.list_id))]
    pub async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        if self.list_id <= 0 {
            return Err(SyncError::InvalidListId(self.list_id));
        }

        let members = self
            .mailing_list
            .list_members(self.list_id, MAILING_LIST_PAGE_SIZE)
            .await
            .map_err(SyncError::FetchMailingList)?;
        let existing = self
            .subscribers
            .list_all()
            .await
            .map_err(SyncError::FetchDatastore)?;
        let plan = plan_sync(existing, members);
        let mut report = SyncReport::default();

        for record in plan.creates {
            match self.subscribers.create(&record).await {
                Ok(created) => {
                    report.created += 1;
                    tracing::info!(
                        "Saved new subscriber: uid={}, email={}, phone={}",
                        created.uid,
                        created.email,
                        created.phone
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!("Failed to save subscriber uid={}: {:?}", record.uid, err);
                }
            }
        }

        for (id, contact) in plan.updates {
            match self.subscribers.update_contact(&id, &contact).await {
                Ok(updated) => {
                    report.updated += 1;
                    tracing::info!(
                        "Updated subscriber: uid={}, email={}, phone={}",
                        updated.uid,
                        updated.email,
                        updated.phone
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!("Failed to update subscriber {}: {:?}", id, err);
                }
            }
        }

        Ok(report)
    }
}

/// A failed page fetch waits `cooldown`. Every other outcome waits `interval`.
pub fn pause_after(
    outcome: &Result<SyncReport, SyncError>,
    interval: Duration,
    cooldown: Duration,
) -> Duration {
    match outcome {
        Err(SyncError::FetchMailingList(_)) | Err(SyncError::FetchDatastore(_)) => cooldown,
        Ok(_) | Err(SyncError::InvalidListId(_)) => interval,
    }
}

/// Runs a cycle right away, then after every `interval`, after every trigger, or after
/// `cooldown` when a fetch failed. Stops on `shutdown`.
pub async fn run_sync_loop(
    sync: SubscriberSync,
    trigger: SyncTrigger,
    interval: Duration,
    cooldown: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let outcome = sync.run_cycle().await;

        match &outcome {
            Ok(report) => tracing::info!(
                "Subscriber sync finished: created={}, updated={}, failed={}",
                report.created,
                report.updated,
                report.failed
            ),
            Err(err @ SyncError::InvalidListId(_)) => {
                tracing::error!("Subscriber sync aborted: {}", err)
            }
            Err(err) => tracing::error!("Subscriber sync aborted, cooling down: {:?}", err),
        }

        let pause = pause_after(&outcome, interval, cooldown);

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown signal received, stopping subscriber sync");
                break;
            }
            _ = tokio::time::sleep(pause) => {}
            _ = trigger.requested() => {
                tracing::debug!("Subscriber sync requested");
            }
        }
    }
}
