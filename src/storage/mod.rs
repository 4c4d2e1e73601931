//! Typed views over the datastore collections the relay owns.

pub mod activity_log;
pub mod retry_ledger;
pub mod subscribers;

pub use activity_log::ActivityLog;
pub use retry_ledger::RetryLedger;
pub use subscribers::SubscriberStore;
