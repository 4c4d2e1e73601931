mod health_check;
mod scanner;
mod webhook;

pub use health_check::health_check;
pub use scanner::{index, preflight, scan, ScanError, ScanTemplates};
pub use webhook::{handle_webhook, WebhookError};
