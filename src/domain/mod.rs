pub mod device_event;
pub mod device_serial;
pub mod inventory_item;
pub mod log_entry;
pub mod retry_entry;
pub mod subscriber_email;
pub mod subscriber_record;
pub mod subscription_status;
