pub mod authentication;
pub mod client_error;
pub mod config;
pub mod crm_client;
pub mod datastore_client;
pub mod domain;
pub mod inventory_client;
pub mod jobs;
pub mod mailing_list_client;
pub mod relay;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod telemetry;
