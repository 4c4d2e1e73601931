use actix_web::dev::Server;
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, App, HttpServer};
use std::io;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{ScannerSettings, Settings, WebhookSettings};
use crate::crm_client::CrmClient;
use crate::datastore_client::DatastoreClient;
use crate::inventory_client::InventoryClient;
use crate::jobs::bonus_check::BonusCheck;
use crate::jobs::retry_processor::RetryProcessor;
use crate::jobs::subscriber_sync::SubscriberSync;
use crate::jobs::{BackgroundJobs, SyncTrigger};
use crate::mailing_list_client::MailingListClient;
use crate::relay::Relay;
use crate::routes::{handle_webhook, health_check, index, preflight, scan, ScanTemplates};
use crate::storage::{ActivityLog, RetryLedger, SubscriberStore};

pub struct Application {
    port: u16,
    server: Server,
    jobs: Option<BackgroundJobs>,
}

/// Shared handles of the webhook routes.
struct WebhookState {
    settings: WebhookSettings,
    relay: Relay,
    ledger: RetryLedger,
    activity: ActivityLog,
    trigger: SyncTrigger,
}

fn startup_error<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::Other, err)
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, io::Error> {
        let crm = CrmClient::new(
            config.crm.lookup_url.clone(),
            config.crm.bonus_url.clone(),
            config.crm.api_key.clone(),
            Some(config.crm.get_timeout()),
        )
        .map_err(startup_error)?;
        let mailing_list = MailingListClient::new(
            config.mailing_list.base_url.clone(),
            config.mailing_list.username.clone(),
            config.mailing_list.api_key.clone(),
            Some(config.mailing_list.get_timeout()),
            Some(config.mailing_list.get_bulk_timeout()),
        )
        .map_err(startup_error)?;
        let datastore = DatastoreClient::new(
            config.datastore.base_url.clone(),
            config.datastore.admin_token.clone(),
            Some(config.datastore.get_timeout()),
            Some(config.datastore.get_bulk_timeout()),
        )
        .map_err(startup_error)?;

        let subscribers = SubscriberStore::new(datastore.clone());
        let ledger = RetryLedger::new(datastore.clone());
        let activity = ActivityLog::new(datastore);
        let list_id = config.mailing_list.list_id;
        let relay = Relay::new(
            crm.clone(),
            mailing_list.clone(),
            subscribers.clone(),
            list_id,
        );
        let trigger = SyncTrigger::new();

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let state = WebhookState {
            settings: config.webhook,
            relay: relay.clone(),
            ledger: ledger.clone(),
            activity: activity.clone(),
            trigger: trigger.clone(),
        };
        let server = run(listener, state)?;

        // Jobs start only once the listener is bound
        let jobs = if config.jobs.enabled {
            Some(BackgroundJobs::spawn(
                &config.jobs,
                SubscriberSync::new(mailing_list.clone(), subscribers.clone(), list_id),
                trigger,
                RetryProcessor::new(relay, ledger.clone(), activity),
                BonusCheck::new(
                    mailing_list,
                    crm,
                    subscribers,
                    ledger,
                    list_id,
                    config.bonus.amount,
                ),
            ))
        } else {
            tracing::info!("Background jobs are disabled");
            None
        };

        tracing::info!("Webhook relay listening on port {}", port);

        Ok(Self { port, server, jobs })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Serves until actix stops on a signal, then stops the background jobs.
    pub async fn run_until_stop(self) -> Result<(), io::Error> {
        let result = self.server.await;

        if let Some(jobs) = self.jobs {
            jobs.shutdown().await;
        }

        result
    }
}

fn run(listener: TcpListener, state: WebhookState) -> Result<Server, io::Error> {
    let settings = web::Data::new(state.settings);
    let relay = web::Data::new(state.relay);
    let ledger = web::Data::new(state.ledger);
    let activity = web::Data::new(state.activity);
    let trigger = web::Data::new(state.trigger);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/webhook", web::post().to(handle_webhook))
            .app_data(settings.clone())
            .app_data(relay.clone())
            .app_data(ledger.clone())
            .app_data(activity.clone())
            .app_data(trigger.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub struct ScannerApplication {
    port: u16,
    server: Server,
}

impl ScannerApplication {
    pub async fn build(config: ScannerSettings) -> Result<Self, io::Error> {
        let inventory = InventoryClient::new(
            config.inventory.api_url.clone(),
            config.inventory.token.clone(),
            config.inventory.auth.clone(),
            Some(config.inventory.get_timeout()),
        )
        .map_err(startup_error)?;
        let templates = ScanTemplates::new().map_err(startup_error)?;

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run_scanner(listener, inventory, templates)?;

        tracing::info!("Barcode scanner listening on port {}", port);

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), io::Error> {
        self.server.await
    }
}

fn run_scanner(
    listener: TcpListener,
    inventory: InventoryClient,
    templates: ScanTemplates,
) -> Result<Server, io::Error> {
    let inventory = web::Data::new(inventory);
    let templates = web::Data::new(templates);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
                    .add(("Access-Control-Allow-Headers", "Content-Type")),
            )
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/", web::get().to(index))
            .route("/", web::method(Method::OPTIONS).to(preflight))
            .route("/scan", web::post().to(scan))
            .route("/scan", web::method(Method::OPTIONS).to(preflight))
            .app_data(inventory.clone())
            .app_data(templates.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
