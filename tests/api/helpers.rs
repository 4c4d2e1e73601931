use reqwest::Response;
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use device_relay::config::{get_configuration, ScannerSettings, Settings};
use device_relay::startup::{Application, ScannerApplication};

pub const WEBHOOK_USERNAME: &str = "webhook";
pub const WEBHOOK_PASSWORD: &str = "webhook-password";

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub crm_server: MockServer,
    pub mailing_list_server: MockServer,
    pub datastore_server: MockServer,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let crm_server = MockServer::start().await;
        let mailing_list_server = MockServer::start().await;
        let datastore_server = MockServer::start().await;
        let config = test_configuration(&crm_server, &mailing_list_server, &datastore_server);

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config,
            crm_server,
            mailing_list_server,
            datastore_server,
        }
    }

    pub async fn post_webhook(&self, body: HashMap<&str, &str>) -> Response {
        self.post_webhook_as(body, WEBHOOK_USERNAME, WEBHOOK_PASSWORD)
            .await
    }

    pub async fn post_webhook_as(
        &self,
        body: HashMap<&str, &str>,
        username: &str,
        password: &str,
    ) -> Response {
        reqwest::Client::new()
            .post(format!("{}/webhook", self.address))
            .basic_auth(username, Some(password))
            .form(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Accepts every activity-log write.
    pub async fn mount_activity_log(&self) {
        Mock::given(method("POST"))
            .and(path("/api/collections/logs/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&self.datastore_server)
            .await;
    }
}

/// Relay settings pointing at the given mocks, on port 0 and with the jobs disabled.
pub fn test_configuration(
    crm_server: &MockServer,
    mailing_list_server: &MockServer,
    datastore_server: &MockServer,
) -> Settings {
    let mut config = get_configuration::<Settings>("relay").expect("Missing configuration file.");

    // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
    // take into account: when port is 0, the OS will search for the first available port
    config.set_app_port(0);
    config.set_crm_base_url(&crm_server.uri());
    config.set_mailing_list_base_url(mailing_list_server.uri());
    config.set_datastore_base_url(datastore_server.uri());
    config.crm.timeout_milliseconds = 200;
    // Loops would race with the mocks of every test
    config.jobs.enabled = false;

    config
}

pub struct TestScanner {
    pub address: String,
    pub inventory_server: MockServer,
}

impl TestScanner {
    pub async fn spawn_app() -> TestScanner {
        let mut config =
            get_configuration::<ScannerSettings>("scanner").expect("Missing configuration file.");
        let inventory_server = MockServer::start().await;

        config.set_app_port(0);
        config.set_inventory_api_url(format!("{}/items", inventory_server.uri()));

        let application = ScannerApplication::build(config)
            .await
            .expect("Failed to build application.");
        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestScanner {
            address,
            inventory_server,
        }
    }

    pub async fn post_scan(&self, body: HashMap<&str, &str>) -> Response {
        reqwest::Client::new()
            .post(format!("{}/scan", self.address))
            .form(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
