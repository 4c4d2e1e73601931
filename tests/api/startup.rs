use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use device_relay::startup::Application;

use crate::helpers::test_configuration;

#[tokio::test]
async fn failed_bind_starts_no_background_job() {
    let crm_server = MockServer::start().await;
    let mailing_list_server = MockServer::start().await;
    let datastore_server = MockServer::start().await;
    let taken = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let mut config = test_configuration(&crm_server, &mailing_list_server, &datastore_server);

    config.application.host = String::from("127.0.0.1");
    config.set_app_port(taken.local_addr().unwrap().port());
    config.jobs.enabled = true;

    for server in [&crm_server, &mailing_list_server, &datastore_server] {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let result = Application::build(config).await;

    assert!(result.is_err());

    // A leaked loop would reach the mocks within its first pass
    tokio::time::sleep(Duration::from_millis(300)).await;
}
