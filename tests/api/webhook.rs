use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{any, body_json, body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, WEBHOOK_PASSWORD, WEBHOOK_USERNAME};

fn customer_json() -> serde_json::Value {
    serde_json::json!({
        "email": "a@b.com",
        "first_name": "A",
        "last_name": "B",
        "phone": "+1",
        "card_number": "42",
    })
}

async fn mount_customer_lookup(test_app: &TestApp) {
    Mock::given(method("POST"))
        .and(path("/v1/customers/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(customer_json()))
        .mount(&test_app.crm_server)
        .await;
}

async fn mount_retry_ledger(test_app: &TestApp, expected: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/collections/retry/records"))
        .and(body_partial_json(expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "r1", "serial": "ABC123-99", "event": "online", "retry_count": 0
        })))
        .expect(1)
        .mount(&test_app.datastore_server)
        .await;
}

#[tokio::test]
async fn webhook_relays_the_customer_and_returns_200() {
    let test_app = TestApp::spawn_app().await;
    let body = HashMap::from([("serial", "ABC123-99"), ("event", "online")]);

    Mock::given(method("POST"))
        .and(path("/v1/customers/lookup"))
        .and(body_json(serde_json::json!({ "number": "ABC123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(customer_json()))
        .expect(1)
        .mount(&test_app.crm_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/subscribers"))
        .and(body_json(serde_json::json!({
            "email": "a@b.com",
            "name": "A B",
            "status": "enabled",
            "lists": [test_app.config.mailing_list.list_id],
            "attribs": { "phone": "+1", "card_number": "42" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "id": 7, "email": "a@b.com", "attribs": { "phone": "+1", "card_number": "42" } }
        })))
        .expect(1)
        .mount(&test_app.mailing_list_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collections/subscribers/records"))
        .and(body_json(serde_json::json!({
            "uid": 7, "email": "a@b.com", "phone": "+1", "bonus_status": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "s7", "uid": 7, "email": "a@b.com", "phone": "+1", "bonus_status": false
        })))
        .expect(1)
        .mount(&test_app.datastore_server)
        .await;
    Mock::given(path("/api/collections/retry/records"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.datastore_server)
        .await;
    test_app.mount_activity_log().await;

    let response = test_app.post_webhook(body).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn webhook_returns_400_when_a_field_is_missing() {
    let test_app = TestApp::spawn_app().await;
    let test_cases: Vec<(HashMap<&str, &str>, &str)> = vec![
        (HashMap::from([]), "missing body parameters"),
        (HashMap::from([("serial", "ABC123")]), "missing event parameter"),
        (HashMap::from([("event", "online")]), "missing serial parameter"),
        (
            HashMap::from([("serial", "  "), ("event", "online")]),
            "blank serial parameter",
        ),
        (
            HashMap::from([("serial", "-99"), ("event", "online")]),
            "serial empty after truncation",
        ),
    ];

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.crm_server)
        .await;

    for (body, error_message) in test_cases {
        let response = test_app.post_webhook(body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
}

#[tokio::test]
async fn webhook_rejects_invalid_credentials_before_reading_the_body() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.crm_server)
        .await;

    let response = test_app
        .post_webhook_as(HashMap::from([]), "webhook", "wrong-password")
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="webhook""#,
        response.headers()["WWW-Authenticate"]
    );
}

#[tokio::test]
async fn webhook_without_credentials_is_unauthorized() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", test_app.address))
        .form(&HashMap::from([("serial", "ABC123"), ("event", "online")]))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn non_form_body_without_credentials_is_unauthorized() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", test_app.address))
        .json(&serde_json::json!({ "serial": "ABC123", "event": "online" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn authenticated_non_form_body_is_a_bad_request() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.crm_server)
        .await;

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", test_app.address))
        .basic_auth(WEBHOOK_USERNAME, Some(WEBHOOK_PASSWORD))
        .json(&serde_json::json!({ "serial": "ABC123", "event": "online" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn crm_timeout_adds_a_retry_entry_and_returns_500() {
    let test_app = TestApp::spawn_app().await;
    let body = HashMap::from([("serial", "ABC123-99"), ("event", "online")]);

    Mock::given(method("POST"))
        .and(path("/v1/customers/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(customer_json())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&test_app.crm_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.mailing_list_server)
        .await;
    mount_retry_ledger(
        &test_app,
        serde_json::json!({ "serial": "ABC123-99", "event": "online", "retry_count": 0 }),
    )
    .await;
    test_app.mount_activity_log().await;

    let response = test_app.post_webhook(body).await;

    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn mailing_list_failure_adds_a_retry_entry_and_returns_500() {
    let test_app = TestApp::spawn_app().await;
    let body = HashMap::from([("serial", "ABC123-99"), ("event", "online")]);

    mount_customer_lookup(&test_app).await;
    Mock::given(method("POST"))
        .and(path("/api/subscribers"))
        .respond_with(ResponseTemplate::new(409).set_body_string("E-mail already exists."))
        .expect(1)
        .mount(&test_app.mailing_list_server)
        .await;
    Mock::given(path("/api/collections/subscribers/records"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.datastore_server)
        .await;
    mount_retry_ledger(
        &test_app,
        serde_json::json!({ "serial": "ABC123-99", "event": "online", "retry_count": 0 }),
    )
    .await;
    test_app.mount_activity_log().await;

    let response = test_app.post_webhook(body).await;

    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn persist_failure_returns_500_without_a_retry_entry() {
    let test_app = TestApp::spawn_app().await;
    let body = HashMap::from([("serial", "ABC123"), ("event", "online")]);

    mount_customer_lookup(&test_app).await;
    Mock::given(method("POST"))
        .and(path("/api/subscribers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "id": 7, "email": "a@b.com", "attribs": { "phone": "+1" } }
        })))
        .mount(&test_app.mailing_list_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collections/subscribers/records"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&test_app.datastore_server)
        .await;
    Mock::given(path("/api/collections/retry/records"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.datastore_server)
        .await;
    test_app.mount_activity_log().await;

    let response = test_app.post_webhook(body).await;

    assert_eq!(500, response.status().as_u16());
}
