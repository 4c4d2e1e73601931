use std::collections::HashMap;
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestScanner;

#[tokio::test]
async fn index_serves_the_scanner_page() {
    let test_scanner = TestScanner::spawn_app().await;

    let response = reqwest::get(format!("{}/", test_scanner.address))
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert!(response.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(response.text().await.unwrap().contains("ZXing"));
}

#[tokio::test]
async fn scan_renders_the_item_with_its_stock() {
    let test_scanner = TestScanner::spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("barcode", "4600000000001"))
        .and(header("Token", "development-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Tea",
            "characteristic": "Green",
            "price": 199.5,
            "stock": [{ "storage": "Main", "series": "A1", "count": 12.0 }],
        })))
        .expect(1)
        .mount(&test_scanner.inventory_server)
        .await;

    let response = test_scanner
        .post_scan(HashMap::from([("barcode", "4600000000001")]))
        .await;

    assert_eq!(200, response.status().as_u16());

    let html = response.text().await.unwrap();

    assert!(html.contains("Tea"));
    assert!(html.contains("199.50"));
    assert!(html.contains("<td>12</td>"));
}

#[tokio::test]
async fn scan_of_an_unknown_barcode_renders_the_error_inline() {
    let test_scanner = TestScanner::spawn_app().await;

    Mock::given(any())
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "", "stock": [] })),
        )
        .expect(1)
        .mount(&test_scanner.inventory_server)
        .await;

    let response = test_scanner
        .post_scan(HashMap::from([("barcode", "000")]))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("barcode 000 was not found"));
}

#[tokio::test]
async fn scan_without_a_barcode_returns_400_with_a_json_error() {
    let test_scanner = TestScanner::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_scanner.inventory_server)
        .await;

    for body in [HashMap::from([]), HashMap::from([("barcode", "")])] {
        let response = test_scanner.post_scan(body).await;

        assert_eq!(400, response.status().as_u16());

        let error: serde_json::Value = response.json().await.unwrap();

        assert_eq!(error["error"], "barcode is missing");
    }
}

#[tokio::test]
async fn scanner_answers_cross_origin_preflight() {
    let test_scanner = TestScanner::spawn_app().await;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/scan", test_scanner.address),
        )
        .header("Origin", "https://phone.local")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!("*", response.headers()["Access-Control-Allow-Origin"]);
    assert_eq!(
        "GET, POST, OPTIONS",
        response.headers()["Access-Control-Allow-Methods"]
    );
}

#[tokio::test]
async fn scan_responses_allow_any_origin() {
    let test_scanner = TestScanner::spawn_app().await;

    let response = test_scanner.post_scan(HashMap::from([])).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!("*", response.headers()["Access-Control-Allow-Origin"]);
}
