//! Paginated API client tests against a wiremock server
//!
//! Covers pagination termination (declared total reached), early stop on an
//! empty page, unpaginated responses, token refresh on 401, containment of
//! transport failures mid-pagination, and fatal authentication failure.

use serde_json::json;
use wellstage_common::StageError;
use wellstage_pipeline::config::ApiConfig;
use wellstage_pipeline::extract::ApiClient;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        api_key: "anon-key".to_string(),
        email: "ops@example.com".to_string(),
        password: "secret".to_string(),
        page_size: 1000,
    }
}

fn rows(range: std::ops::Range<usize>) -> Vec<serde_json::Value> {
    range.map(|i| json!({ "id": i })).collect()
}

async fn mount_auth(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bearer-token",
            "expires_in": 3600,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetches_all_pages_until_declared_total() {
    let server = MockServer::start().await;
    mount_auth(&server, 1).await;

    for (range_header, body_range, content_range) in [
        ("0-999", 0..1000, "0-999/2500"),
        ("1000-1999", 1000..2000, "1000-1999/2500"),
        ("2000-2999", 2000..2500, "2000-2499/2500"),
    ] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/completiondaily"))
            .and(header("Range", range_header))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", content_range)
                    .set_body_json(rows(body_range)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    let outcome = client.fetch_collection("completiondaily").await.unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.records.len(), 2500);
}

#[tokio::test]
async fn empty_page_terminates_before_declared_total() {
    let server = MockServer::start().await;
    mount_auth(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/notes"))
        .and(header("Range", "0-999"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-999/2500")
                .set_body_json(rows(0..1000)),
        )
        .expect(1)
        .mount(&server)
        .await;

    // total claims 2500 but the source has shrunk; next page is empty
    Mock::given(method("GET"))
        .and(path("/rest/v1/notes"))
        .and(header("Range", "1000-1999"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "*/2500")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    let outcome = client.fetch_collection("notes").await.unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.records.len(), 1000);
}

#[tokio::test]
async fn missing_total_header_means_single_response() {
    let server = MockServer::start().await;
    mount_auth(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(0..70)))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    let outcome = client.fetch_collection("users").await.unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.records.len(), 70);
}

#[tokio::test]
async fn rejected_token_is_refreshed_once() {
    let server = MockServer::start().await;
    // one auth for the first page attempt, one for the refresh
    mount_auth(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/jobs"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(0..5)))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    let outcome = client.fetch_collection("jobs").await.unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.records.len(), 5);
}

#[tokio::test]
async fn mid_pagination_failure_keeps_partial_result() {
    let server = MockServer::start().await;
    mount_auth(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/surveypoints"))
        .and(header("Range", "0-999"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-999/2500")
                .set_body_json(rows(0..1000)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/surveypoints"))
        .and(header("Range", "1000-1999"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    let outcome = client.fetch_collection("surveypoints").await.unwrap();

    assert!(!outcome.complete);
    assert_eq!(outcome.records.len(), 1000);
}

#[tokio::test]
async fn failed_credential_exchange_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(api_config(&server)).unwrap();
    match client.fetch_collection("anything").await {
        Err(StageError::Authentication(_)) => {},
        other => panic!("expected authentication error, got {:?}", other),
    }
}
