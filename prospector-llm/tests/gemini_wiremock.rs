mod common;

use prospector_common::{Coordinates, GroundingLink};
use prospector_llm::gemini::GeminiFetcher;
use prospector_llm::traits::{BusinessFetcher, FetchError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn fetcher_for(server: &MockServer) -> GeminiFetcher {
    GeminiFetcher::new(
        "test-key".to_string(),
        "gemini-2.5-flash".to_string(),
        &format!("{}/v1beta", server.uri()),
    )
    .expect("fetcher builds")
    .with_timeout(Duration::from_secs(5))
    .with_retries(0)
}

#[tokio::test]
async fn sends_location_hint_and_returns_cited_text() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "tools": [{ "googleMaps": {} }],
            "toolConfig": { "retrievalConfig": { "latLng": { "latitude": 40.0, "longitude": -74.0 } } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Joe's Pizza: 555-0100, 7 Carmine St" }] },
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        { "maps": { "uri": "https://maps.google.com/?cid=1", "title": "Joe's Pizza" } }
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher_for(&server)
        .fetch("pizza", Some(Coordinates::new(40.0, -74.0)))
        .await
        .expect("fetch succeeds");

    assert_eq!(result.text, "Joe's Pizza: 555-0100, 7 Carmine St");
    assert_eq!(
        result.links,
        vec![GroundingLink::new(
            "Joe's Pizza",
            "https://maps.google.com/?cid=1"
        )]
    );
}

#[tokio::test]
async fn omits_tool_config_without_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            let status = if body.get("toolConfig").is_none() { 200 } else { 418 };
            ResponseTemplate::new(status).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher_for(&server).fetch("bakeries", None).await;
    assert_eq!(result.map(|r| r.text), Ok("ok".to_string()));
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limit_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher_for(&server)
        .fetch("dentists", None)
        .await
        .expect_err("429 is an error");
    assert_eq!(err, FetchError::RateLimit);
    assert_eq!(err.user_message().as_deref(), Some("Rate limit exceeded"));
}

#[tokio::test]
async fn invalid_key_message_maps_to_invalid_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let err = fetcher_for(&server)
        .fetch("florists", None)
        .await
        .expect_err("bad key is an error");
    assert_eq!(err, FetchError::InvalidApiKey);
}

#[tokio::test]
async fn no_candidates_is_empty_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = fetcher_for(&server)
        .fetch("anything", None)
        .await
        .expect_err("empty response is an error");
    assert_eq!(err, FetchError::Empty);
}
