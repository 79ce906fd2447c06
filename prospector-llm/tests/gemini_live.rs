mod common;

use prospector_llm::gemini::GeminiFetcher;
use prospector_llm::traits::BusinessFetcher;

fn make_fetcher_or_skip() -> Option<GeminiFetcher> {
    let Ok(key) = std::env::var("GEMINI_API_KEY") else {
        tracing::debug!("Skipping: GEMINI_API_KEY not set");
        return None;
    };
    let model = std::env::var("PROSPECTOR_GEMINI_MODEL")
        .unwrap_or_else(|_| prospector_config::DEFAULT_GEMINI_MODEL.to_string());
    Some(
        GeminiFetcher::new(key, model, prospector_config::DEFAULT_GEMINI_ENDPOINT)
            .expect("fetcher builds"),
    )
}

#[tokio::test]
#[ignore]
async fn gemini_maps_grounding_smoketest() {
    common::init_test_tracing();
    let Some(fetcher) = make_fetcher_or_skip() else {
        return;
    };

    let result = fetcher
        .fetch(
            "coffee shops near Union Square, San Francisco",
            Some(prospector_common::Coordinates::new(37.7880, -122.4075)),
        )
        .await
        .expect("live fetch succeeds");

    tracing::debug!(links = result.links.len(), "live result");
    assert!(!result.text.trim().is_empty());
}
