use crate::traits::{BusinessFetcher, FetchError};
use async_trait::async_trait;
use prospector_common::{BusinessResult, Coordinates, GroundingLink, ProspectorError, Result};
use prospector_config::GeminiSettings;
use prospector_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;

const SYSTEM_INSTRUCTION: &str = "You are a lead-generation assistant with access to Google Maps. \
For every business that matches the request, list its name, phone number, full street address \
and website or social profile when available. Use one short paragraph or bullet per business. \
Only report details you found in Maps data; write \"not listed\" for anything missing.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_maps: EmptyObject,
}

#[derive(Debug, Serialize)]
struct EmptyObject {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    retrieval_config: GeminiRetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRetrievalConfig {
    lat_lng: GeminiLatLng,
}

#[derive(Debug, Serialize)]
struct GeminiLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    maps: Option<GeminiChunkSource>,
    web: Option<GeminiChunkSource>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

fn build_request(query: &str, coordinates: Option<Coordinates>) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user"),
            parts: vec![GeminiPart {
                text: format!("Find businesses matching: {query}"),
            }],
        }],
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: SYSTEM_INSTRUCTION.to_string(),
            }],
        },
        tools: vec![GeminiTool {
            google_maps: EmptyObject {},
        }],
        tool_config: coordinates.map(|c| GeminiToolConfig {
            retrieval_config: GeminiRetrievalConfig {
                lat_lng: GeminiLatLng {
                    latitude: c.latitude,
                    longitude: c.longitude,
                },
            },
        }),
    }
}

/// Text from the first candidate plus its grounding citations, in order,
/// de-duplicated by URI.
fn into_business_result(response: GeminiResponse) -> std::result::Result<BusinessResult, FetchError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let blocked = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .is_some();
        return Err(if blocked {
            FetchError::Blocked
        } else {
            FetchError::Empty
        });
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(FetchError::Blocked);
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let links: Vec<GroundingLink> = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.maps.or(chunk.web))
        .filter_map(|source| {
            let uri = source.uri.filter(|u| !u.trim().is_empty())?;
            let title = source
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| uri.clone());
            Some(GroundingLink { title, uri })
        })
        .filter(|link| seen.insert(link.uri.clone()))
        .collect();

    if text.trim().is_empty() && links.is_empty() {
        return Err(FetchError::Empty);
    }

    Ok(BusinessResult { text, links })
}

fn map_http_error(err: HttpError) -> FetchError {
    match err {
        HttpError::Api {
            status, message, ..
        } => match status.as_u16() {
            429 => FetchError::RateLimit,
            401 => FetchError::InvalidApiKey,
            403 => FetchError::Forbidden,
            400 if message.contains("API key not valid") => FetchError::InvalidApiKey,
            code => FetchError::Api {
                status: code,
                message,
            },
        },
        HttpError::Network(m) => FetchError::Network(m),
        HttpError::Timeout(after) => FetchError::Network(format!("request timed out after {after:?}")),
        HttpError::Decode(m, _) => FetchError::Decode(m),
        other @ (HttpError::Url(_) | HttpError::Build(_)) => FetchError::Message(other.to_string()),
    }
}

/// Google Gemini client with Google Maps grounding.
///
/// Requires a valid API key and internet access.
pub struct GeminiFetcher {
    http: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiFetcher {
    /// Create a client against `endpoint` (the versioned API root).
    pub fn new(api_key: String, model: String, endpoint: &str) -> Result<Self> {
        let endpoint = if endpoint.ends_with('/') {
            Cow::Borrowed(endpoint)
        } else {
            Cow::Owned(format!("{endpoint}/"))
        };
        let http = HttpClient::new(&endpoint)
            .map_err(|e| ProspectorError::Setup(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(60));

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    /// Build from config; fails when no API key can be resolved.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self> {
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            ProspectorError::Config(
                "Gemini API key not configured; set gemini.api_key or GEMINI_API_KEY".to_string(),
            )
        })?;
        Ok(Self::new(api_key, settings.model.clone(), &settings.endpoint)?
            .with_timeout(settings.timeout())
            .with_retries(settings.max_retries))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.http = self.http.with_retries(retries);
        self
    }
}

#[async_trait]
impl BusinessFetcher for GeminiFetcher {
    async fn fetch(
        &self,
        query: &str,
        coordinates: Option<Coordinates>,
    ) -> std::result::Result<BusinessResult, FetchError> {
        let path = format!("models/{}:generateContent", self.model);
        let request = build_request(query, coordinates);

        tracing::debug!(
            model = %self.model,
            query_len = query.len(),
            with_location = coordinates.is_some(),
            "gemini.generate.start"
        );

        let response: GeminiResponse = self
            .http
            .post_json_opts(
                &path,
                &request,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(self.api_key.as_str()),
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_http_error)?;

        let tokens_used = response
            .usage_metadata
            .as_ref()
            .and_then(|u| u.total_token_count);
        let result = into_business_result(response)?;
        tracing::debug!(
            model = %self.model,
            tokens_used = ?tokens_used,
            links = result.links.len(),
            "gemini.generate.done"
        );
        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(code: u16) -> HttpError {
        HttpError::Api {
            status: code.try_into().expect("valid status"),
            message: "boom".into(),
            request_id: "-".into(),
        }
    }

    #[test]
    fn request_attaches_lat_lng_only_with_coordinates() {
        let without = serde_json::to_value(build_request("plumbers", None)).unwrap();
        assert_eq!(without["tools"], json!([{ "googleMaps": {} }]));
        assert!(without.get("toolConfig").is_none());
        assert_eq!(
            without["contents"][0]["parts"][0]["text"],
            "Find businesses matching: plumbers"
        );
        assert!(without["systemInstruction"].get("role").is_none());

        let with = serde_json::to_value(build_request(
            "plumbers",
            Some(Coordinates::new(30.25, -97.75)),
        ))
        .unwrap();
        assert_eq!(
            with["toolConfig"],
            json!({ "retrievalConfig": { "latLng": { "latitude": 30.25, "longitude": -97.75 } } })
        );
    }

    #[test]
    fn parses_text_and_deduplicates_citations() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Acme Corp, " }, { "text": "555-1234" }] },
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        { "maps": { "uri": "http://acme.example", "title": "Acme" } },
                        { "web": { "uri": "http://acme.example", "title": "Acme again" } },
                        { "web": { "uri": "http://bolt.example" } },
                        { "maps": { "title": "no uri" } }
                    ]
                }
            }],
            "usageMetadata": { "totalTokenCount": 42 }
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let result = into_business_result(response).unwrap();

        assert_eq!(result.text, "Acme Corp, 555-1234");
        assert_eq!(
            result.links,
            vec![
                GroundingLink::new("Acme", "http://acme.example"),
                GroundingLink::new("http://bolt.example", "http://bolt.example"),
            ]
        );
    }

    #[test]
    fn empty_and_blocked_responses_are_errors() {
        let empty: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(into_business_result(empty), Err(FetchError::Empty));

        let prompt_blocked: GeminiResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert_eq!(into_business_result(prompt_blocked), Err(FetchError::Blocked));

        let safety: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "x" }] }, "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert_eq!(into_business_result(safety), Err(FetchError::Blocked));

        let blank: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        }))
        .unwrap();
        assert_eq!(into_business_result(blank), Err(FetchError::Empty));
    }

    #[test]
    fn http_statuses_map_to_fetch_errors() {
        assert_eq!(map_http_error(status(429)), FetchError::RateLimit);
        assert_eq!(map_http_error(status(401)), FetchError::InvalidApiKey);
        assert_eq!(map_http_error(status(403)), FetchError::Forbidden);
        assert_eq!(
            map_http_error(status(500)),
            FetchError::Api {
                status: 500,
                message: "boom".into()
            }
        );
        assert!(matches!(
            map_http_error(HttpError::Timeout(Duration::from_secs(1))),
            FetchError::Network(_)
        ));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let settings = GeminiSettings {
            api_key: Some("${UNSET_PLACEHOLDER}".into()),
            ..GeminiSettings::default()
        };
        if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("API_KEY").is_ok() {
            return;
        }
        assert!(matches!(
            GeminiFetcher::from_settings(&settings),
            Err(ProspectorError::Config(_))
        ));
    }
}
