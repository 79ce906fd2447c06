use async_trait::async_trait;
use prospector_common::{BusinessResult, Coordinates};

/// Why a fetch did not produce a [`BusinessResult`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Free-form failure with a message meant for the user.
    #[error("{0}")]
    Message(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API access forbidden")]
    Forbidden,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse Gemini response: {0}")]
    Decode(String),

    #[error("Content blocked by Gemini safety filters")]
    Blocked,

    #[error("No candidates returned from Gemini")]
    Empty,

    /// The fetch failed without anything worth showing.
    #[error("fetch failed")]
    Unspecified,
}

impl FetchError {
    /// Text to show the user, if this failure carries any.
    ///
    /// ```
    /// use prospector_llm::traits::FetchError;
    ///
    /// assert_eq!(FetchError::Message("rate limited".into()).user_message().as_deref(), Some("rate limited"));
    /// assert_eq!(FetchError::Message("  ".into()).user_message(), None);
    /// assert_eq!(FetchError::Unspecified.user_message(), None);
    /// ```
    pub fn user_message(&self) -> Option<String> {
        match self {
            FetchError::Unspecified => None,
            FetchError::Message(m) if m.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

/// Anything that turns a business query (plus an optional location hint)
/// into narrative text with grounding citations.
///
/// One call yields at most one response; there is no streaming.
#[async_trait]
pub trait BusinessFetcher: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        coordinates: Option<Coordinates>,
    ) -> Result<BusinessResult, FetchError>;

    /// Model or backend name, for logs and the footer.
    fn model_name(&self) -> &str;
}
