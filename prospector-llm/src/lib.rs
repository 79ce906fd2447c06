//! Result fetchers for Prospector.
//!
//! This crate exposes the [`traits::BusinessFetcher`] interface the search
//! orchestrator depends on, and a Gemini implementation that grounds its
//! answers in Google Maps. [`ensure_fetcher_ready`] builds a shared client
//! from [`prospector_config::GeminiSettings`].
//!
//! # Examples
//! ```no_run
//! use prospector_common::Result;
//! use prospector_config::GeminiSettings;
//! use prospector_llm::ensure_fetcher_ready;
//!
//! # async fn demo() -> Result<()> {
//! let settings = GeminiSettings {
//!     api_key: Some("AIza...".into()),
//!     ..GeminiSettings::default()
//! };
//! let fetcher = ensure_fetcher_ready(&settings)?;
//! let result = fetcher.fetch("coffee roasters", None).await;
//! assert!(result.is_ok() || result.is_err());
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod traits;

use gemini::GeminiFetcher;
use prospector_config::GeminiSettings;
use std::sync::Arc;
use traits::BusinessFetcher;

/// Build the configured fetcher behind a shared trait object.
pub fn ensure_fetcher_ready(
    settings: &GeminiSettings,
) -> prospector_common::Result<Arc<dyn BusinessFetcher>> {
    let fetcher = GeminiFetcher::from_settings(settings)?;
    tracing::info!(model = %settings.model, endpoint = %settings.endpoint, "fetcher.ready");
    Ok(Arc::new(fetcher))
}
