use crate::geolocation::{acquire_location, LocationSource};
use crate::state::{SearchEvent, SearchState, SearchStatus};
use prospector_common::BusinessResult;
use prospector_config::DEFAULT_LOCATION_TIMEOUT_MS;
use prospector_llm::traits::{BusinessFetcher, FetchError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shown when a fetch fails without a usable message.
pub const FALLBACK_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Please check your API key and try again.";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub use_location: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, use_location: bool) -> Self {
        Self {
            query: query.into(),
            use_location,
        }
    }
}

/// Identifies one submit. Only the newest ticket may settle the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The outcome of a detached search task, ready to hand to
/// [`SearchOrchestrator::complete`].
#[derive(Debug, Clone)]
pub struct SearchCompletion {
    pub ticket: SearchTicket,
    pub outcome: Result<BusinessResult, FetchError>,
}

/// Locate (if asked), then fetch. Location problems never fail the search.
pub async fn run_search(
    fetcher: &dyn BusinessFetcher,
    locator: &dyn LocationSource,
    location_timeout: Duration,
    request: &SearchRequest,
) -> Result<BusinessResult, FetchError> {
    let coordinates = acquire_location(locator, request.use_location, location_timeout).await;
    tracing::info!(
        query_len = request.query.len(),
        use_location = request.use_location,
        with_coordinates = coordinates.is_some(),
        model = fetcher.model_name(),
        "search.fetch"
    );
    fetcher.fetch(&request.query, coordinates).await
}

/// Owns the search state and drives one cycle per submit.
///
/// Hosts with their own event loop call [`begin`](Self::begin), spawn
/// [`search_task`](Self::search_task), and feed the result to
/// [`complete`](Self::complete). Everyone else awaits [`submit`](Self::submit).
pub struct SearchOrchestrator {
    fetcher: Arc<dyn BusinessFetcher>,
    locator: Arc<dyn LocationSource>,
    location_timeout: Duration,
    state: SearchState,
    generation: u64,
}

impl SearchOrchestrator {
    pub fn new(fetcher: Arc<dyn BusinessFetcher>, locator: Arc<dyn LocationSource>) -> Self {
        Self {
            fetcher,
            locator,
            location_timeout: Duration::from_millis(DEFAULT_LOCATION_TIMEOUT_MS),
            state: SearchState::Idle,
            generation: 0,
        }
    }

    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn status(&self) -> SearchStatus {
        self.state.status()
    }

    pub fn model_name(&self) -> &str {
        self.fetcher.model_name()
    }

    /// Enter `Loading` and issue a ticket that supersedes any earlier one.
    pub fn begin(&mut self) -> SearchTicket {
        if self.state.is_loading() {
            tracing::debug!(superseded = self.generation, "search.restart");
        }
        self.generation += 1;
        self.state.apply(SearchEvent::Submitted);
        tracing::debug!(generation = self.generation, "search.begin");
        SearchTicket {
            generation: self.generation,
        }
    }

    /// The locate-and-fetch half of a cycle, detached from `self` so it can
    /// be spawned.
    pub fn search_task(
        &self,
        ticket: SearchTicket,
        request: SearchRequest,
    ) -> impl Future<Output = SearchCompletion> + Send + 'static {
        let fetcher = Arc::clone(&self.fetcher);
        let locator = Arc::clone(&self.locator);
        let timeout = self.location_timeout;
        async move {
            let outcome = run_search(fetcher.as_ref(), locator.as_ref(), timeout, &request).await;
            SearchCompletion { ticket, outcome }
        }
    }

    /// Settle the cycle. Returns `false` if the completion belongs to a
    /// superseded ticket and was dropped.
    pub fn complete(&mut self, completion: SearchCompletion) -> bool {
        if completion.ticket.generation != self.generation {
            tracing::debug!(
                stale = completion.ticket.generation,
                current = self.generation,
                "search.stale_completion"
            );
            return false;
        }

        let event = match completion.outcome {
            Ok(result) => {
                tracing::info!(links = result.links.len(), "search.success");
                SearchEvent::Resolved(result)
            }
            Err(err) => {
                tracing::warn!(error = %err, "search.error");
                SearchEvent::Failed(
                    err.user_message()
                        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
                )
            }
        };
        self.state.apply(event)
    }

    /// A whole cycle in one call.
    pub async fn submit(&mut self, query: &str, use_location: bool) -> &SearchState {
        let ticket = self.begin();
        let completion = self
            .search_task(ticket, SearchRequest::new(query, use_location))
            .await;
        self.complete(completion);
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geolocation::Unavailable;
    use async_trait::async_trait;
    use prospector_common::Coordinates;

    struct Echo;

    #[async_trait]
    impl BusinessFetcher for Echo {
        async fn fetch(
            &self,
            query: &str,
            _coordinates: Option<Coordinates>,
        ) -> Result<BusinessResult, FetchError> {
            Ok(BusinessResult {
                text: query.to_string(),
                links: vec![],
            })
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn orchestrator() -> SearchOrchestrator {
        SearchOrchestrator::new(Arc::new(Echo), Arc::new(Unavailable))
    }

    #[tokio::test]
    async fn superseded_ticket_cannot_settle() {
        let mut orch = orchestrator();
        let first = orch.begin();
        let second = orch.begin();
        assert_ne!(first, second);

        let stale = orch.search_task(first, SearchRequest::new("old", false)).await;
        assert!(!orch.complete(stale));
        assert_eq!(orch.status(), SearchStatus::Loading);

        let fresh = orch.search_task(second, SearchRequest::new("new", false)).await;
        assert!(orch.complete(fresh));
        assert_eq!(orch.state().result().map(|r| r.text.as_str()), Some("new"));
    }

    #[tokio::test]
    async fn completing_twice_is_a_no_op() {
        let mut orch = orchestrator();
        let ticket = orch.begin();
        let done = orch.search_task(ticket, SearchRequest::new("q", false)).await;
        assert!(orch.complete(done.clone()));
        assert!(!orch.complete(SearchCompletion {
            ticket,
            outcome: Err(FetchError::Unspecified),
        }));
        assert_eq!(orch.status(), SearchStatus::Success);
    }
}
