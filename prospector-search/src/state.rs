use prospector_common::BusinessResult;
use serde::Serialize;

/// Coarse phase of a search cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Everything the presentation needs to render a search.
///
/// The payload lives inside the variant, so a result and an error can never
/// be set at the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Idle,
    Loading,
    Success(BusinessResult),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// A query was submitted.
    Submitted,
    /// The fetcher produced a payload.
    Resolved(BusinessResult),
    /// The fetcher failed; carries the message to show.
    Failed(String),
}

impl SearchState {
    pub fn status(&self) -> SearchStatus {
        match self {
            SearchState::Idle => SearchStatus::Idle,
            SearchState::Loading => SearchStatus::Loading,
            SearchState::Success(_) => SearchStatus::Success,
            SearchState::Error(_) => SearchStatus::Error,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SearchState::Loading)
    }

    pub fn result(&self) -> Option<&BusinessResult> {
        match self {
            SearchState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SearchState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Apply `event` in place. Returns `false` (and leaves the state alone)
    /// when the event is not valid from the current state.
    pub fn apply(&mut self, event: SearchEvent) -> bool {
        match transition(self, event) {
            Some(next) => {
                *self = next;
                true
            }
            None => false,
        }
    }
}

/// The next state after `event`, or `None` if the event is invalid here.
///
/// Any state may be re-submitted; only `Loading` accepts an outcome.
///
/// ```
/// use prospector_common::BusinessResult;
/// use prospector_search::state::{transition, SearchEvent, SearchState};
///
/// let loading = transition(&SearchState::Idle, SearchEvent::Submitted).unwrap();
/// assert_eq!(loading, SearchState::Loading);
///
/// let done = transition(&loading, SearchEvent::Resolved(BusinessResult::default())).unwrap();
/// assert!(done.result().is_some());
///
/// assert!(transition(&SearchState::Idle, SearchEvent::Failed("x".into())).is_none());
/// ```
pub fn transition(state: &SearchState, event: SearchEvent) -> Option<SearchState> {
    match (state, event) {
        (_, SearchEvent::Submitted) => Some(SearchState::Loading),
        (SearchState::Loading, SearchEvent::Resolved(result)) => Some(SearchState::Success(result)),
        (SearchState::Loading, SearchEvent::Failed(message)) => Some(SearchState::Error(message)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_common::GroundingLink;

    fn sample() -> BusinessResult {
        BusinessResult {
            text: "Acme Corp, 555-1234".into(),
            links: vec![GroundingLink::new("Acme", "http://acme.example")],
        }
    }

    #[test]
    fn submit_from_every_state_enters_loading() {
        for start in [
            SearchState::Idle,
            SearchState::Loading,
            SearchState::Success(sample()),
            SearchState::Error("nope".into()),
        ] {
            let mut state = start;
            assert!(state.apply(SearchEvent::Submitted));
            assert_eq!(state.status(), SearchStatus::Loading);
            assert!(state.result().is_none());
            assert!(state.error().is_none());
        }
    }

    #[test]
    fn outcomes_only_leave_loading() {
        let mut state = SearchState::Loading;
        assert!(state.apply(SearchEvent::Resolved(sample())));
        assert_eq!(state.result(), Some(&sample()));

        // a second outcome for the same cycle is rejected
        assert!(!state.apply(SearchEvent::Failed("late".into())));
        assert_eq!(state.status(), SearchStatus::Success);

        let mut idle = SearchState::Idle;
        assert!(!idle.apply(SearchEvent::Resolved(sample())));
        assert_eq!(idle, SearchState::Idle);
    }

    #[test]
    fn failure_keeps_message_and_no_result() {
        let mut state = SearchState::Loading;
        assert!(state.apply(SearchEvent::Failed("rate limited".into())));
        assert_eq!(state.error(), Some("rate limited"));
        assert!(state.result().is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SearchStatus::Success).unwrap(),
            "\"success\""
        );
    }
}
