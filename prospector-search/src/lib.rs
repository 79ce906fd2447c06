//! Query orchestration for Prospector.
//!
//! * [`state`] holds the status machine: one tagged union and one
//!   transition function.
//! * [`geolocation`] resolves an optional position from a pluggable
//!   [`geolocation::LocationSource`], swallowing every failure.
//! * [`orchestrator`] runs a search cycle: locate, fetch, settle.
pub mod geolocation;
pub mod orchestrator;
pub mod state;

pub use geolocation::{acquire_location, GeoError, LocationSource};
pub use orchestrator::{
    SearchCompletion, SearchOrchestrator, SearchRequest, SearchTicket, FALLBACK_ERROR_MESSAGE,
};
pub use state::{SearchEvent, SearchState, SearchStatus};
