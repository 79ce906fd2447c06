//! A small mailbox actor runtime.
//!
//! Each actor owns its state and processes one message at a time from a
//! bounded channel; an [`system::ActorSystem`] tracks the spawned tasks and
//! fans a single cancellation signal out to all of them.
pub mod actor;
pub mod system;
