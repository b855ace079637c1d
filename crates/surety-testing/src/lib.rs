//! Test fixtures and environment harness for the surety service.
//!
//! Provides builder-style fixtures for domain records and webhook envelopes,
//! plus [`TestEnv`], a fully wired in-process service (in-memory store, test
//! clock, mocked inspection provider) that tests drive through the router.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod fixtures;
pub mod store;

pub use env::TestEnv;
pub use fixtures::{PolicyBuilder, UserBuilder, WebhookEventBuilder};
pub use store::FlakyStore;
