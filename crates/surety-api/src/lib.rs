//! HTTP surface for the surety workflows.
//!
//! Assembles configuration, router, and handlers for both the
//! policy-inspection path and the identity-verification path. Collaborators
//! (record store, inspection client, clock) arrive through [`AppState`];
//! nothing here owns a global.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use server::{create_router, start_server};
pub use state::AppState;
