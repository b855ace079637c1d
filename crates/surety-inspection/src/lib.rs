//! Client for the goods/people inspection provider.
//!
//! Owns the whole vendor surface: the HTTP client that creates inspections,
//! attaches goods, issues image-upload tokens, and retrieves verdicts, plus
//! the signed webhook envelope the provider delivers when an inspection
//! completes. Nothing outside this crate talks to the provider directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod webhook;

pub use client::{ClientConfig, InspectionClient};
pub use error::{InspectionError, Result};
pub use webhook::{construct_event, WebhookEvent};
