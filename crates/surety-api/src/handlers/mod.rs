//! HTTP request handlers.
//!
//! One module per workflow area: policy initiation and goods, the provider
//! webhook, the read-only catalog, the identity flow, and health.

pub mod catalog;
pub mod health;
pub mod identity;
pub mod policy;
pub mod webhook;

pub use catalog::{list_available_goods, list_available_policies};
pub use health::health_check;
pub use identity::{index, register, verification_callback};
pub use policy::{add_goods, finish_inspection, generate_image_token, initiate_policy};
pub use webhook::receive_webhook;
