//! Core domain models and persistence for the policy workflows.
//!
//! Provides strongly-typed domain primitives, the record-store abstraction
//! with its PostgreSQL and in-memory implementations, and error handling
//! shared by both the insurance and identity-verification flows. All other
//! crates depend on these foundational types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod seed;
pub mod storage;
pub mod store;
pub mod time;

pub use error::{CoreError, Result};
pub use models::{
    AvailableGood, AvailableGoodId, AvailablePolicy, AvailablePolicyId, Customer, CustomerId,
    InspectionRef, Policy, PolicyGood, PolicyId, PolicyStatus, User, UserId,
};
pub use store::{memory::MemoryStore, PgStore, RecordStore};
pub use time::{Clock, RealClock, TestClock};
