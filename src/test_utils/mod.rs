//! Test utilities shared by the unit tests.
//!
//! This module provides:
//! - Test data factories for creating valid entities
//! - A scriptable in-memory payment provider
//! - A store wrapper that counts writes
//! - An AppState builder for route tests

mod app_state_builder;
mod factories;
mod provider_mocks;
mod store_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use provider_mocks::*;
pub use store_mocks::*;
