//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations for mocking persistence
//! - `TestAppStateBuilder` and a webhook harness wired against those mocks

mod app_state_builder;
mod billing_mocks;
mod commerce_mocks;
mod factories;
mod user_mocks;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use commerce_mocks::*;
pub use factories::*;
pub use user_mocks::*;
