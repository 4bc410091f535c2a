//! Wire types shared by the woosell API and its clients.
//!
//! This crate provides:
//! - The response envelope every endpoint answers with (`ApiResponse`)
//! - Machine-readable error codes (`ErrorCode`)
//! - Money helpers that convert between minor units and decimal strings

mod errors;
pub mod money;
mod responses;

pub use errors::ErrorCode;
pub use money::MoneyError;
pub use responses::{ApiResponse, ErrorBody, ResponseMetadata};
