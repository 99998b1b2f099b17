//! # API Shared
//!
//! Shared definitions for the media APIs.
//!
//! Contains:
//! - Response DTOs with OpenAPI schemas (`dto` module), converted from `media-core` types
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `media` CLI so both surfaces emit the same JSON shapes.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
