//! Response models for the admin API
//!
//! This module defines the DTOs serialized into HTTP response bodies.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, IndexResponse, InvalidateResponse, StatsResponse};
