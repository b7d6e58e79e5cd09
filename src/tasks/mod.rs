//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Sweeper: Removes expired cache entries at the configured interval

mod cleanup;

pub use cleanup::{spawn_sweeper, SweeperHandle};
