//! Core use-case services.
//!
//! # Responsibility
//! - Expose the external entry points (`can_edit`, accessible listings).
//! - Pair sharing-graph writes with cache invalidation.
//! - Keep callers decoupled from SQLite transaction details.

pub mod access_service;
pub mod sharing_service;
