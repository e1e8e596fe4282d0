//! Progress and gamification engine.
//!
//! Aggregates a user's activity into a derived snapshot, unlocks badges
//! idempotently from it, and orchestrates both behind a single entry point.

pub mod badges;
pub mod context;
pub mod tracker;

pub use badges::{BadgeAward, BadgeEngine, BadgeKind};
pub use context::{ContextBuilder, ProgressContext, STREAK_WINDOW_DAYS};
pub use tracker::ProgressTracker;

use crate::storage::DatabaseError;

/// Progress engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
