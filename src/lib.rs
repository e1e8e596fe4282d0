//! PlayConnect progress core.
//!
//! Library crate backing the gamification layer of the PlayConnect sports
//! social platform: per-(user, sport) stat counters with XP and derived
//! levels, derived progress snapshots, idempotent badge issuance, and a
//! failed-login throttle. Request handlers call [`ProgressTracker`] after
//! every state-changing action; everything durable lives in SQLite.

pub mod auth;
pub mod progress;
pub mod storage;

// Re-export commonly used types
pub use auth::LoginThrottle;
pub use progress::{BadgeEngine, BadgeKind, ProgressContext, ProgressError, ProgressTracker};
pub use storage::{AppConfig, Database, DatabaseError, ProgressConfig, SocialStore, StatStore};
