//! Storage module for database and configuration.

pub mod config;
pub mod database;
pub mod schema;
pub mod social_store;
pub mod stat_store;

pub use config::{AppConfig, ConfigError, ProgressConfig, ThrottleSettings};
pub use database::{Database, DatabaseError};
pub use social_store::SocialStore;
pub use stat_store::{StatRecord, StatStore, XpTotal, SPORT_AGNOSTIC};
