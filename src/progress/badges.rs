//! Badge rules and idempotent badge issuance.
//!
//! Badge definitions are a fixed compile-time set: each is a named, pure
//! predicate over a [`ProgressContext`]. The engine awards whichever badges
//! newly hold and never awards the same badge twice.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::context::{ContextBuilder, ProgressContext};
use super::ProgressError;
use crate::storage::database::{Database, DatabaseError};

/// The fixed set of badges, in deterministic award-evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    /// Played at least one game
    FirstMatch,
    /// Played at least ten games
    ActivePlayer,
    /// Hosted at least five games
    Strategist,
    /// At least ten accepted friends
    Socializer,
    /// Holds a verified coach registry entry
    CoachVerified,
    /// Logged in seven consecutive days
    WeeklyStreak,
    /// Ranks in the top decile by total XP
    TopPlayer,
}

impl BadgeKind {
    /// All badges in evaluation order.
    pub const ALL: [BadgeKind; 7] = [
        BadgeKind::FirstMatch,
        BadgeKind::ActivePlayer,
        BadgeKind::Strategist,
        BadgeKind::Socializer,
        BadgeKind::CoachVerified,
        BadgeKind::WeeklyStreak,
        BadgeKind::TopPlayer,
    ];

    /// The badge's ledger name.
    pub fn name(&self) -> &'static str {
        match self {
            BadgeKind::FirstMatch => "First Match",
            BadgeKind::ActivePlayer => "Active Player",
            BadgeKind::Strategist => "Strategist",
            BadgeKind::Socializer => "Socializer",
            BadgeKind::CoachVerified => "Coach Verified",
            BadgeKind::WeeklyStreak => "Weekly Streak",
            BadgeKind::TopPlayer => "Top Player",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "First Match" => Some(BadgeKind::FirstMatch),
            "Active Player" => Some(BadgeKind::ActivePlayer),
            "Strategist" => Some(BadgeKind::Strategist),
            "Socializer" => Some(BadgeKind::Socializer),
            "Coach Verified" => Some(BadgeKind::CoachVerified),
            "Weekly Streak" => Some(BadgeKind::WeeklyStreak),
            "Top Player" => Some(BadgeKind::TopPlayer),
            _ => None,
        }
    }

    /// Whether the badge's criterion holds for the given context.
    pub fn criteria_met(&self, context: &ProgressContext) -> bool {
        match self {
            BadgeKind::FirstMatch => context.total_games_played >= 1,
            BadgeKind::ActivePlayer => context.total_games_played >= 10,
            BadgeKind::Strategist => context.total_games_hosted >= 5,
            BadgeKind::Socializer => context.friend_count >= 10,
            BadgeKind::CoachVerified => context.is_verified_coach,
            BadgeKind::WeeklyStreak => context.login_streak >= 7,
            BadgeKind::TopPlayer => context.is_top_player,
        }
    }
}

/// A badge award ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAward {
    pub id: i64,
    pub user_id: i64,
    pub badge_name: String,
    pub earned_on: DateTime<Utc>,
    pub seen: bool,
}

/// Badge engine: evaluates the rule set and maintains the award ledger.
#[derive(Clone)]
pub struct BadgeEngine {
    db: Arc<Database>,
    contexts: ContextBuilder,
}

impl BadgeEngine {
    /// Create a new badge engine.
    pub fn new(db: Arc<Database>, contexts: ContextBuilder) -> Self {
        Self { db, contexts }
    }

    /// Evaluate every badge the user does not yet hold and award those whose
    /// criteria are met. Builds a fresh context when none is supplied.
    /// Returns the newly awarded badges. Idempotent for a fixed context.
    ///
    /// A failed insert for one badge is logged and skipped; the remaining
    /// badges are still evaluated.
    pub fn ensure_badges(
        &self,
        user_id: i64,
        context: Option<&ProgressContext>,
    ) -> Result<Vec<BadgeKind>, ProgressError> {
        let built;
        let context = match context {
            Some(c) => c,
            None => {
                built = self.contexts.build(user_id)?;
                &built
            }
        };

        let earned = self.earned_names(user_id)?;
        let mut newly_awarded = Vec::new();

        for badge in BadgeKind::ALL {
            if earned.iter().any(|name| name == badge.name()) {
                continue;
            }

            if !badge.criteria_met(context) {
                continue;
            }

            match self.insert_award(user_id, badge) {
                Ok(()) => {
                    tracing::debug!(user_id, badge = badge.name(), "badge awarded");
                    newly_awarded.push(badge);
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        badge = badge.name(),
                        error = %e,
                        "failed to award badge, skipping"
                    );
                }
            }
        }

        Ok(newly_awarded)
    }

    /// Get all badges earned by a user, most recent first.
    pub fn earned_badges(&self, user_id: i64) -> Result<Vec<BadgeAward>, ProgressError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, badge_name, earned_on, seen FROM user_badges
                 WHERE user_id = ?1 ORDER BY earned_on DESC, id DESC",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut awards = Vec::new();
        for row in rows {
            let (id, user_id, badge_name, earned_str, seen) =
                row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

            awards.push(BadgeAward {
                id,
                user_id,
                badge_name,
                earned_on: DateTime::parse_from_rfc3339(&earned_str)
                    .map_err(|e| {
                        DatabaseError::DeserializationError(format!("Invalid date: {}", e))
                    })?
                    .with_timezone(&Utc),
                seen: seen != 0,
            });
        }

        Ok(awards)
    }

    /// Mark all of a user's badges as seen. Returns the number updated.
    /// The seen flag is the only mutation an award ever receives.
    pub fn mark_badges_seen(&self, user_id: i64) -> Result<usize, ProgressError> {
        let conn = self.db.connection();
        let updated = conn
            .execute(
                "UPDATE user_badges SET seen = 1 WHERE user_id = ?1 AND seen = 0",
                params![user_id],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(updated)
    }

    fn earned_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare("SELECT badge_name FROM user_badges WHERE user_id = ?1")
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?);
        }

        Ok(names)
    }

    fn insert_award(&self, user_id: i64, badge: BadgeKind) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO user_badges (user_id, badge_name, earned_on, seen)
             VALUES (?1, ?2, ?3, 0)",
            params![user_id, badge.name(), Utc::now().to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}
