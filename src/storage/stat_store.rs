//! Per-(user, sport) stat counter storage.
//!
//! The upsert here is the one non-trivial write in the store: a single atomic
//! statement so that two concurrent deltas for the same row never lose an
//! update. Everything else is dumb reads.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::database::{Database, DatabaseError};

/// Sentinel sport id for sport-agnostic progress (friends, bio).
pub const SPORT_AGNOSTIC: i64 = 0;

/// A per-(user, sport) stat counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub user_id: i64,
    pub sport_id: i64,
    pub games_played: i64,
    pub games_hosted: i64,
    pub xp: i64,
    pub level: i64,
}

/// Per-user summed XP, for ranking.
#[derive(Debug, Clone)]
pub struct XpTotal {
    pub user_id: i64,
    pub total_xp: i64,
}

/// Accessor for the user_stats table.
#[derive(Clone)]
pub struct StatStore {
    db: Arc<Database>,
    xp_per_level: i64,
}

impl StatStore {
    /// Create a new stat store. `xp_per_level` must be at least 1.
    pub fn new(db: Arc<Database>, xp_per_level: i64) -> Self {
        Self { db, xp_per_level }
    }

    /// Apply a signed delta to the (user, sport) counter row.
    ///
    /// All-zero deltas perform no read or write and return `None`, so a no-op
    /// call never creates a row. Otherwise the row is upserted in a single
    /// statement: fields are created as `max(delta, 0)` or become
    /// `max(existing + delta, 0)`, and the level is recomputed from the new
    /// XP in the same statement.
    pub fn apply_delta(
        &self,
        user_id: i64,
        sport_id: i64,
        games_played_delta: i64,
        games_hosted_delta: i64,
        xp_delta: i64,
    ) -> Result<Option<StatRecord>, DatabaseError> {
        if games_played_delta == 0 && games_hosted_delta == 0 && xp_delta == 0 {
            return Ok(None);
        }

        let conn = self.db.connection();
        let record = conn
            .query_row(
                "INSERT INTO user_stats (user_id, sport_id, games_played, games_hosted, xp, level)
                 VALUES (?1, ?2, MAX(?3, 0), MAX(?4, 0), MAX(?5, 0), MAX(?5, 0) / ?6)
                 ON CONFLICT(user_id, sport_id) DO UPDATE SET
                     games_played = MAX(games_played + ?3, 0),
                     games_hosted = MAX(games_hosted + ?4, 0),
                     xp = MAX(xp + ?5, 0),
                     level = MAX(xp + ?5, 0) / ?6
                 RETURNING user_id, sport_id, games_played, games_hosted, xp, level",
                params![
                    user_id,
                    sport_id,
                    games_played_delta,
                    games_hosted_delta,
                    xp_delta,
                    self.xp_per_level,
                ],
                |row| {
                    Ok(StatRecord {
                        user_id: row.get(0)?,
                        sport_id: row.get(1)?,
                        games_played: row.get(2)?,
                        games_hosted: row.get(3)?,
                        xp: row.get(4)?,
                        level: row.get(5)?,
                    })
                },
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(Some(record))
    }

    /// Get all stat rows for a user.
    pub fn stats_for_user(&self, user_id: i64) -> Result<Vec<StatRecord>, DatabaseError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, sport_id, games_played, games_hosted, xp, level
                 FROM user_stats WHERE user_id = ?1 ORDER BY sport_id",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(StatRecord {
                    user_id: row.get(0)?,
                    sport_id: row.get(1)?,
                    games_played: row.get(2)?,
                    games_hosted: row.get(3)?,
                    xp: row.get(4)?,
                    level: row.get(5)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?);
        }

        Ok(records)
    }

    /// Get summed XP per user, for users with nonzero XP. Ranking over the
    /// result happens in application code.
    pub fn xp_totals(&self) -> Result<Vec<XpTotal>, DatabaseError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, SUM(xp) AS total_xp FROM user_stats
                 GROUP BY user_id HAVING SUM(xp) > 0",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(XpTotal {
                    user_id: row.get(0)?,
                    total_xp: row.get(1)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut totals = Vec::new();
        for row in rows {
            totals.push(row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?);
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StatStore {
        let db = Arc::new(Database::open_in_memory().expect("Failed to create database"));
        StatStore::new(db, 100)
    }

    #[test]
    fn test_all_zero_deltas_create_no_row() {
        let store = store();

        let result = store.apply_delta(1, 2, 0, 0, 0).unwrap();
        assert!(result.is_none());
        assert!(store.stats_for_user(1).unwrap().is_empty());
    }

    #[test]
    fn test_first_delta_creates_row_with_floor() {
        let store = store();

        // Negative deltas on a fresh row clamp to zero
        let record = store.apply_delta(1, 2, -3, 1, -50).unwrap().unwrap();
        assert_eq!(record.games_played, 0);
        assert_eq!(record.games_hosted, 1);
        assert_eq!(record.xp, 0);
        assert_eq!(record.level, 0);
    }

    #[test]
    fn test_deltas_accumulate_and_clamp() {
        let store = store();

        store.apply_delta(1, 2, 1, 0, 25).unwrap();
        store.apply_delta(1, 2, 1, 0, 25).unwrap();
        let record = store.apply_delta(1, 2, -5, 0, -200).unwrap().unwrap();

        // Sequence sums negative, fields never go below zero
        assert_eq!(record.games_played, 0);
        assert_eq!(record.xp, 0);
        assert_eq!(record.level, 0);
    }

    #[test]
    fn test_level_derived_from_xp() {
        let store = store();

        let record = store.apply_delta(1, 0, 0, 0, 99).unwrap().unwrap();
        assert_eq!(record.level, 0);

        let record = store.apply_delta(1, 0, 0, 0, 1).unwrap().unwrap();
        assert_eq!(record.xp, 100);
        assert_eq!(record.level, 1);

        let record = store.apply_delta(1, 0, 0, 0, 250).unwrap().unwrap();
        assert_eq!(record.xp, 350);
        assert_eq!(record.level, 3);

        // Reversal re-levels on the same write
        let record = store.apply_delta(1, 0, 0, 0, -300).unwrap().unwrap();
        assert_eq!(record.xp, 50);
        assert_eq!(record.level, 0);
    }

    #[test]
    fn test_level_derivation_with_custom_curve() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = StatStore::new(db, 1);

        let record = store.apply_delta(7, 0, 0, 0, 42).unwrap().unwrap();
        assert_eq!(record.level, 42);
    }

    #[test]
    fn test_rows_are_per_sport() {
        let store = store();

        store.apply_delta(1, 2, 1, 0, 25).unwrap();
        store.apply_delta(1, 3, 0, 1, 40).unwrap();
        store.apply_delta(1, SPORT_AGNOSTIC, 0, 0, 15).unwrap();

        let records = store.stats_for_user(1).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sport_id, SPORT_AGNOSTIC);
        assert_eq!(records[1].xp, 25);
        assert_eq!(records[2].xp, 40);
    }

    #[test]
    fn test_xp_totals_exclude_zero_xp_users() {
        let store = store();

        store.apply_delta(1, 2, 0, 0, 80).unwrap();
        store.apply_delta(1, 3, 0, 0, 20).unwrap();
        store.apply_delta(2, 2, 1, 0, 0).unwrap(); // played a game, no XP

        let totals = store.xp_totals().unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].user_id, 1);
        assert_eq!(totals[0].total_xp, 100);
    }
}
