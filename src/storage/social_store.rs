//! Social data storage operations.
//!
//! Provides persistence for:
//! - Users and bios
//! - Game instances and participants
//! - Friendship edges
//! - Coach registry
//! - Append-only activity log

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use std::sync::Arc;

use crate::storage::database::{Database, DatabaseError};

/// Friendship status values.
pub const FRIEND_PENDING: &str = "pending";
pub const FRIEND_ACCEPTED: &str = "accepted";
pub const FRIEND_REJECTED: &str = "rejected";

/// Activity log action written on each successful authentication.
pub const ACTION_LOGIN: &str = "login";

/// Accessor for the platform's collaborating tables.
#[derive(Clone)]
pub struct SocialStore {
    db: Arc<Database>,
}

impl SocialStore {
    /// Create a new social store.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ========== Users ==========

    /// Insert a new user and return its id.
    pub fn insert_user(&self, username: &str, email: &str) -> Result<i64, DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
            params![username, email, Utc::now().to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a user's bio. `Ok(None)` means the user exists with no bio set;
    /// an unknown user is `NotFound`, as in [`update_bio`](Self::update_bio).
    pub fn get_bio(&self, user_id: i64) -> Result<Option<String>, DatabaseError> {
        let conn = self.db.connection();
        let result: Result<Option<String>, _> = conn.query_row(
            "SELECT bio FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        );

        match result {
            Ok(bio) => Ok(bio),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DatabaseError::NotFound(format!("User {}", user_id)))
            }
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Update a user's bio.
    pub fn update_bio(&self, user_id: i64, bio: &str) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        let rows_affected = conn
            .execute(
                "UPDATE users SET bio = ?2 WHERE user_id = ?1",
                params![user_id, bio],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("User {}", user_id)));
        }

        Ok(())
    }

    // ========== Games ==========

    /// Insert a new game instance and return its id.
    pub fn insert_game(
        &self,
        host_id: i64,
        sport_id: i64,
        start_time: DateTime<Utc>,
        max_players: u32,
    ) -> Result<i64, DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO game_instances (host_id, sport_id, start_time, max_players, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                host_id,
                sport_id,
                start_time.to_rfc3339(),
                max_players,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    /// Delete a game instance (participants cascade).
    pub fn delete_game(&self, game_id: i64) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        let rows_affected = conn
            .execute(
                "DELETE FROM game_instances WHERE game_id = ?1",
                params![game_id],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Game {}", game_id)));
        }

        Ok(())
    }

    /// Add a participant to a game.
    pub fn add_participant(
        &self,
        game_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO game_participants (game_id, user_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![game_id, user_id, role, Utc::now().to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Count games a user has joined as a participant.
    pub fn count_games_joined(&self, user_id: i64) -> Result<u32, DatabaseError> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT COUNT(*) FROM game_participants WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Count game instances a user hosts.
    pub fn count_games_hosted(&self, user_id: i64) -> Result<u32, DatabaseError> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT COUNT(*) FROM game_instances WHERE host_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== Friendships ==========

    /// Insert a friendship edge.
    pub fn insert_friendship(
        &self,
        user_id: i64,
        friend_id: i64,
        status: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO friends (user_id, friend_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, friend_id, status, Utc::now().to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Update the status of a friendship edge (accept/reject).
    pub fn set_friendship_status(
        &self,
        user_id: i64,
        friend_id: i64,
        status: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        let rows_affected = conn
            .execute(
                "UPDATE friends SET status = ?3 WHERE user_id = ?1 AND friend_id = ?2",
                params![user_id, friend_id, status],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Friendship {} -> {}",
                user_id, friend_id
            )));
        }

        Ok(())
    }

    /// Count accepted friendships where the user appears on either side.
    pub fn count_accepted_friends(&self, user_id: i64) -> Result<u32, DatabaseError> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT COUNT(*) FROM friends
             WHERE (user_id = ?1 OR friend_id = ?1) AND status = ?2",
            params![user_id, FRIEND_ACCEPTED],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== Coaches ==========

    /// Insert or replace a coach registry entry.
    pub fn upsert_coach(
        &self,
        user_id: i64,
        experience_yrs: Option<u32>,
        certifications: Option<&str>,
        is_verified: bool,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT OR REPLACE INTO coaches (user_id, experience_yrs, certifications, is_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                experience_yrs,
                certifications,
                is_verified as i32,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Whether the user has a verified coach registry entry.
    pub fn is_verified_coach(&self, user_id: i64) -> Result<bool, DatabaseError> {
        let conn = self.db.connection();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM coaches WHERE user_id = ?1 AND is_verified = 1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count > 0)
    }

    // ========== Activity log ==========

    /// Append an activity log entry with an explicit timestamp.
    pub fn record_activity(
        &self,
        user_id: i64,
        action: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO activity_log (user_id, action, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, action, created_at.to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Append a login entry stamped with the current time.
    pub fn record_login(&self, user_id: i64) -> Result<(), DatabaseError> {
        self.record_activity(user_id, ACTION_LOGIN, Utc::now())
    }

    /// Distinct UTC calendar days with a login entry at or after `since`.
    pub fn login_days_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>, DatabaseError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT created_at FROM activity_log
                 WHERE user_id = ?1 AND action = ?2 AND created_at >= ?3",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![user_id, ACTION_LOGIN, since.to_rfc3339()],
                |row| row.get::<_, String>(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut days = Vec::new();
        for row in rows {
            let created_str = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let created = DateTime::parse_from_rfc3339(&created_str)
                .map_err(|e| DatabaseError::DeserializationError(format!("Invalid date: {}", e)))?
                .with_timezone(&Utc);

            let day = created.date_naive();
            if !days.contains(&day) {
                days.push(day);
            }
        }

        Ok(days)
    }
}
