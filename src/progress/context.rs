//! Progress context snapshots.
//!
//! Builds an ephemeral, read-only snapshot of a user's aggregate progress
//! from the stat counters and the collaborating tables. The snapshot is
//! consumed by the badge engine and discarded.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ProgressError;
use crate::storage::stat_store::XpTotal;
use crate::storage::{SocialStore, StatStore};

/// Trailing window, in days, scanned for login entries when computing streaks.
pub const STREAK_WINDOW_DAYS: i64 = 14;

/// Fraction of ranked users counted as top players.
const TOP_PLAYER_FRACTION: f64 = 0.1;

/// Derived snapshot of a user's progress. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressContext {
    /// Sum of games_played over the user's stat rows
    pub total_games_played: i64,
    /// Sum of games_hosted over the user's stat rows
    pub total_games_hosted: i64,
    /// Sum of XP over the user's stat rows
    pub total_xp: i64,
    /// Highest level across the user's stat rows
    pub current_level: i64,
    /// Participation rows for the user. Counted independently of the stat
    /// aggregate as a consistency cross-check; the two are never reconciled.
    pub games_joined: u32,
    /// Game instances the user hosts, counted from the games table
    pub games_hosted_count: u32,
    /// Accepted friendship edges with the user on either side
    pub friend_count: u32,
    /// Whether a verified coach registry entry exists for the user
    pub is_verified_coach: bool,
    /// Consecutive login days anchored at today
    pub login_streak: u32,
    /// Whether the user ranks in the top decile by total XP
    pub is_top_player: bool,
}

/// Builds progress contexts on demand.
#[derive(Clone)]
pub struct ContextBuilder {
    stats: StatStore,
    social: SocialStore,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(stats: StatStore, social: SocialStore) -> Self {
        Self { stats, social }
    }

    /// Build a snapshot for the user. A user with no rows in any table
    /// yields an all-zeros context, never an error.
    pub fn build(&self, user_id: i64) -> Result<ProgressContext, ProgressError> {
        let records = self.stats.stats_for_user(user_id)?;

        let mut context = ProgressContext {
            total_games_played: records.iter().map(|r| r.games_played).sum(),
            total_games_hosted: records.iter().map(|r| r.games_hosted).sum(),
            total_xp: records.iter().map(|r| r.xp).sum(),
            current_level: records.iter().map(|r| r.level).max().unwrap_or(0),
            games_joined: self.social.count_games_joined(user_id)?,
            games_hosted_count: self.social.count_games_hosted(user_id)?,
            friend_count: self.social.count_accepted_friends(user_id)?,
            is_verified_coach: self.social.is_verified_coach(user_id)?,
            ..Default::default()
        };

        let now = Utc::now();
        let window_start = now - Duration::days(STREAK_WINDOW_DAYS);
        let login_days = self.social.login_days_since(user_id, window_start)?;
        context.login_streak = streak_from_days(&login_days, now.date_naive());

        let totals = self.stats.xp_totals()?;
        context.is_top_player = is_top_player(&totals, user_id);

        Ok(context)
    }
}

/// Count consecutive days present in `days`, walking backward from `today`.
/// A missing entry for today anchors the streak at zero regardless of
/// earlier days.
pub fn streak_from_days(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;

    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }

    streak
}

/// Whether `user_id`'s rank over summed XP falls within the top decile.
/// Users with zero XP are excluded from the population before calling this.
/// Ties are broken by ascending user id, arbitrary but consistent.
pub fn is_top_player(totals: &[XpTotal], user_id: i64) -> bool {
    if totals.is_empty() {
        return false;
    }

    let mut ranked: Vec<&XpTotal> = totals.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_xp
            .cmp(&a.total_xp)
            .then(a.user_id.cmp(&b.user_id))
    });

    let cutoff = ((ranked.len() as f64 * TOP_PLAYER_FRACTION).floor() as usize).max(1);

    ranked
        .iter()
        .take(cutoff)
        .any(|t| t.user_id == user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, SocialStore, StatStore};
    use std::sync::Arc;

    fn builder() -> (ContextBuilder, StatStore, SocialStore) {
        let db = Arc::new(Database::open_in_memory().expect("Failed to create database"));
        let stats = StatStore::new(db.clone(), 100);
        let social = SocialStore::new(db);
        (
            ContextBuilder::new(stats.clone(), social.clone()),
            stats,
            social,
        )
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_streak_requires_today_as_anchor() {
        let today = day("2026-08-28");

        // Logged in the three days before today, but not today
        let days = vec![day("2026-08-27"), day("2026-08-26"), day("2026-08-25")];
        assert_eq!(streak_from_days(&days, today), 0);
    }

    #[test]
    fn test_streak_counts_back_to_first_gap() {
        let today = day("2026-08-28");

        let days = vec![
            day("2026-08-28"),
            day("2026-08-27"),
            day("2026-08-26"),
            // gap on the 25th
            day("2026-08-24"),
        ];
        assert_eq!(streak_from_days(&days, today), 3);
    }

    #[test]
    fn test_top_player_cutoff_ten_users() {
        let totals: Vec<XpTotal> = (1..=10)
            .map(|id| XpTotal {
                user_id: id,
                total_xp: id * 10,
            })
            .collect();

        // floor(10 * 0.1) = 1, only the highest-XP user qualifies
        assert!(is_top_player(&totals, 10));
        for id in 1..10 {
            assert!(!is_top_player(&totals, id));
        }
    }

    #[test]
    fn test_top_player_cutoff_floors_to_one() {
        let totals: Vec<XpTotal> = (1..=5)
            .map(|id| XpTotal {
                user_id: id,
                total_xp: id * 10,
            })
            .collect();

        // max(1, floor(5 * 0.1)) = 1
        assert!(is_top_player(&totals, 5));
        assert!(!is_top_player(&totals, 4));
    }

    #[test]
    fn test_top_player_ties_break_by_user_id() {
        let totals = vec![
            XpTotal {
                user_id: 3,
                total_xp: 100,
            },
            XpTotal {
                user_id: 1,
                total_xp: 100,
            },
        ];

        assert!(is_top_player(&totals, 1));
        assert!(!is_top_player(&totals, 3));
    }

    #[test]
    fn test_top_player_empty_population() {
        assert!(!is_top_player(&[], 1));
    }

    #[test]
    fn test_unknown_user_yields_zero_context() {
        let (builder, _, _) = builder();

        let context = builder.build(999).unwrap();
        assert_eq!(context.total_games_played, 0);
        assert_eq!(context.total_xp, 0);
        assert_eq!(context.current_level, 0);
        assert_eq!(context.friend_count, 0);
        assert_eq!(context.login_streak, 0);
        assert!(!context.is_verified_coach);
        assert!(!context.is_top_player);
    }

    #[test]
    fn test_context_aggregates_across_sports() {
        let (builder, stats, social) = builder();
        let user = social.insert_user("ivy", "ivy@example.com").unwrap();

        stats.apply_delta(user, 2, 4, 0, 150).unwrap();
        stats.apply_delta(user, 3, 2, 1, 80).unwrap();

        let context = builder.build(user).unwrap();
        assert_eq!(context.total_games_played, 6);
        assert_eq!(context.total_games_hosted, 1);
        assert_eq!(context.total_xp, 230);
        assert_eq!(context.current_level, 1); // max over per-sport levels

        // Sole ranked user, so top player by the max(1, ..) cutoff
        assert!(context.is_top_player);
    }

    #[test]
    fn test_context_login_streak_from_store() {
        let (builder, _, social) = builder();
        let user = social.insert_user("joe", "joe@example.com").unwrap();
        let now = Utc::now();

        social.record_activity(user, "login", now).unwrap();
        social
            .record_activity(user, "login", now - Duration::days(1))
            .unwrap();
        social
            .record_activity(user, "login", now - Duration::days(2))
            .unwrap();

        let context = builder.build(user).unwrap();
        assert_eq!(context.login_streak, 3);
    }
}
