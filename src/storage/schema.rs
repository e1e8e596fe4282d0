//! Database schema definitions for PlayConnect.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    bio TEXT,
    created_at TEXT NOT NULL
);

-- Sports table
CREATE TABLE IF NOT EXISTS sports (
    sport_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    min_players INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- Per-(user, sport) progress counters. sport_id 0 is the sport-agnostic
-- sentinel used for friend and bio progress.
CREATE TABLE IF NOT EXISTS user_stats (
    user_id INTEGER NOT NULL,
    sport_id INTEGER NOT NULL DEFAULT 0,
    games_played INTEGER NOT NULL DEFAULT 0,
    games_hosted INTEGER NOT NULL DEFAULT 0,
    xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, sport_id)
);

CREATE INDEX IF NOT EXISTS idx_user_stats_user_id ON user_stats(user_id);

-- Game instances table
CREATE TABLE IF NOT EXISTS game_instances (
    game_id INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id INTEGER NOT NULL REFERENCES users(user_id),
    sport_id INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    max_players INTEGER NOT NULL DEFAULT 10,
    status TEXT NOT NULL DEFAULT 'Open',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_game_instances_host_id ON game_instances(host_id);

-- Game participants table
CREATE TABLE IF NOT EXISTS game_participants (
    game_id INTEGER NOT NULL REFERENCES game_instances(game_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'PLAYER',
    joined_at TEXT NOT NULL,
    PRIMARY KEY (game_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_game_participants_user_id ON game_participants(user_id);

-- Friendship edges. Status is 'pending', 'accepted' or 'rejected'.
CREATE TABLE IF NOT EXISTS friends (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    friend_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, friend_id)
);

-- Coach registry table
CREATE TABLE IF NOT EXISTS coaches (
    user_id INTEGER PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    experience_yrs INTEGER,
    certifications TEXT,
    is_verified INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Badge ledger. Uniqueness of (user_id, badge_name) is enforced by the badge
-- engine checking existing awards before insert, not by a constraint here.
CREATE TABLE IF NOT EXISTS user_badges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    badge_name TEXT NOT NULL,
    earned_on TEXT NOT NULL,
    seen INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_user_badges_user_id ON user_badges(user_id);

-- Append-only activity log
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    action TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_log_user_action ON activity_log(user_id, action);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
