//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS shifts (
    name              TEXT PRIMARY KEY,
    start_time        TEXT NOT NULL,   -- HH:mm
    end_time          TEXT NOT NULL,   -- HH:mm; before start_time = overnight
    tolerance_minutes INTEGER NOT NULL CHECK (tolerance_minutes >= 0),
    active            INTEGER NOT NULL DEFAULT 1,
    description       TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL,   -- naive local, ISO 8601
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- A shift rename updates shifts.name and every referencing row inside one
-- transaction, so the reference is only checked at commit.
CREATE TABLE IF NOT EXISTS assignments (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    shift_name TEXT NOT NULL
               REFERENCES shifts(name) DEFERRABLE INITIALLY DEFERRED,
    position   INTEGER NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, shift_name)
);

CREATE UNIQUE INDEX IF NOT EXISTS assignments_single_default
    ON assignments(user_id) WHERE is_default = 1;

-- shift_name is the name at the time of the event and is deliberately not a
-- foreign key: renames leave history untouched.
CREATE TABLE IF NOT EXISTS attendance (
    record_id         TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    shift_name        TEXT NOT NULL,
    date              TEXT NOT NULL,   -- YYYY-MM-DD
    check_in_time     TEXT,
    check_in_at       TEXT,
    check_in_status   TEXT,            -- 'on_time' | 'late' | 'early'
    check_out_time    TEXT,
    check_out_at      TEXT,
    check_out_status  TEXT,
    minutes_early     INTEGER NOT NULL DEFAULT 0,
    work_duration     TEXT,            -- H:mm
    status            TEXT NOT NULL DEFAULT 'incomplete',
    note              TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (user_id, shift_name, date)
);

CREATE INDEX IF NOT EXISTS attendance_shift_idx ON attendance(shift_name);
CREATE INDEX IF NOT EXISTS attendance_date_idx  ON attendance(date);

PRAGMA user_version = 1;
";
