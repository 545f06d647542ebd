//! SQL schema for the Cohort SQLite store.
//!
//! The `type` discriminator and the variant-only columns are stored as-is;
//! rows are re-validated on every read, so the tables carry no variant CHECKs.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS groups (
    group_id      TEXT PRIMARY KEY,
    group_type    TEXT NOT NULL,          -- 'standard' | 'course'
    slug          TEXT NOT NULL UNIQUE,
    status        TEXT NOT NULL,          -- 'pending' | 'active' | 'closed'
    name          TEXT NOT NULL,
    account_owner TEXT NOT NULL,
    course_id     TEXT UNIQUE             -- course groups only
);

-- At most one reference per platform per group, and a platform id belongs to
-- exactly one group.
CREATE TABLE IF NOT EXISTS group_source_ids (
    group_id  TEXT NOT NULL REFERENCES groups(group_id) ON DELETE CASCADE,
    source    TEXT NOT NULL,              -- SourceTag, e.g. 'COMMUNITY'
    source_id TEXT NOT NULL,
    PRIMARY KEY (group_id, source),
    UNIQUE (source, source_id)
);

CREATE TABLE IF NOT EXISTS group_members (
    group_member_id   TEXT PRIMARY KEY,
    group_id          TEXT NOT NULL REFERENCES groups(group_id),
    member_id         TEXT NOT NULL,
    member_type       TEXT NOT NULL,      -- 'standard' | 'course'
    status            TEXT NOT NULL,      -- 'pending' | 'active' | 'disabled'
    name              TEXT NOT NULL,
    email             TEXT NOT NULL,
    organisation_name TEXT,
    account_owner     TEXT NOT NULL,
    course_id         TEXT,               -- course memberships only
    participant_id    TEXT UNIQUE,        -- course memberships only
    UNIQUE (group_id, member_id)
);

CREATE INDEX IF NOT EXISTS group_members_group ON group_members (group_id);

-- Platform member ids are only unique within the platform's group.
CREATE TABLE IF NOT EXISTS group_member_source_ids (
    group_member_id TEXT NOT NULL REFERENCES group_members(group_member_id) ON DELETE CASCADE,
    group_id        TEXT NOT NULL,
    source          TEXT NOT NULL,
    source_id       TEXT NOT NULL,
    PRIMARY KEY (group_member_id, source),
    UNIQUE (group_id, source, source_id)
);
";
