//! SQLite 表结构
//!
//! 连接建立时执行，`PRAGMA user_version` 记录当前版本

pub const SCHEMA_VERSION: i64 = 2;

/// 新库直接建成最新结构
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS subjects (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    id_number       TEXT NOT NULL,
    exam_id         TEXT NOT NULL,
    email           TEXT NOT NULL,
    school_code     TEXT NOT NULL,
    fingerprint     TEXT NOT NULL UNIQUE,
    result          TEXT NOT NULL DEFAULT '',
    notice          TEXT NOT NULL DEFAULT '',
    last_queried_at TEXT,              -- RFC 3339 UTC; NULL = never queried
    notified        INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    office_note     TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS subjects_email_idx  ON subjects(email);
CREATE INDEX IF NOT EXISTS subjects_result_idx ON subjects(result);

PRAGMA user_version = 2;
";

/// 版本 1 → 2：增加招生单位说明
pub const MIGRATE_V2: &str = "
ALTER TABLE subjects ADD COLUMN office_note TEXT NOT NULL DEFAULT '';
PRAGMA user_version = 2;
";
