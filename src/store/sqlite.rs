//! 基于 SQLite 的 [`SubjectStore`] 实现

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension as _, Row};
use tracing::info;

use super::schema::{MIGRATE_V2, SCHEMA, SCHEMA_VERSION};
use super::SubjectStore;
use crate::error::StoreError;
use crate::models::{NewSubject, Subject};

const COLUMNS: &str = "id, name, id_number, exam_id, email, school_code, fingerprint, \
                       result, notice, last_queried_at, notified, created_at, updated_at, \
                       office_note";

/// 单个 SQLite 文件中的考生记录
///
/// clone 开销很小，内部连接是引用计数的
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
    /// 打开（或创建）数据库，`:memory:` 打开内存库
    pub async fn open(dsn: &str) -> Result<Self, StoreError> {
        if dsn == ":memory:" {
            return Self::open_in_memory().await;
        }

        if let Some(parent) = Path::new(dsn).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(dsn).await?;
        let store = Self { conn };
        store.init_schema().await?;
        info!("数据库已打开: {}", dsn);
        Ok(store)
    }

    /// 内存数据库，用于测试
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let from = self
            .conn
            .call(|conn| {
                let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
                if version == 1 {
                    conn.execute_batch(MIGRATE_V2)?;
                }
                conn.execute_batch(SCHEMA)?;
                Ok(version)
            })
            .await?;

        if from > 0 && from < SCHEMA_VERSION {
            info!("数据库已从版本 {} 升级到 {}", from, SCHEMA_VERSION);
        }
        Ok(())
    }

    async fn select_where(&self, predicate: &'static str) -> Result<Vec<Subject>, StoreError> {
        let raws: Vec<RawSubject> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM subjects WHERE {predicate} ORDER BY id"
                ))?;
                let rows = stmt
                    .query_map([], RawSubject::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter().map(RawSubject::decode).collect()
    }
}

#[async_trait]
impl SubjectStore for SqliteStore {
    async fn create(&self, new: NewSubject) -> Result<Subject, StoreError> {
        let fingerprint = new.fingerprint();
        let now = Utc::now();
        let now_str = encode_dt(now);

        let insert_fingerprint = fingerprint.clone();
        let insert = new.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO subjects (
                       name, id_number, exam_id, email, school_code, fingerprint,
                       created_at, updated_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        insert.name,
                        insert.id_number,
                        insert.exam_id,
                        insert.email,
                        insert.school_code,
                        insert_fingerprint,
                        now_str,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await;

        let id = match inserted {
            Ok(id) => id,
            Err(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::Duplicate { fingerprint });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Subject {
            id,
            name: new.name,
            id_number: new.id_number,
            exam_id: new.exam_id,
            email: new.email,
            school_code: new.school_code,
            fingerprint,
            result: String::new(),
            notice: String::new(),
            office_note: String::new(),
            last_queried_at: None,
            notified: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_pending(&self) -> Result<Vec<Subject>, StoreError> {
        self.select_where("result = ''").await
    }

    async fn find_undelivered(&self) -> Result<Vec<Subject>, StoreError> {
        self.select_where("result != '' AND notified = 0").await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>, StoreError> {
        let email = email.to_string();
        let raw: Option<RawSubject> = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM subjects WHERE email = ?1 ORDER BY id DESC LIMIT 1"
                        ),
                        params![email],
                        RawSubject::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        raw.map(RawSubject::decode).transpose()
    }

    async fn update(&self, subject: &Subject) -> Result<(), StoreError> {
        let id = subject.id;
        let s = subject.clone();
        let last_queried_at = s.last_queried_at.map(encode_dt);
        let updated_at = encode_dt(s.updated_at);

        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE subjects SET
                       name = ?2, id_number = ?3, exam_id = ?4, email = ?5, school_code = ?6,
                       result = ?7, notice = ?8, last_queried_at = ?9, notified = ?10,
                       updated_at = ?11, office_note = ?12
                     WHERE id = ?1",
                    params![
                        s.id,
                        s.name,
                        s.id_number,
                        s.exam_id,
                        s.email,
                        s.school_code,
                        s.result,
                        s.notice,
                        last_queried_at,
                        s.notified,
                        updated_at,
                        s.office_note,
                    ],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let deleted = self
            .conn
            .call(|conn| Ok(conn.execute("DELETE FROM subjects", [])?))
            .await?;
        Ok(deleted)
    }
}

// ─── 编解码 ──────────────────────────────────────────────────────────────────

fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_dt(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::DateParse(format!("{s}: {e}")))
}

/// 数据库中的原始行，时间仍是字符串
struct RawSubject {
    id: i64,
    name: String,
    id_number: String,
    exam_id: String,
    email: String,
    school_code: String,
    fingerprint: String,
    result: String,
    notice: String,
    last_queried_at: Option<String>,
    notified: bool,
    created_at: String,
    updated_at: String,
    office_note: String,
}

impl RawSubject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            id_number: row.get(2)?,
            exam_id: row.get(3)?,
            email: row.get(4)?,
            school_code: row.get(5)?,
            fingerprint: row.get(6)?,
            result: row.get(7)?,
            notice: row.get(8)?,
            last_queried_at: row.get(9)?,
            notified: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            office_note: row.get(13)?,
        })
    }

    fn decode(self) -> Result<Subject, StoreError> {
        Ok(Subject {
            id: self.id,
            name: self.name,
            id_number: self.id_number,
            exam_id: self.exam_id,
            email: self.email,
            school_code: self.school_code,
            fingerprint: self.fingerprint,
            result: self.result,
            notice: self.notice,
            office_note: self.office_note,
            last_queried_at: self.last_queried_at.as_deref().map(decode_dt).transpose()?,
            notified: self.notified,
            created_at: decode_dt(&self.created_at)?,
            updated_at: decode_dt(&self.updated_at)?,
        })
    }
}
