//! `SqliteStore` 针对内存数据库的测试

use chrono::Utc;

use super::{SqliteStore, SubjectStore};
use crate::error::StoreError;
use crate::models::{FailureReason, NewSubject, QueryOutcome, ScoreReport};

async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn new_subject(name: &str, exam_id: &str) -> NewSubject {
    NewSubject {
        name: name.to_string(),
        id_number: "110101199001011234".to_string(),
        exam_id: exam_id.to_string(),
        email: format!("{exam_id}@example.com"),
        school_code: "10358".to_string(),
    }
}

#[tokio::test]
async fn create_starts_pending() {
    let s = store().await;
    let subject = s.create(new_subject("张三", "1001")).await.unwrap();

    assert!(subject.id > 0);
    assert!(subject.is_pending());
    assert!(subject.notice.is_empty());
    assert!(subject.last_queried_at.is_none());
    assert!(!subject.notified);
    assert_eq!(subject.fingerprint, new_subject("张三", "1001").fingerprint());
}

#[tokio::test]
async fn duplicate_identity_is_rejected() {
    let s = store().await;
    s.create(new_subject("张三", "1001")).await.unwrap();

    let again = NewSubject {
        email: "someone-else@example.com".to_string(),
        ..new_subject("张三", "1001")
    };
    let err = s.create(again).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }), "{err}");
}

#[tokio::test]
async fn find_pending_is_ordered_and_excludes_resolved() {
    let s = store().await;
    let a = s.create(new_subject("甲", "1001")).await.unwrap();
    let mut b = s.create(new_subject("乙", "1002")).await.unwrap();
    let c = s.create(new_subject("丙", "1003")).await.unwrap();

    b.apply_outcome(&QueryOutcome::ResultFound(ScoreReport::new("总分: 400; ")), Utc::now());
    s.update(&b).await.unwrap();

    let pending: Vec<i64> = s.find_pending().await.unwrap().iter().map(|x| x.id).collect();
    assert_eq!(pending, vec![a.id, c.id]);
}

#[tokio::test]
async fn update_round_trips_all_result_fields() {
    let s = store().await;
    let mut subject = s.create(new_subject("张三", "1001")).await.unwrap();
    let now = Utc::now();
    subject.apply_outcome(&QueryOutcome::Failed(FailureReason::InformationMismatch), now);
    s.update(&subject).await.unwrap();

    let fetched = s.find_by_email("1001@example.com").await.unwrap().unwrap();
    assert_eq!(fetched.notice, "查询失败：信息不匹配");
    assert!(fetched.is_pending());
    let queried = fetched.last_queried_at.expect("timestamp persisted");
    assert_eq!(queried.timestamp_micros(), now.timestamp_micros());
}

#[tokio::test]
async fn undelivered_results_are_listed() {
    let s = store().await;
    let mut subject = s.create(new_subject("张三", "1001")).await.unwrap();
    subject.apply_outcome(
        &QueryOutcome::Failed(FailureReason::Notification {
            report: ScoreReport::new("已录取").with_note(Some("请于3月20日前确认".to_string())),
        }),
        Utc::now(),
    );
    s.update(&subject).await.unwrap();

    assert!(s.find_pending().await.unwrap().is_empty());
    let undelivered = s.find_undelivered().await.unwrap();
    assert_eq!(undelivered.len(), 1);
    assert_eq!(undelivered[0].result, "已录取");
    assert_eq!(undelivered[0].office_note, "请于3月20日前确认");
}

#[tokio::test]
async fn find_by_email_missing_returns_none() {
    let s = store().await;
    assert!(s.find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let s = store().await;
    let mut subject = s.create(new_subject("张三", "1001")).await.unwrap();
    subject.id = 999;
    assert!(matches!(
        s.update(&subject).await,
        Err(StoreError::NotFound(999))
    ));
}

#[tokio::test]
async fn clear_removes_everything() {
    let s = store().await;
    s.create(new_subject("甲", "1001")).await.unwrap();
    s.create(new_subject("乙", "1002")).await.unwrap();
    assert_eq!(s.clear().await.unwrap(), 2);
    assert!(s.find_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn version_one_database_gains_office_note() {
    let path = std::env::temp_dir().join(format!(
        "chsi-v1-{}-{}.db",
        std::process::id(),
        Utc::now().timestamp_micros()
    ));
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL, id_number TEXT NOT NULL, exam_id TEXT NOT NULL,
                email TEXT NOT NULL, school_code TEXT NOT NULL,
                fingerprint TEXT NOT NULL UNIQUE,
                result TEXT NOT NULL DEFAULT '', notice TEXT NOT NULL DEFAULT '',
                last_queried_at TEXT, notified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL, updated_at TEXT NOT NULL
             );
             INSERT INTO subjects (name, id_number, exam_id, email, school_code, fingerprint,
                                   created_at, updated_at)
             VALUES ('张三', '1', '1001', 'old@example.com', '10358', 'fp',
                     '2026-03-01T00:00:00Z', '2026-03-01T00:00:00Z');
             PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let s = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
    let mut old = s.find_by_email("old@example.com").await.unwrap().unwrap();
    assert!(old.office_note.is_empty());
    assert!(old.is_pending());

    old.office_note = "请于3月20日前确认".to_string();
    s.update(&old).await.unwrap();
    let again = s.find_by_email("old@example.com").await.unwrap().unwrap();
    assert_eq!(again.office_note, "请于3月20日前确认");
    drop(s);

    let _ = std::fs::remove_file(&path);
}
