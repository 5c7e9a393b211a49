//! 考生记录
//!
//! 由提交接口创建，之后只由查询流水线修改

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::outcome::{FailureReason, QueryOutcome, ScoreReport};

/// 已持久化的考生记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    /// 姓名
    pub name: String,
    /// 证件号码
    pub id_number: String,
    /// 考生编号
    pub exam_id: String,
    /// 通知邮箱，同时是对外的查询键
    pub email: String,
    /// 报考单位代码
    pub school_code: String,
    /// 身份信息指纹，用于去重
    pub fingerprint: String,
    /// 查询结果，为空表示尚未确定
    pub result: String,
    /// 诊断 / 失败说明
    pub notice: String,
    /// 招生单位说明，随结果一起查到
    pub office_note: String,
    pub last_queried_at: Option<DateTime<Utc>>,
    /// 结果邮件是否已送达
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    /// 结果为空即为待查询
    pub fn is_pending(&self) -> bool {
        self.result.is_empty()
    }

    /// 有结果但邮件未送达
    pub fn is_undelivered(&self) -> bool {
        !self.result.is_empty() && !self.notified
    }

    /// 把一次查询结果折叠进记录
    ///
    /// 失败与暂无结果都保持 `result` 为空，下一轮会再次查询
    pub fn apply_outcome(&mut self, outcome: &QueryOutcome, now: DateTime<Utc>) {
        match outcome {
            QueryOutcome::ResultFound(report) => {
                self.record_report(report);
                self.notice.clear();
                self.notified = true;
            }
            QueryOutcome::NotYetAvailable(_) => {}
            QueryOutcome::Failed(reason @ FailureReason::Notification { report }) => {
                self.record_report(report);
                self.notified = false;
                self.notice = reason.to_string();
            }
            QueryOutcome::Failed(reason) => {
                self.notice = format!("查询失败：{}", reason);
            }
        }
        self.last_queried_at = Some(now);
        self.updated_at = now;
    }

    /// 已保存的结果，用于补发邮件
    pub fn report(&self) -> ScoreReport {
        let note = Some(self.office_note.clone()).filter(|n| !n.is_empty());
        ScoreReport::new(self.result.clone()).with_note(note)
    }

    fn record_report(&mut self, report: &ScoreReport) {
        self.result = report.text.clone();
        self.office_note = report.note.clone().unwrap_or_default();
    }

    /// 补发成功后标记已送达
    pub fn mark_notified(&mut self, now: DateTime<Utc>) {
        self.notified = true;
        self.notice.clear();
        self.updated_at = now;
    }
}

/// 新提交的考生信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub id_number: String,
    pub exam_id: String,
    pub email: String,
    pub school_code: String,
}

impl NewSubject {
    /// 去掉首尾空白
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            id_number: self.id_number.trim().to_string(),
            exam_id: self.exam_id.trim().to_string(),
            email: self.email.trim().to_string(),
            school_code: self.school_code.trim().to_string(),
        }
    }

    /// 返回缺失的必填字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("id_card", &self.id_number),
            ("exam_id", &self.exam_id),
            ("email", &self.email),
            ("school_code", &self.school_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// 身份信息指纹：`姓名:证件号:考生编号` 的 SHA-256
    ///
    /// 相同身份信息必然得到相同指纹，邮箱和报考单位不参与
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(format!("{}:{}:{}", self.name, self.id_number, self.exam_id));
        hex::encode(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_subject() -> NewSubject {
        NewSubject {
            name: "张三".to_string(),
            id_number: "110101199001011234".to_string(),
            exam_id: "103586210002651".to_string(),
            email: "zhangsan@example.com".to_string(),
            school_code: "10358".to_string(),
        }
    }

    fn subject() -> Subject {
        let now = Utc::now();
        let new = new_subject();
        Subject {
            id: 1,
            fingerprint: new.fingerprint(),
            name: new.name,
            id_number: new.id_number,
            exam_id: new.exam_id,
            email: new.email,
            school_code: new.school_code,
            result: String::new(),
            notice: String::new(),
            office_note: String::new(),
            last_queried_at: None,
            notified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fingerprint_ignores_contact_fields() {
        let a = new_subject();
        let b = NewSubject {
            email: "other@example.com".to_string(),
            school_code: "10001".to_string(),
            ..new_subject()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_on_identity() {
        let b = NewSubject {
            exam_id: "103586210002652".to_string(),
            ..new_subject()
        };
        assert_ne!(new_subject().fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_missing_fields() {
        let partial = NewSubject {
            email: "  ".to_string(),
            school_code: String::new(),
            ..new_subject()
        };
        assert_eq!(partial.missing_fields(), vec!["email", "school_code"]);
        assert!(new_subject().missing_fields().is_empty());
    }

    #[test]
    fn test_result_found_resolves_subject() {
        let mut s = subject();
        let now = Utc::now();
        s.notice = "查询失败：信息不匹配".to_string();
        s.apply_outcome(&QueryOutcome::ResultFound(ScoreReport::new("总分: 385; ")), now);
        assert!(!s.is_pending());
        assert!(s.notified);
        assert!(s.notice.is_empty());
        assert_eq!(s.last_queried_at, Some(now));
    }

    #[test]
    fn test_not_yet_available_only_touches_timestamp() {
        let mut s = subject();
        let now = Utc::now();
        s.apply_outcome(&QueryOutcome::NotYetAvailable(Some("成绩尚未发布".to_string())), now);
        assert!(s.is_pending());
        assert!(s.notice.is_empty());
        assert_eq!(s.last_queried_at, Some(now));
    }

    #[test]
    fn test_failure_keeps_subject_pending() {
        let mut s = subject();
        s.apply_outcome(&QueryOutcome::Failed(FailureReason::Query), Utc::now());
        assert!(s.is_pending());
        assert_eq!(s.notice, "查询失败：查询成绩失败，请确保信息正确");
    }

    #[test]
    fn test_notification_failure_keeps_result_undelivered() {
        let mut s = subject();
        s.apply_outcome(
            &QueryOutcome::Failed(FailureReason::Notification {
                report: ScoreReport::new("已录取").with_note(Some("请于3月20日前确认".to_string())),
            }),
            Utc::now(),
        );
        assert!(!s.is_pending());
        assert!(s.is_undelivered());
        assert_eq!(s.result, "已录取");
        assert_eq!(s.report().note.as_deref(), Some("请于3月20日前确认"));

        s.mark_notified(Utc::now());
        assert!(!s.is_undelivered());
        assert!(s.notice.is_empty());
    }

    #[test]
    fn test_result_without_note_clears_old_note() {
        let mut s = subject();
        s.office_note = "旧说明".to_string();
        s.apply_outcome(&QueryOutcome::ResultFound(ScoreReport::new("已录取")), Utc::now());
        assert!(s.office_note.is_empty());
        assert_eq!(s.report(), ScoreReport::new("已录取"));
    }
}
