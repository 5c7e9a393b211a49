//! 单次查询的结果
//!
//! 只在一次处理过程中存在，随后立即折叠进 [`Subject`](super::Subject) 的字段

use std::fmt;

/// 一次查询尝试的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// 查到了成绩或录取状态
    ResultFound(ScoreReport),
    /// 暂无结果，附带可选的诊断信息
    NotYetAvailable(Option<String>),
    /// 明确失败
    Failed(FailureReason),
}

/// 失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 无法登录学信网
    SignIn,
    /// 查询请求失败
    Query,
    /// 报考信息与学信网记录不匹配
    InformationMismatch,
    /// 页面中的成绩数据无法解析
    MalformedPayload,
    /// 已查到成绩，但邮件没有发出去
    Notification { report: ScoreReport },
}

/// 查到的结果，以及招生单位附带的说明
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreReport {
    pub text: String,
    /// 招生单位说明（`zsdwsm`）
    pub note: Option<String>,
}

impl ScoreReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

impl QueryOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, QueryOutcome::ResultFound(_))
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SignIn => write!(f, "登录学信网失败，请稍后重试"),
            FailureReason::Query => write!(f, "查询成绩失败，请确保信息正确"),
            FailureReason::InformationMismatch => write!(f, "信息不匹配"),
            FailureReason::MalformedPayload => write!(f, "成绩数据解析失败"),
            FailureReason::Notification { .. } => write!(f, "成绩已查到，但邮件发送失败"),
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::ResultFound(report) => write!(f, "已查到: {}", report.text),
            QueryOutcome::NotYetAvailable(Some(msg)) => write!(f, "暂无结果: {}", msg),
            QueryOutcome::NotYetAvailable(None) => write!(f, "暂无结果"),
            QueryOutcome::Failed(reason) => write!(f, "失败: {}", reason),
        }
    }
}
