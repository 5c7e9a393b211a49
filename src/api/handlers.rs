use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{ApiError, AppState};
use crate::models::{NewSubject, Subject};

/// 统一响应包装，`code = 0` 表示成功
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRequest {
    pub name: String,
    pub id_card: String,
    pub exam_id: String,
    pub email: String,
    pub school_code: String,
}

impl From<SubmitRequest> for NewSubject {
    fn from(req: SubmitRequest) -> Self {
        NewSubject {
            name: req.name,
            id_number: req.id_card,
            exam_id: req.exam_id,
            email: req.email,
            school_code: req.school_code,
        }
        .normalized()
    }
}

/// `GET /api/score/{email}` 的返回内容
#[derive(Debug, Serialize)]
pub struct ScoreView {
    pub name: String,
    pub email: String,
    pub score: String,
    pub notice: String,
    /// 招生单位说明
    pub office_note: String,
    pub query_time: Option<DateTime<Utc>>,
    pub notified: bool,
}

impl From<Subject> for ScoreView {
    fn from(s: Subject) -> Self {
        Self {
            name: s.name,
            email: s.email,
            score: s.result,
            notice: s.notice,
            office_note: s.office_note,
            query_time: s.last_queried_at,
            notified: s.notified,
        }
    }
}

pub async fn index() -> Json<Value> {
    Json(json!({ "message": "CHSI score watch" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/submit`
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(format!("请求格式错误: {}", e)))?;
    let new: NewSubject = req.into();

    let missing = new.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "缺少必填字段: {}",
            missing.join(", ")
        )));
    }

    let subject = state.store.create(new).await?;
    info!("📝 新考生已提交: {} ({})", subject.name, subject.email);

    Ok(Json(Envelope::ok(
        "提交成功，成绩发布后将通过邮件通知",
        Some(json!({ "id": subject.id })),
    )))
}

/// `GET /api/score/{email}`
pub async fn score(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Envelope<ScoreView>>, ApiError> {
    let subject = state
        .store
        .find_by_email(email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("未找到该邮箱的记录: {}", email)))?;

    Ok(Json(Envelope::ok("ok", Some(subject.into()))))
}
