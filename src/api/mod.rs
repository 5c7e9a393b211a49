//! 提交 / 查询接口
//!
//! | Method | Path | 说明 |
//! |--------|------|------|
//! | `GET`  | `/` | 服务标识 |
//! | `GET`  | `/health` | 健康检查 |
//! | `POST` | `/api/submit` | 提交考生信息，缺字段 400，重复 409 |
//! | `GET`  | `/api/score/{email}` | 按邮箱查询结果，不存在 404 |

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::store::SubjectStore;

pub use error::ApiError;

/// 接口共享状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubjectStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SubjectStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/submit", post(handlers::submit))
        .route("/api/score/{email}", get(handlers::score))
        .with_state(state)
}
