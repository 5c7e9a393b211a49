//! # CHSI Score Watch
//!
//! 定时查询学信网考研成绩 / 录取状态，查到后邮件通知考生
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有带 cookie 的学信网会话
//! - `ChsiClient` - 登录 + 提交查询表单，返回原始页面
//!
//! ### ② 业务能力层（Services）
//! - `services/classifier` - 从页面中提取成绩数据并分类
//! - `services/notifier` - 成绩 / 失败两种邮件模板
//! - `services/mailer` - SMTP 发信能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个考生"的完整查询流程
//! - `QueryFlow` - 登录 → 查询 → 分类 → 通知
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 定时批量查询，逐个写回
//! - `orchestrator/app` - 应用生命周期，同时运行调度器和接口服务
//!
//! ### 外围
//! - `store/` - SQLite 考生记录
//! - `api/` - 提交 / 查询接口

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ChsiClient, RemoteSession};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{FailureReason, NewSubject, QueryOutcome, ScoreReport, Subject};
pub use orchestrator::{run_tick, App, Scheduler, SchedulerState, TickStats};
pub use services::{classify, Mailer, Notifier, SmtpMailer};
pub use store::{SqliteStore, SubjectStore};
pub use workflow::QueryFlow;
