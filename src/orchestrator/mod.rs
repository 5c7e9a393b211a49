//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 打开存储、建立会话、准备邮件通道
//! - 同时运行调度器和接口服务，收到退出信号后依次关闭
//!
//! ### `batch_scheduler` - 批量查询调度器
//! - 固定间隔触发一轮查询
//! - 串行处理所有待查询考生，逐个写回
//! - 补发未送达的成绩邮件
//!
//! ## 层次关系
//!
//! ```text
//! app (生命周期 + 接口服务)
//!     ↓
//! batch_scheduler (处理 Vec<Subject>)
//!     ↓
//! workflow::QueryFlow (处理单个 Subject)
//!     ↓
//! services / clients (分类、邮件、学信网会话)
//! ```

pub mod app;
pub mod batch_scheduler;

pub use app::App;
pub use batch_scheduler::{run_tick, Scheduler, SchedulerState, TickStats};
