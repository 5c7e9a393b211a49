//! 日志工具模块
//!
//! 提供日志初始化和批次输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing
///
/// 设置了 `RUST_LOG` 时以其为准，否则使用配置中的日志级别
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `interval_secs`: 查询间隔（秒）
/// - `mail_enabled`: 是否配置了邮件
pub fn log_startup(interval_secs: u64, mail_enabled: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 研招网成绩自动查询");
    info!("⏱️ 查询间隔: {} 秒", interval_secs);
    if mail_enabled {
        info!("📧 邮件通知: 已启用");
    } else {
        info!("📧 邮件通知: 未配置，仅记录结果");
    }
    info!("{}", "=".repeat(60));
}

/// 记录一轮查询开始
pub fn log_tick_start(pending: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始后台成绩查询批次，待查询 {} 人", pending);
    info!("{}", "=".repeat(60));
}

/// 记录单个考生开始处理
pub fn log_subject_start(index: usize, total: usize, name: &str, email: &str) {
    info!("[{}/{}] 正在处理: {} ({})", index, total, name, email);
}

/// 记录一轮查询完成
///
/// # 参数
/// - `found`: 查到成绩的数量
/// - `pending`: 仍待查询的数量
/// - `failed`: 失败数量
pub fn log_tick_complete(found: usize, pending: usize, failed: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 本批次完成: 查到 {}, 待定 {}, 失败 {}, 共 {}",
        found,
        pending,
        failed,
        found + pending + failed
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
