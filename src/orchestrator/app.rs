use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::clients::ChsiClient;
use crate::config::Config;
use crate::orchestrator::batch_scheduler::Scheduler;
use crate::services::Notifier;
use crate::store::{SqliteStore, SubjectStore};
use crate::utils::logging::log_startup;
use crate::workflow::QueryFlow;

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<dyn SubjectStore>,
    scheduler: Scheduler,
}

impl App {
    /// 初始化应用：打开数据库、建立学信网会话、准备邮件通道
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(config.query_interval, config.mail_configured());

        let store = SqliteStore::open(&config.database_dsn)
            .await
            .with_context(|| format!("打开数据库失败: {}", config.database_dsn))?;

        if config.clear_db_on_start {
            let removed = store.clear().await.context("清空数据库失败")?;
            warn!("🧹 启动时已清空数据库，删除 {} 条记录", removed);
        }

        let store: Arc<dyn SubjectStore> = Arc::new(store);

        let client = ChsiClient::new(&config)?;
        let notifier = Notifier::from_config(&config)?;
        if !notifier.is_enabled() {
            warn!("⚠️ 未配置 SMTP，邮件通知已关闭");
        }

        let flow = QueryFlow::new(Box::new(client), notifier);
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            flow,
            Duration::from_secs(config.query_interval),
        );

        Ok(Self {
            config,
            store,
            scheduler,
        })
    }

    /// 启动调度器并提供接口服务，收到 Ctrl-C 后依次退出
    pub async fn run(mut self) -> Result<()> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("监听地址失败: {}", address))?;
        info!("🌐 接口服务已启动: http://{}", address);

        self.scheduler.start();

        let router = api::router(AppState::new(Arc::clone(&self.store)));
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.scheduler.stop().await;
        served.context("接口服务异常退出")?;

        info!("👋 程序已退出");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("监听退出信号失败，服务将持续运行: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在关闭...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_failure_returns_before_scheduling() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: occupied.local_addr().unwrap().port(),
            database_dsn: ":memory:".to_string(),
            ..Config::default()
        };

        let app = App::initialize(config).await.unwrap();
        let err = app.run().await.unwrap_err();
        assert!(err.to_string().contains("监听地址失败"), "{err}");
    }
}
