//! 批量查询调度器 - 编排层
//!
//! ## 职责
//!
//! 按固定间隔取出所有待查询考生，逐个交给 [`QueryFlow`]，
//! 每处理完一个就立即写回存储。
//!
//! ## 设计特点
//!
//! - **严格串行**：一轮内不并发，控制对学信网的请求频率
//! - **单一所有者**：远程会话只被后台循环持有，无需加锁
//! - **协作式停止**：停止信号只在两轮之间生效，不会打断正在处理的考生
//! - **失败隔离**：单个考生失败只记录，不影响同一轮的其他考生

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::models::QueryOutcome;
use crate::store::SubjectStore;
use crate::utils::logging::{log_subject_start, log_tick_complete, log_tick_start};
use crate::workflow::QueryFlow;

/// 调度器生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    /// 已发出停止信号，等待当前一轮结束
    StopRequested,
}

/// 一轮查询的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// 查到结果
    pub found: usize,
    /// 暂无结果
    pub pending: usize,
    /// 失败
    pub failed: usize,
    /// 补发成功的成绩邮件
    pub redelivered: usize,
}

impl TickStats {
    pub fn processed(&self) -> usize {
        self.found + self.pending + self.failed
    }
}

/// 运行中的后台循环
struct RunningLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<QueryFlow>,
}

/// 批量查询调度器
pub struct Scheduler {
    store: Arc<dyn SubjectStore>,
    interval: Duration,
    state: SchedulerState,
    /// 停止时由调度器保管，运行时交给后台循环
    flow: Option<QueryFlow>,
    running: Option<RunningLoop>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn SubjectStore>, flow: QueryFlow, interval: Duration) -> Self {
        Self {
            store,
            interval,
            state: SchedulerState::Stopped,
            flow: Some(flow),
            running: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// 启动后台循环：立即执行一轮，之后每个间隔执行一轮
    pub fn start(&mut self) {
        if self.state != SchedulerState::Stopped {
            warn!("调度器已在运行");
            return;
        }

        let Some(mut flow) = self.flow.take() else {
            error!("查询流程已丢失，无法启动调度器");
            return;
        };

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        run_tick(store.as_ref(), &mut flow).await;
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            info!("后台调度器已停止");
            flow
        });

        info!("后台调度器已启动，间隔: {:?}", self.interval);
        self.running = Some(RunningLoop { stop_tx, handle });
        self.state = SchedulerState::Running;
    }

    /// 停止后台循环，等待正在进行的一轮结束
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            warn!("调度器未运行");
            return;
        };

        self.state = SchedulerState::StopRequested;
        let _ = running.stop_tx.send(true);

        match running.handle.await {
            Ok(flow) => self.flow = Some(flow),
            Err(e) => error!("后台调度任务异常退出: {}", e),
        }
        self.state = SchedulerState::Stopped;
    }
}

/// 执行一轮查询
///
/// 1. 取出待查询考生的快照，逐个处理并立即写回
/// 2. 为已有结果但邮件未送达的考生补发邮件
pub async fn run_tick(store: &dyn SubjectStore, flow: &mut QueryFlow) -> TickStats {
    let mut stats = TickStats::default();

    let subjects = match store.find_pending().await {
        Ok(subjects) => subjects,
        Err(e) => {
            error!("获取待查询考生失败: {}", e);
            return stats;
        }
    };

    if subjects.is_empty() {
        debug!("没有待查询的考生");
    } else {
        let total = subjects.len();
        log_tick_start(total);

        for (idx, mut subject) in subjects.into_iter().enumerate() {
            log_subject_start(idx + 1, total, &subject.name, &subject.email);

            let outcome = flow.process(&subject).await;
            match &outcome {
                QueryOutcome::ResultFound(_) => stats.found += 1,
                QueryOutcome::NotYetAvailable(_) => stats.pending += 1,
                QueryOutcome::Failed(_) => stats.failed += 1,
            }
            info!("     查询结果: {}", outcome);

            subject.apply_outcome(&outcome, Utc::now());
            if let Err(e) = store.update(&subject).await {
                error!("     ⚠️ 更新考生记录失败 ({}): {}", subject.email, e);
            }
        }

        log_tick_complete(stats.found, stats.pending, stats.failed);
    }

    stats.redelivered = redeliver_results(store, flow).await;
    stats
}

/// 补发成绩邮件，返回成功数量
async fn redeliver_results(store: &dyn SubjectStore, flow: &QueryFlow) -> usize {
    let subjects = match store.find_undelivered().await {
        Ok(subjects) => subjects,
        Err(e) => {
            error!("获取待补发考生失败: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for mut subject in subjects {
        info!("补发成绩邮件: {}", subject.email);
        if let Err(e) = flow.redeliver(&subject).await {
            warn!("补发成绩邮件失败 ({}): {}", subject.email, e);
            continue;
        }

        subject.mark_notified(Utc::now());
        match store.update(&subject).await {
            Ok(()) => delivered += 1,
            Err(e) => error!("更新送达状态失败 ({}): {}", subject.email, e),
        }
    }
    delivered
}
