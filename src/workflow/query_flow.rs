//! 成绩查询流程 - 流程层
//!
//! 核心职责：定义"一位考生"的完整查询流程
//!
//! 流程顺序：
//! 1. 登录 → 失败则发失败邮件
//! 2. 查询 → 失败则发失败邮件
//! 3. 解析 → 失败或暂无结果都不发邮件
//! 4. 查到结果 → 发成绩邮件
//!
//! 只在"确认的登录/查询失败"和"确认的结果"两处发邮件，
//! 暂无结果时每轮都会静默重试。

use tracing::{error, info, warn};

use crate::clients::RemoteSession;
use crate::error::NotifyError;
use crate::models::{FailureReason, QueryOutcome, Subject};
use crate::services::{classify, Notifier};

/// 成绩查询流程
///
/// - 独占一个远程会话，不做持久化
/// - 所有远程 / 解析错误都在这里转换成 [`QueryOutcome::Failed`]
pub struct QueryFlow {
    session: Box<dyn RemoteSession>,
    notifier: Notifier,
}

impl QueryFlow {
    pub fn new(session: Box<dyn RemoteSession>, notifier: Notifier) -> Self {
        Self { session, notifier }
    }

    /// 处理一位考生
    pub async fn process(&mut self, subject: &Subject) -> QueryOutcome {
        info!("开始查询考生: {}", subject.email);

        // ========== 步骤 1: 登录 ==========
        if let Err(e) = self.session.authenticate().await {
            error!("考生 {} 登录失败: {}", subject.email, e);
            return self.fail_with_notice(subject, FailureReason::SignIn).await;
        }

        // ========== 步骤 2: 查询 ==========
        let html = match self.session.submit_query(subject).await {
            Ok(html) => html,
            Err(e) => {
                error!("考生 {} 查询失败: {}", subject.email, e);
                return self.fail_with_notice(subject, FailureReason::Query).await;
            }
        };

        // ========== 步骤 3: 解析 ==========
        match classify(&html) {
            QueryOutcome::Failed(reason) => {
                warn!("考生 {} 解析结果: {}（不通知）", subject.email, reason);
                QueryOutcome::Failed(reason)
            }
            QueryOutcome::NotYetAvailable(diagnostic) => {
                info!("考生 {} 暂无成绩", subject.email);
                QueryOutcome::NotYetAvailable(diagnostic)
            }
            // ========== 步骤 4: 通知 ==========
            QueryOutcome::ResultFound(report) => {
                match self
                    .notifier
                    .send_result(&subject.email, &subject.name, &report)
                    .await
                {
                    Ok(()) => {
                        info!("考生 {} 查询完成，成绩邮件已发送", subject.email);
                        QueryOutcome::ResultFound(report)
                    }
                    Err(e) => {
                        error!("考生 {} 成绩邮件发送失败: {}", subject.email, e);
                        QueryOutcome::Failed(FailureReason::Notification { report })
                    }
                }
            }
        }
    }

    /// 补发成绩邮件
    pub async fn redeliver(&self, subject: &Subject) -> Result<(), NotifyError> {
        self.notifier
            .send_result(&subject.email, &subject.name, &subject.report())
            .await
    }

    /// 发送失败通知并返回失败结果，通知本身失败只记录
    async fn fail_with_notice(&self, subject: &Subject, reason: FailureReason) -> QueryOutcome {
        if let Err(e) = self
            .notifier
            .send_failure(&subject.email, &reason.to_string())
            .await
        {
            error!("考生 {} 失败通知发送失败: {}", subject.email, e);
        }
        QueryOutcome::Failed(reason)
    }
}
