//! 通知服务 - 业务能力层
//!
//! 负责生成两种邮件（查到成绩 / 查询失败）并交给 [`Mailer`] 发送。
//! 没有配置邮件账号时两个方法都直接返回成功。

use std::sync::Arc;

use html_escape::encode_text;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::NotifyError;
use crate::models::ScoreReport;
use crate::services::mailer::{Mailer, SmtpMailer};

pub const RESULT_SUBJECT: &str = "考研成绩已发布";
pub const FAILURE_SUBJECT: &str = "成绩查询失败通知";

/// 通知服务
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer: Some(mailer),
        }
    }

    /// 不发送任何邮件
    pub fn disabled() -> Self {
        Self { mailer: None }
    }

    /// 根据配置创建，邮件账号不完整时返回禁用的通知服务
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        if !config.mail_configured() {
            warn!("SMTP 配置不完整，将不会发送邮件");
            return Ok(Self::disabled());
        }
        Ok(Self::new(Arc::new(SmtpMailer::new(config)?)))
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// 发送成绩邮件
    pub async fn send_result(
        &self,
        to_email: &str,
        name: &str,
        report: &ScoreReport,
    ) -> Result<(), NotifyError> {
        info!("准备发送成绩邮件到: {}", to_email);
        self.send(to_email, RESULT_SUBJECT, &render_result(name, report))
            .await
    }

    /// 发送查询失败邮件
    pub async fn send_failure(&self, to_email: &str, diagnostic: &str) -> Result<(), NotifyError> {
        info!("准备发送失败通知到: {}", to_email);
        self.send(to_email, FAILURE_SUBJECT, &render_failure(diagnostic))
            .await
    }

    async fn send(&self, to_email: &str, subject_line: &str, body: &str) -> Result<(), NotifyError> {
        let Some(mailer) = &self.mailer else {
            warn!("SMTP 未配置，跳过发送到 {} 的邮件", to_email);
            return Ok(());
        };

        mailer.deliver(to_email, subject_line, body).await?;
        info!("邮件发送成功: {}", to_email);
        Ok(())
    }
}

/// 成绩邮件正文，有招生单位说明时附在成绩后面
pub fn render_result(name: &str, report: &ScoreReport) -> String {
    let note_block = match &report.note {
        Some(note) => format!(
            "<p style=\"background:#fff8e1;padding:8px\"><strong>招生单位说明：</strong> {}</p>\n",
            encode_text(note)
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body>
<h2>尊敬的 {}：</h2>
<p>您的考研成绩已发布，请登录学信网查看详情。</p>
<p><strong>成绩信息：</strong> {}</p>
{}<p>祝贺您！</p>
<p>此邮件由自动查询系统发送，请勿回复。</p>
</body></html>"#,
        encode_text(name),
        encode_text(&report.text),
        note_block
    )
}

/// 失败邮件正文
pub fn render_failure(diagnostic: &str) -> String {
    format!(
        r#"<html><body>
<h2>成绩查询失败</h2>
<p>您的考研成绩查询失败，原因如下：</p>
<p><strong>错误信息：</strong> {}</p>
<p>请检查您的个人信息是否正确，或稍后重试。</p>
<p>此邮件由自动查询系统发送，请勿回复。</p>
</body></html>"#,
        encode_text(diagnostic)
    )
}
