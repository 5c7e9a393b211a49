//! 邮件发送 - 基础设施能力
//!
//! 只暴露"把一封 HTML 邮件发给某人"的能力，不关心内容

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::Config;
use crate::error::NotifyError;

/// SMTP 超时
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// 邮件投递能力
#[async_trait]
pub trait Mailer: Send + Sync {
    /// 投递一封 HTML 邮件
    async fn deliver(&self, to: &str, subject_line: &str, html_body: &str)
        -> Result<(), NotifyError>;
}

/// 基于 SMTP 的邮件发送
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    server: String,
}

impl SmtpMailer {
    /// 根据配置创建
    ///
    /// 端口 465 使用隐式 TLS，其他端口使用 STARTTLS
    pub fn new(config: &Config) -> Result<Self, NotifyError> {
        let from_address = if config.smtp_from.is_empty() {
            &config.smtp_user
        } else {
            &config.smtp_from
        };
        let from = parse_mailbox(from_address)?;

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        };
        let builder = builder.map_err(|e| NotifyError::BuildFailed {
            source: Box::new(e),
        })?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            server: format!("{}:{}", config.smtp_server, config.smtp_port),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(
        &self,
        to: &str,
        subject_line: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject_line)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| NotifyError::BuildFailed {
                source: Box::new(e),
            })?;

        debug!("通过 {} 发送邮件到 {}", self.server, to);
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::delivery_failed(to, e))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            source: Box::new(e),
        })
}
