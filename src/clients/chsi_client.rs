//! 学信网会话客户端
//!
//! 持有带 cookie 的 HTTP 会话，封装登录和成绩查询请求
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ORIGIN, REFERER};
use reqwest::{Client, Proxy, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, AuthError, ConfigError, QueryError};
use crate::models::Subject;

/// 每次网络请求的超时
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Mobile Safari/537.36";

static LT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="lt"\s+value="([^"]+)""#).expect("valid lt pattern"));

static EXECUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="execution"\s+value="([^"]+)""#).expect("valid execution pattern")
});

/// 远程会话能力
///
/// 会话状态（cookie）是实例私有的，同一时间只允许一个调用方持有
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// 建立会话并提交账号密码
    async fn authenticate(&mut self) -> Result<(), AuthError>;

    /// 提交考生信息，返回未解析的页面
    async fn submit_query(&mut self, subject: &Subject) -> Result<String, QueryError>;
}

/// 学信网客户端
pub struct ChsiClient {
    http: Client,
    username: String,
    password: String,
    login_url: String,
    query_url: String,
    referer_base: String,
    login_origin: Option<String>,
    query_origin: Option<String>,
}

impl ChsiClient {
    /// 创建新的学信网客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT);

        let proxy_url = config.proxy_url.trim();
        if !proxy_url.is_empty() {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| ConfigError::invalid("proxy_url", format!("{}: {}", proxy_url, e)))?;
            info!("学信网请求将通过代理: {}", proxy_url);
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| AppError::Other(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            http,
            username: config.chsi_username.clone(),
            password: config.chsi_password.clone(),
            login_url: config.chsi_login_url.clone(),
            query_url: config.chsi_query_url.clone(),
            referer_base: config.chsi_referer_base.trim_end_matches('/').to_string(),
            login_origin: origin_of(&config.chsi_login_url),
            query_origin: origin_of(&config.chsi_query_url),
        })
    }

    /// 查询入口页，作为 Referer
    fn referer_for(&self, school_code: &str) -> String {
        format!("{}/{}.dhtml", self.referer_base, school_code)
    }
}

#[async_trait]
impl RemoteSession for ChsiClient {
    async fn authenticate(&mut self) -> Result<(), AuthError> {
        info!("正在登录学信网，账号: {}", self.username);

        // 第一步：获取登录页，拿到会话 cookie 和 lt / execution
        let login_page = self
            .http
            .get(&self.login_url)
            .send()
            .await
            .map_err(|e| AuthError::transport(&self.login_url, e))?
            .text()
            .await
            .map_err(|e| AuthError::transport(&self.login_url, e))?;

        let (lt, execution) = extract_login_tokens(&login_page);
        if lt.is_empty() || execution.is_empty() {
            debug!("登录页中没有找到 lt / execution，使用空值");
        }

        // 第二步：提交账号密码
        let form = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("lt", lt.as_str()),
            ("execution", execution.as_str()),
            ("_eventId", "submit"),
        ];

        let mut request = self
            .http
            .post(&self.login_url)
            .header(REFERER, &self.login_url)
            .form(&form);
        if let Some(origin) = &self.login_origin {
            request = request.header(ORIGIN, origin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::transport(&self.login_url, e))?;

        // 学信网登录失败没有可靠的状态码，这里只记录
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            warn!("登录返回状态码: {}", status);
        }

        info!("登录请求完成");
        Ok(())
    }

    async fn submit_query(&mut self, subject: &Subject) -> Result<String, QueryError> {
        info!(
            "正在查询成绩: {} (考生编号: {}, 报考单位: {})",
            subject.name, subject.exam_id, subject.school_code
        );

        let form = [
            ("xm", subject.name.as_str()),
            ("zjhm", subject.id_number.as_str()),
            ("ksbh", subject.exam_id.as_str()),
            ("bkdwdm", subject.school_code.as_str()),
            ("checkcode", ""),
        ];

        let mut request = self
            .http
            .post(&self.query_url)
            .header(REFERER, self.referer_for(&subject.school_code))
            .form(&form);
        if let Some(origin) = &self.query_origin {
            request = request.header(ORIGIN, origin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueryError::transport(&self.query_url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("查询返回状态码: {}", status);
            return Err(QueryError::BadStatus {
                endpoint: self.query_url.clone(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| QueryError::transport(&self.query_url, e))?;

        debug!("查询响应长度: {} 字节", html.len());
        Ok(html)
    }
}

/// 从登录页提取 lt 和 execution，找不到时返回空串
pub fn extract_login_tokens(html: &str) -> (String, String) {
    let find = |re: &Regex| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };
    (find(&LT_RE), find(&EXECUTION_RE))
}

fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|origin| origin != "null")
}
