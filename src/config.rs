use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 服务配置 ---
    pub host: String,
    pub port: u16,
    pub log_level: String,
    // --- 学信网配置 ---
    pub chsi_username: String,
    pub chsi_password: String,
    pub chsi_login_url: String,
    pub chsi_query_url: String,
    /// 查询入口页前缀，Referer 为 `{前缀}/{报考单位代码}.dhtml`
    pub chsi_referer_base: String,
    /// 访问学信网使用的代理，为空时直连
    pub proxy_url: String,
    // --- 邮件配置 ---
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    /// 发件人地址，为空时使用 smtp_user
    pub smtp_from: String,
    // --- 存储配置 ---
    pub database_dsn: String,
    pub clear_db_on_start: bool,
    // --- 查询配置 ---
    /// 查询间隔（秒）
    pub query_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            chsi_username: String::new(),
            chsi_password: String::new(),
            chsi_login_url: "https://account.chsi.com.cn/passport/login?entrytype=yzgr&service=https%3A%2F%2Fyz.chsi.com.cn%2Fj_spring_cas_security_check".to_string(),
            chsi_query_url: "https://yz.chsi.com.cn/apply/cjcx/cjcx.do".to_string(),
            chsi_referer_base: "https://yz.chsi.com.cn/apply/cjcx/t".to_string(),
            proxy_url: String::new(),
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            smtp_from: String::new(),
            database_dsn: "./data/chsi.db".to_string(),
            clear_db_on_start: false,
            query_interval: 3600,
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// 顺序：`.env` → `CONFIG_FILE` 指向的 TOML 文件（可选）→ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let base = match std::env::var("CONFIG_FILE") {
            Ok(path) if !path.is_empty() => Self::from_toml_file(&path)?,
            _ => Self::default(),
        };

        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_string("HOST").unwrap_or(self.host),
            port: env_parse("PORT", "u16")?.unwrap_or(self.port),
            log_level: env_string("LOG_LEVEL").unwrap_or(self.log_level),
            chsi_username: env_string("CHSI_USERNAME").unwrap_or(self.chsi_username),
            chsi_password: env_string("CHSI_PASSWORD").unwrap_or(self.chsi_password),
            chsi_login_url: env_string("CHSI_LOGIN_URL").unwrap_or(self.chsi_login_url),
            chsi_query_url: env_string("CHSI_QUERY_URL").unwrap_or(self.chsi_query_url),
            chsi_referer_base: env_string("CHSI_REFERER_BASE").unwrap_or(self.chsi_referer_base),
            proxy_url: env_string("PROXY_URL").unwrap_or(self.proxy_url),
            smtp_server: env_string("SMTP_SERVER").unwrap_or(self.smtp_server),
            smtp_port: env_parse("SMTP_PORT", "u16")?.unwrap_or(self.smtp_port),
            smtp_user: env_string("SMTP_USER").unwrap_or(self.smtp_user),
            smtp_password: env_string("SMTP_PASSWORD").unwrap_or(self.smtp_password),
            smtp_from: env_string("SMTP_FROM").unwrap_or(self.smtp_from),
            database_dsn: env_string("DATABASE_DSN").unwrap_or(self.database_dsn),
            clear_db_on_start: env_parse("CLEAR_DB_ON_START", "bool")?
                .unwrap_or(self.clear_db_on_start),
            query_interval: env_parse("QUERY_INTERVAL", "u64")?.unwrap_or(self.query_interval),
        })
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_interval == 0 {
            return Err(ConfigError::invalid("query_interval", "必须大于 0"));
        }
        if self.database_dsn.trim().is_empty() {
            return Err(ConfigError::invalid("database_dsn", "不能为空"));
        }
        Ok(())
    }

    /// 邮件账号和密码都配置了才会真正发送邮件
    pub fn mail_configured(&self) -> bool {
        !self.smtp_user.is_empty() && !self.smtp_password.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
