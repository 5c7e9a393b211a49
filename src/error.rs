use thiserror::Error;

/// 外部错误的统一装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 学信网登录错误
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),
    /// 成绩查询错误
    #[error("查询错误: {0}")]
    Query(#[from] QueryError),
    /// 邮件通知错误
    #[error("通知错误: {0}")]
    Notify(#[from] NotifyError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 登录学信网失败
///
/// 只有传输层失败（连接拒绝、超时、响应损坏）才会产生该错误，
/// 站点自身的登录失败没有可靠的状态码，会在查询 / 解析阶段体现。
#[derive(Debug, Error)]
pub enum AuthError {
    /// 网络请求失败
    #[error("登录请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BoxError,
    },
}

/// 成绩查询失败
#[derive(Debug, Error)]
pub enum QueryError {
    /// 网络请求失败
    #[error("查询请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BoxError,
    },
    /// 返回非 200 状态码
    #[error("查询返回状态码 {status} ({endpoint})")]
    BadStatus { endpoint: String, status: u16 },
}

/// 邮件通知错误
#[derive(Debug, Error)]
pub enum NotifyError {
    /// 邮件地址无效
    #[error("无效的邮件地址 '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: BoxError,
    },
    /// 构建邮件失败
    #[error("构建邮件失败: {source}")]
    BuildFailed {
        #[source]
        source: BoxError,
    },
    /// 发送失败
    #[error("发送邮件到 {to} 失败: {source}")]
    DeliveryFailed {
        to: String,
        #[source]
        source: BoxError,
    },
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    /// 相同的身份信息已提交过
    #[error("重复提交 (指纹: {fingerprint})")]
    Duplicate { fingerprint: String },
    /// 记录不存在
    #[error("记录不存在: {0}")]
    NotFound(i64),
    #[error("时间解析失败: {0}")]
    DateParse(String),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值无效
    #[error("配置项 {field} 无效: {reason}")]
    Invalid { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AuthError {
    pub fn transport(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AuthError::Transport {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }
}

impl QueryError {
    pub fn transport(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        QueryError::Transport {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }
}

impl NotifyError {
    pub fn delivery_failed(
        to: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        NotifyError::DeliveryFailed {
            to: to.into(),
            source: Box::new(source),
        }
    }
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
