use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
///
/// 只有这里的错误会终止整个运行；单个化合物的失败由 [`FailureKind`] 表示，
/// 永远不会越过编排层。
#[derive(Debug, Error)]
pub enum AppError {
    /// 启动时缺少必需的输入文件
    #[error("input file not found: {}", path.display())]
    InputMissing { path: PathBuf },

    /// 无法获得浏览器会话
    #[error("browser session unavailable: {0}")]
    SessionUnavailable(#[source] SessionError),

    /// 输入表缺少必需的列
    #[error("{} is missing column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// 配置错误
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// 浏览器层错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 启动或连接浏览器失败
    #[error("failed to start browser: {0}")]
    Launch(String),

    /// 导航失败
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// 等待元素超时
    #[error("no element matched '{selector}' within {timeout:?}")]
    WaitTimeout { selector: String, timeout: Duration },

    /// 执行脚本失败
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// 会话已关闭
    #[error("session already closed")]
    Closed,

    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 单个化合物处理的终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("navigation error")]
    NavigationError,
    #[error("control not found")]
    ControlNotFound,
    #[error("prediction timed out")]
    Timeout,
    #[error("results page yielded no usable table")]
    ExtractionEmpty,
    #[error("unexpected browser fault")]
    DriverException,
    #[error("result artifact could not be written")]
    ArtifactWrite,
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Script(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    pub fn input_missing(path: impl Into<PathBuf>) -> Self {
        AppError::InputMissing { path: path.into() }
    }
}

impl SessionError {
    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 浏览器层结果类型
pub type SessionResult<T> = Result<T, SessionError>;
