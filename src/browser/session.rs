//! 浏览器会话抽象
//!
//! 驱动只通过这两个 trait 操作浏览器，真实实现见 [`crate::browser::chromium`]。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};

use crate::error::{SessionError, SessionResult};

/// 重新查找元素的间隔
pub const FIND_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// 页面上的一个可操作控件
#[async_trait]
pub trait Control: Send + Sync {
    async fn clear(&self) -> SessionResult<()>;
    async fn type_text(&self, text: &str) -> SessionResult<()>;
    async fn click(&self) -> SessionResult<()>;
}

/// 一个可控的浏览器页面
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Control: Control;

    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// 按 CSS 选择器查找，不存在时返回 `None`
    async fn find(&self, selector: &str) -> SessionResult<Option<Self::Control>>;

    /// 在 `timeout` 内反复查找，直到元素出现
    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<Self::Control> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(control) = self.find(selector).await? {
                return Ok(control);
            }
            if Instant::now() >= deadline {
                return Err(SessionError::WaitTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            sleep(FIND_RETRY_INTERVAL).await;
        }
    }

    /// 在页面中执行脚本并返回 JSON 结果
    async fn evaluate(&self, script: &str) -> SessionResult<JsonValue>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn title(&self) -> SessionResult<String>;

    async fn page_source(&self) -> SessionResult<String>;

    async fn screenshot(&self, path: &Path) -> SessionResult<()>;

    /// 关闭会话；重复调用无副作用
    async fn close(&mut self) -> SessionResult<()>;
}

/// 创建浏览器会话（代价高，每批只调用一次）
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> SessionResult<Self::Session>;
}
