//! Chromium 会话实现
//!
//! 两种获取方式：
//! - 配置了调试端口时连接已有浏览器（不会在结束时关闭用户的浏览器）
//! - 否则启动本地 Chrome/Chromium（默认无头）

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::session::{BrowserSession, Control, SessionLauncher};
use crate::config::Config;
use crate::error::{SessionError, SessionResult};

/// 浏览器启动参数
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    chrome_executable: Option<PathBuf>,
    debug_port: Option<u16>,
    request_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            debug_port: config.browser_debug_port,
            request_timeout: Duration::from_secs(config.browser_timeout_secs),
        }
    }

    /// 连接到已开启远程调试的浏览器
    async fn connect(&self, port: u16) -> SessionResult<ChromiumSession> {
        let browser_url = format!("http://localhost:{}", port);
        info!("connecting to browser at {}", browser_url);

        let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
            error!("failed to connect to browser: {}", e);
            SessionError::Launch(format!("connect to {}: {}", browser_url, e))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let page = browser.new_page("about:blank").await?;
        debug!("attached to browser, opened blank page");

        Ok(ChromiumSession {
            browser: Some(browser),
            page,
            handler: handler_task,
            owns_browser: false,
        })
    }

    /// 启动本地浏览器
    async fn launch_local(&self) -> SessionResult<ChromiumSession> {
        info!(
            "launching {} browser",
            if self.headless { "headless" } else { "headed" }
        );

        let mut builder = BrowserConfig::builder();
        builder = if self.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .request_timeout(self.request_timeout)
            .window_size(1920, 1080)
            .args(vec![
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--ignore-certificate-errors",
                "--allow-insecure-localhost",
                "--allow-running-insecure-content",
                "--disable-blink-features=AutomationControlled",
            ])
            .build()
            .map_err(|e| {
                error!("invalid browser configuration: {}", e);
                SessionError::Launch(e)
            })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("failed to launch browser: {}", e);
            SessionError::Launch(e.to_string())
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        sleep(Duration::from_millis(300)).await;

        let page = browser.new_page("about:blank").await?;
        info!("✓ browser started");

        Ok(ChromiumSession {
            browser: Some(browser),
            page,
            handler: handler_task,
            owns_browser: true,
        })
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> SessionResult<ChromiumSession> {
        match self.debug_port {
            Some(port) => self.connect(port).await,
            None => self.launch_local().await,
        }
    }
}

/// 持有唯一的 Page
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    owns_browser: bool,
}

impl ChromiumSession {
    /// 执行 JS 并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, script: &str) -> SessionResult<T> {
        let value = self.evaluate(script).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Control = ChromiumControl;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        if self.browser.is_none() {
            return Err(SessionError::Closed);
        }
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::navigation(url, e))?;
        debug!("navigated to {}", url);
        Ok(())
    }

    async fn find(&self, selector: &str) -> SessionResult<Option<ChromiumControl>> {
        // find_element 对不存在的节点返回协议错误，先在页面里判断是否存在
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        let present: bool = self.eval_as(&script).await?;
        if !present {
            return Ok(None);
        }
        let element = self.page.find_element(selector).await?;
        Ok(Some(ChromiumControl { element }))
    }

    async fn evaluate(&self, script: &str) -> SessionResult<JsonValue> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn title(&self) -> SessionResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn page_source(&self) -> SessionResult<String> {
        Ok(self.page.content().await?)
    }

    async fn screenshot(&self, path: &Path) -> SessionResult<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let result = if self.owns_browser {
            match browser.close().await {
                Ok(_) => browser.wait().await.map(|_| ()).map_err(SessionError::from),
                Err(e) => Err(SessionError::from(e)),
            }
        } else {
            self.page.clone().close().await.map_err(SessionError::from)
        };

        self.handler.abort();
        result
    }
}

/// 页面元素
pub struct ChromiumControl {
    element: Element,
}

#[async_trait]
impl Control for ChromiumControl {
    async fn clear(&self) -> SessionResult<()> {
        self.element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> SessionResult<()> {
        self.element.focus().await?;
        self.element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self) -> SessionResult<()> {
        self.element.click().await?;
        Ok(())
    }
}
