//! 测试用的脚本化浏览器会话
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use protox_batch::{
    BrowserSession, Control, DriverSettings, SessionError, SessionLauncher, SessionResult,
};
use serde_json::{json, Value as JsonValue};

pub const MARKER: &str = "Toxicity Model Report";
pub const SMILES_INPUT: &str = "#smiles_field";
pub const SMILES_SUBMIT: &str = "#smiles_field ~ input[type='submit']";
pub const SELECT_ALL: &str = "#button_all";
pub const START: &str = "#start_pred";

/// 会话行为脚本
#[derive(Debug, Clone)]
pub struct Script {
    pub navigation_fails: bool,
    /// 页面上不存在的选择器
    pub missing: HashSet<String>,
    /// 点击时报错的选择器
    pub click_faults: HashSet<String>,
    /// 第几次轮询（从 1 开始）起页面出现完成标记；None 表示永不出现
    pub marker_from_poll: Option<usize>,
    /// 第几次轮询（从 1 开始）起读取页面源码报错
    pub page_source_fails_from_poll: Option<usize>,
    /// 提取脚本的返回值
    pub table: JsonValue,
    /// 输入这些 SMILES 后提取结果为空
    pub empty_for: HashSet<String>,
    /// 输入这个 SMILES 时 panic
    pub panic_on: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            navigation_fails: false,
            missing: HashSet::new(),
            click_faults: HashSet::new(),
            marker_from_poll: Some(1),
            page_source_fails_from_poll: None,
            table: cytotoxicity_table("Inactive", "0.62"),
            empty_for: HashSet::new(),
            panic_on: None,
        }
    }
}

pub fn cytotoxicity_table(prediction: &str, probability: &str) -> JsonValue {
    json!([
        ["Classification", "Target", "Shorthand", "Prediction", "Probability"],
        ["Organ toxicity", "Hepatotoxicity", "dili", "Inactive", "0.69"],
        ["Toxicity end points", "Cytotoxicity", "cyto", prediction, probability]
    ])
}

/// 会话上发生过的操作
#[derive(Debug, Default)]
pub struct Recorder {
    pub launches: usize,
    pub closes: usize,
    pub navigations: usize,
    pub page_source_calls: usize,
    pub typed: Vec<String>,
    pub clicks: Vec<String>,
    pub polls_since_start: usize,
}

pub type Shared = Arc<Mutex<Recorder>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Recorder> {
    shared.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct FakeSession {
    script: Script,
    recorder: Shared,
    closed: bool,
}

impl FakeSession {
    pub fn new(script: Script) -> (Self, Shared) {
        let recorder = Shared::default();
        (
            Self {
                script,
                recorder: recorder.clone(),
                closed: false,
            },
            recorder,
        )
    }

    fn last_typed(&self) -> Option<String> {
        lock(&self.recorder).typed.last().cloned()
    }
}

pub struct FakeControl {
    selector: String,
    fault: bool,
    panic_on: Option<String>,
    recorder: Shared,
}

#[async_trait]
impl Control for FakeControl {
    async fn clear(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn type_text(&self, text: &str) -> SessionResult<()> {
        if self.panic_on.as_deref() == Some(text) {
            panic!("scripted panic while typing {}", text);
        }
        lock(&self.recorder).typed.push(text.to_string());
        Ok(())
    }

    async fn click(&self) -> SessionResult<()> {
        if self.fault {
            return Err(SessionError::Script(format!(
                "element {} is detached",
                self.selector
            )));
        }
        let mut recorder = lock(&self.recorder);
        recorder.clicks.push(self.selector.clone());
        if self.selector == START {
            recorder.polls_since_start = 0;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Control = FakeControl;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        lock(&self.recorder).navigations += 1;
        if self.script.navigation_fails {
            return Err(SessionError::navigation(url, "net::ERR_CONNECTION_REFUSED"));
        }
        Ok(())
    }

    async fn find(&self, selector: &str) -> SessionResult<Option<FakeControl>> {
        if self.script.missing.contains(selector) {
            return Ok(None);
        }
        Ok(Some(FakeControl {
            selector: selector.to_string(),
            fault: self.script.click_faults.contains(selector),
            panic_on: self.script.panic_on.clone(),
            recorder: self.recorder.clone(),
        }))
    }

    async fn evaluate(&self, _script: &str) -> SessionResult<JsonValue> {
        match self.last_typed() {
            Some(smiles) if self.script.empty_for.contains(&smiles) => Ok(json!([])),
            _ => Ok(self.script.table.clone()),
        }
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok("http://tox.charite.de/protox3/index.php?site=compound_input".to_string())
    }

    async fn title(&self) -> SessionResult<String> {
        Ok("ProTox-3.0".to_string())
    }

    async fn page_source(&self) -> SessionResult<String> {
        let mut recorder = lock(&self.recorder);
        recorder.page_source_calls += 1;
        recorder.polls_since_start += 1;
        if self
            .script
            .page_source_fails_from_poll
            .is_some_and(|n| recorder.polls_since_start >= n)
        {
            return Err(SessionError::Script("target closed".to_string()));
        }
        let ready = self
            .script
            .marker_from_poll
            .is_some_and(|n| recorder.polls_since_start >= n);
        Ok(if ready {
            format!("<html><h1>{}</h1></html>", MARKER)
        } else {
            "<html><p>Computing...</p></html>".to_string()
        })
    }

    async fn screenshot(&self, _path: &Path) -> SessionResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.recorder).closes += 1;
        }
        Ok(())
    }
}

/// 每次 launch 返回共享同一个记录器的会话
pub struct FakeLauncher {
    script: Script,
    recorder: Shared,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(script: Script) -> (Self, Shared) {
        let recorder = Shared::default();
        (
            Self {
                script,
                recorder: recorder.clone(),
                fail: false,
            },
            recorder,
        )
    }

    pub fn failing() -> (Self, Shared) {
        let (mut launcher, recorder) = Self::new(Script::default());
        launcher.fail = true;
        (launcher, recorder)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> SessionResult<FakeSession> {
        lock(&self.recorder).launches += 1;
        if self.fail {
            return Err(SessionError::Launch("chrome not found".to_string()));
        }
        Ok(FakeSession {
            script: self.script.clone(),
            recorder: self.recorder.clone(),
            closed: false,
        })
    }
}

pub fn recorder(shared: &Shared) -> MutexGuard<'_, Recorder> {
    lock(shared)
}

/// 不等待的流程参数
pub fn fast_settings() -> DriverSettings {
    DriverSettings {
        input_url: "http://tox.charite.de/protox3/index.php?site=compound_input".to_string(),
        smiles_input_selector: SMILES_INPUT.to_string(),
        smiles_submit_selector: SMILES_SUBMIT.to_string(),
        select_all_selector: SELECT_ALL.to_string(),
        start_prediction_selector: START.to_string(),
        completion_marker: MARKER.to_string(),
        element_timeout: Duration::ZERO,
        max_wait: Duration::from_millis(60),
        poll_interval: Duration::from_millis(30),
        submit_settle: Duration::ZERO,
        select_settle: Duration::ZERO,
        screenshot_dir: None,
    }
}
