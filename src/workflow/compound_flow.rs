//! 化合物处理流程 - 流程层
//!
//! 核心职责：驱动网站完成"一个化合物"的预测
//!
//! 状态顺序（任一步失败立即进入 Failed，不在流程内部重试）：
//! 1. Idle → FormLoaded：打开输入页并等待 SMILES 输入框
//! 2. FormLoaded → StructureSubmitted：填写 SMILES 并提交结构
//! 3. StructureSubmitted → PanelSelected：选择全部检测项
//! 4. PanelSelected → PredictionStarted：开始预测
//! 5. PredictionStarted → Completed：轮询完成标记，提取结果表并写文件

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::session::FIND_RETRY_INTERVAL;
use crate::browser::{BrowserSession, Control};
use crate::config::Config;
use crate::error::{FailureKind, SessionError};
use crate::infrastructure::{ResultStore, RunLog};
use crate::models::{Compound, ProcessingOutcome, ResultTable};
use crate::utils::logging::truncate_text;

/// 读取页面上所有表格的所有行（td/th 文本），返回二维数组
pub const EXTRACT_TABLES_JS: &str = r#"
(() => {
    const allData = [];
    document.querySelectorAll('table').forEach(table => {
        table.querySelectorAll('tr').forEach(row => {
            const cells = row.querySelectorAll('td, th');
            if (cells.length > 0) {
                const rowData = [];
                cells.forEach(cell => rowData.push(cell.textContent.trim()));
                allData.push(rowData);
            }
        });
    });
    return allData;
})()
"#;

const PAGE_PREVIEW_CHARS: usize = 500;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    FormLoaded,
    StructureSubmitted,
    PanelSelected,
    PredictionStarted,
    Completed,
    Failed(FailureKind),
}

impl DriverState {
    pub fn name(&self) -> &'static str {
        match self {
            DriverState::Idle => "Idle",
            DriverState::FormLoaded => "FormLoaded",
            DriverState::StructureSubmitted => "StructureSubmitted",
            DriverState::PanelSelected => "PanelSelected",
            DriverState::PredictionStarted => "PredictionStarted",
            DriverState::Completed => "Completed",
            DriverState::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Completed | DriverState::Failed(_))
    }
}

impl Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverState::Failed(kind) => write!(f, "Failed({:?})", kind),
            other => f.write_str(other.name()),
        }
    }
}

/// 单步失败
#[derive(Debug)]
struct StepFailure {
    kind: FailureKind,
    detail: String,
}

impl StepFailure {
    fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// 浏览器层的意外错误，带上触发时的状态
    fn fault(state: DriverState, err: SessionError) -> Self {
        Self::new(
            FailureKind::DriverException,
            format!("browser fault in state {}: {}", state.name(), err),
        )
    }

    /// 等待元素失败：超时归为 `on_timeout`，其他错误归为意外错误
    fn wait(state: DriverState, on_timeout: FailureKind, err: SessionError) -> Self {
        match err {
            SessionError::WaitTimeout { .. } => Self::new(on_timeout, err.to_string()),
            other => Self::fault(state, other),
        }
    }
}

/// 流程参数
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub input_url: String,
    pub smiles_input_selector: String,
    pub smiles_submit_selector: String,
    pub select_all_selector: String,
    pub start_prediction_selector: String,
    pub completion_marker: String,
    pub element_timeout: Duration,
    pub max_wait: Duration,
    pub poll_interval: Duration,
    pub submit_settle: Duration,
    pub select_settle: Duration,
    /// 设置后在输入页加载完成时截图
    pub screenshot_dir: Option<PathBuf>,
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_url: config.protox_input_url.clone(),
            smiles_input_selector: config.smiles_input_selector.clone(),
            smiles_submit_selector: config.smiles_submit_selector.clone(),
            select_all_selector: config.select_all_selector.clone(),
            start_prediction_selector: config.start_prediction_selector.clone(),
            completion_marker: config.completion_marker.clone(),
            element_timeout: config.element_timeout(),
            max_wait: config.max_wait(),
            poll_interval: config.poll_interval(),
            submit_settle: Duration::from_secs(config.submit_settle_secs),
            select_settle: Duration::from_secs(config.select_settle_secs),
            screenshot_dir: config
                .debug_mode
                .then(|| config.debug_screenshot_dir.clone()),
        }
    }
}

/// 化合物处理流程
///
/// - 不持有浏览器，只借用编排层传入的会话
/// - 每次调用恰好向运行日志追加一个终止结果
/// - 成功时写一个结果文件，失败时不写
pub struct CompoundFlow {
    settings: DriverSettings,
    store: ResultStore,
    log: Arc<RunLog>,
}

impl CompoundFlow {
    pub fn new(settings: DriverSettings, store: ResultStore, log: Arc<RunLog>) -> Self {
        Self {
            settings,
            store,
            log,
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// 处理一个化合物，返回终止结果
    pub async fn process<S: BrowserSession>(
        &self,
        session: &mut S,
        compound: &Compound,
    ) -> ProcessingOutcome {
        self.log.note(format!(
            "Processing compound: PubChem_ID={}",
            compound.pubchem_id
        ));

        let mut state = DriverState::Idle;
        while !state.is_terminal() {
            let step = match state {
                DriverState::Idle => self.load_form(session, compound).await,
                DriverState::FormLoaded => self.submit_structure(session, compound).await,
                DriverState::StructureSubmitted => self.select_panel(session).await,
                DriverState::PanelSelected => self.start_prediction(session).await,
                DriverState::PredictionStarted => self.collect_results(session, compound).await,
                DriverState::Completed | DriverState::Failed(_) => break,
            };

            state = match step {
                Ok(next) => {
                    debug!("CID {}: {} -> {}", compound.pubchem_id, state, next);
                    next
                }
                Err(failure) => {
                    self.log.note(format!(
                        "  ✗ {} ({}): {}",
                        failure.kind,
                        state.name(),
                        failure.detail
                    ));
                    DriverState::Failed(failure.kind)
                }
            };
        }

        let outcome = match state {
            DriverState::Failed(kind) => ProcessingOutcome::failure(&compound.pubchem_id, kind),
            _ => ProcessingOutcome::success(&compound.pubchem_id),
        };
        if let Err(e) = self.log.record_outcome(&outcome) {
            warn!(
                "failed to record outcome for CID {}: {}",
                compound.pubchem_id, e
            );
        }
        outcome
    }

    /// 1. 打开输入页
    async fn load_form<S: BrowserSession>(
        &self,
        session: &mut S,
        compound: &Compound,
    ) -> Result<DriverState, StepFailure> {
        let state = DriverState::Idle;
        self.log
            .note(format!("  Navigating to {}", self.settings.input_url));

        session
            .navigate(&self.settings.input_url)
            .await
            .map_err(|e| match e {
                SessionError::Navigation { .. } => {
                    StepFailure::new(FailureKind::NavigationError, e.to_string())
                }
                other => StepFailure::fault(state, other),
            })?;

        let url = session
            .current_url()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        let title = session
            .title()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        self.log.note(format!("  Current URL: {}", url));
        self.log.note(format!("  Page title: {}", title));

        if let Some(dir) = &self.settings.screenshot_dir {
            let path = dir.join(format!("debug_{}_page.png", compound.pubchem_id));
            match session.screenshot(&path).await {
                Ok(()) => self
                    .log
                    .note(format!("  Screenshot saved: {}", path.display())),
                Err(e) => warn!("failed to save screenshot {}: {}", path.display(), e),
            }
        }

        if let Err(e) = session
            .wait_for(
                &self.settings.smiles_input_selector,
                self.settings.element_timeout,
            )
            .await
        {
            self.log.note("  ✗ Timeout waiting for SMILES input field");
            if let Ok(source) = session.page_source().await {
                self.log.note(format!(
                    "  Page source preview: {}",
                    truncate_text(&source, PAGE_PREVIEW_CHARS)
                ));
            }
            return Err(StepFailure::wait(state, FailureKind::NavigationError, e));
        }

        Ok(DriverState::FormLoaded)
    }

    /// 2. 填写 SMILES 并提交结构
    async fn submit_structure<S: BrowserSession>(
        &self,
        session: &mut S,
        compound: &Compound,
    ) -> Result<DriverState, StepFailure> {
        let state = DriverState::FormLoaded;
        let timeout = self.settings.element_timeout;

        self.log.note("  Filling SMILES input field...");
        let input = session
            .wait_for(&self.settings.smiles_input_selector, timeout)
            .await
            .map_err(|e| StepFailure::wait(state, FailureKind::ControlNotFound, e))?;
        input
            .clear()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        input
            .type_text(&compound.canonical_smiles)
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        self.log.note("  ✓ SMILES input filled");

        let submit = session
            .wait_for(&self.settings.smiles_submit_selector, timeout)
            .await
            .map_err(|e| StepFailure::wait(state, FailureKind::ControlNotFound, e))?;
        submit
            .click()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        sleep(self.settings.submit_settle).await;
        self.log.note("  ✓ SMILES button clicked");

        Ok(DriverState::StructureSubmitted)
    }

    /// 3. 选择全部检测项
    async fn select_panel<S: BrowserSession>(
        &self,
        session: &mut S,
    ) -> Result<DriverState, StepFailure> {
        let state = DriverState::StructureSubmitted;
        let all_button = session
            .wait_for(
                &self.settings.select_all_selector,
                self.settings.element_timeout,
            )
            .await
            .map_err(|e| StepFailure::wait(state, FailureKind::ControlNotFound, e))?;
        all_button
            .click()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        sleep(self.settings.select_settle).await;
        self.log.note("  ✓ All button clicked");

        Ok(DriverState::PanelSelected)
    }

    /// 4. 开始预测
    async fn start_prediction<S: BrowserSession>(
        &self,
        session: &mut S,
    ) -> Result<DriverState, StepFailure> {
        let state = DriverState::PanelSelected;
        let start_button = session
            .wait_for(
                &self.settings.start_prediction_selector,
                self.settings.element_timeout,
            )
            .await
            .map_err(|e| StepFailure::wait(state, FailureKind::ControlNotFound, e))?;
        start_button
            .click()
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        self.log
            .note("  ✓ Start button clicked, waiting for results...");

        Ok(DriverState::PredictionStarted)
    }

    /// 5. 轮询完成标记，提取并保存结果
    async fn collect_results<S: BrowserSession>(
        &self,
        session: &mut S,
        compound: &Compound,
    ) -> Result<DriverState, StepFailure> {
        let state = DriverState::PredictionStarted;

        if !self.wait_for_completion(session).await? {
            return Err(StepFailure::new(
                FailureKind::Timeout,
                format!(
                    "completion marker not seen within {:?}",
                    self.settings.max_wait
                ),
            ));
        }
        self.log.note("  ✓ Results page loaded");

        let raw = session
            .evaluate(EXTRACT_TABLES_JS)
            .await
            .map_err(|e| StepFailure::fault(state, e))?;
        let table = ResultTable::new(parse_rows(&raw));
        if !table.is_well_formed() {
            return Err(StepFailure::new(
                FailureKind::ExtractionEmpty,
                format!("extracted {} rows, none with assay fields", table.rows().len()),
            ));
        }

        let path = self
            .store
            .write(&compound.pubchem_id, &table)
            .map_err(|e| StepFailure::new(FailureKind::ArtifactWrite, e.to_string()))?;
        self.log
            .note(format!("  ✓ Saved report to: {}", path.display()));

        Ok(DriverState::Completed)
    }

    /// 每隔一个间隔检查一次，最多等待 max_wait；返回是否看到完成标记
    async fn wait_for_completion<S: BrowserSession>(
        &self,
        session: &S,
    ) -> Result<bool, StepFailure> {
        let max_wait = self.settings.max_wait;
        let interval = if self.settings.poll_interval.is_zero() {
            FIND_RETRY_INTERVAL
        } else {
            self.settings.poll_interval
        };

        let mut waited = Duration::ZERO;
        while waited < max_wait {
            sleep(interval).await;
            waited += interval;
            self.log
                .note(format!("  Waiting... ({:?}/{:?})", waited, max_wait));

            let source = session
                .page_source()
                .await
                .map_err(|e| StepFailure::fault(DriverState::PredictionStarted, e))?;
            if source.contains(&self.settings.completion_marker) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// 把提取脚本的返回值转换为行；非数组的部分忽略
pub fn parse_rows(value: &JsonValue) -> Vec<Vec<String>> {
    let Some(rows) = value.as_array() else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(JsonValue::as_array)
        .map(|cells| {
            cells
                .iter()
                .map(|cell| match cell {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}
