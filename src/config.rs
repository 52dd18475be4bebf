use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// 默认配置文件名（存在时自动加载）
pub const DEFAULT_CONFIG_FILE: &str = "protox.toml";

/// 程序配置文件
///
/// 优先级：默认值 < TOML 文件 < 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 项目根目录，其余相对路径都基于它
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// 原始输入表 (PubChem_ID, SMILES)
    pub input_file: PathBuf,
    /// 规范化后的输入表 (PubChem_ID, Original_SMILES, Canonical_SMILES)
    pub canonical_smiles_file: PathBuf,
    pub summary_file: PathBuf,
    pub processing_log_file: PathBuf,
    pub failed_list_file: PathBuf,
    pub temp_retry_file: PathBuf,
    pub debug_screenshot_dir: PathBuf,

    // --- 目标网站 ---
    pub protox_input_url: String,
    pub smiles_input_selector: String,
    pub smiles_submit_selector: String,
    pub select_all_selector: String,
    pub start_prediction_selector: String,
    pub completion_marker: String,
    /// 汇总时要提取的目标检测项
    pub target_assay: String,

    // --- 时间控制（秒） ---
    pub max_wait_secs: u64,
    pub poll_interval_secs: u64,
    pub element_timeout_secs: u64,
    pub browser_timeout_secs: u64,
    pub pacing_delay_secs: u64,
    pub submit_settle_secs: u64,
    pub select_settle_secs: u64,

    // --- 浏览器 ---
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// 设置后连接已有浏览器，而不是启动新的
    pub browser_debug_port: Option<u16>,
    pub debug_mode: bool,

    // --- 规范化工具 ---
    pub canonicalizer_program: String,
    pub canonicalizer_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            logs_dir: PathBuf::from("logs"),
            input_file: PathBuf::from("data/input.csv"),
            canonical_smiles_file: PathBuf::from("data/canonical_smiles.csv"),
            summary_file: PathBuf::from("results/cytotoxicity_summary.csv"),
            processing_log_file: PathBuf::from("logs/processing_log.txt"),
            failed_list_file: PathBuf::from("data/failed_compounds.csv"),
            temp_retry_file: PathBuf::from("data/temp_retry_input.csv"),
            debug_screenshot_dir: PathBuf::from("results/debug_screenshots"),
            protox_input_url: "http://tox.charite.de/protox3/index.php?site=compound_input"
                .to_string(),
            smiles_input_selector: "#smiles_field".to_string(),
            smiles_submit_selector: "#smiles_field ~ input[type='submit']".to_string(),
            select_all_selector: "#button_all".to_string(),
            start_prediction_selector: "#start_pred".to_string(),
            completion_marker: "Toxicity Model Report".to_string(),
            target_assay: "Cytotoxicity".to_string(),
            max_wait_secs: 900,
            poll_interval_secs: 30,
            element_timeout_secs: 20,
            browser_timeout_secs: 30,
            pacing_delay_secs: 5,
            submit_settle_secs: 2,
            select_settle_secs: 1,
            headless: true,
            chrome_executable: None,
            browser_debug_port: None,
            debug_mode: false,
            canonicalizer_program: "obabel".to_string(),
            canonicalizer_args: vec!["-ismi".to_string(), "-ocan".to_string()],
        }
    }
}

impl Config {
    /// 加载配置：显式路径 > 当前目录下的 protox.toml > 默认值，最后叠加环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(p) => Self::from_toml_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(config.with_env_overrides()?.resolved())
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::input_missing(path));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 用环境变量覆盖配置
    pub fn with_env_overrides(mut self) -> AppResult<Self> {
        if let Ok(v) = std::env::var("PROTOX_BASE_DIR") {
            self.base_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PROTOX_INPUT_URL") {
            self.protox_input_url = v;
        }
        if let Ok(v) = std::env::var("PROTOX_TARGET_ASSAY") {
            self.target_assay = v;
        }
        if let Ok(v) = std::env::var("PROTOX_CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = parse_env("PROTOX_MAX_WAIT_SECS")? {
            self.max_wait_secs = v;
        }
        if let Some(v) = parse_env("PROTOX_POLL_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = parse_env("PROTOX_HEADLESS")? {
            self.headless = v;
        }
        if let Some(v) = parse_env("PROTOX_DEBUG")? {
            self.debug_mode = v;
        }
        if let Some(v) = parse_env("PROTOX_BROWSER_DEBUG_PORT")? {
            self.browser_debug_port = Some(v);
        }
        Ok(self)
    }

    /// 把所有相对路径解析到 base_dir 下
    pub fn resolved(mut self) -> Self {
        let base = self.base_dir.clone();
        for path in [
            &mut self.data_dir,
            &mut self.results_dir,
            &mut self.logs_dir,
            &mut self.input_file,
            &mut self.canonical_smiles_file,
            &mut self.summary_file,
            &mut self.processing_log_file,
            &mut self.failed_list_file,
            &mut self.temp_retry_file,
            &mut self.debug_screenshot_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// 创建数据、结果和日志目录
    pub fn ensure_dirs(&self) -> AppResult<()> {
        for dir in [&self.data_dir, &self.results_dir, &self.logs_dir] {
            std::fs::create_dir_all(dir)?;
        }
        if self.debug_mode {
            std::fs::create_dir_all(&self.debug_screenshot_dir)?;
        }
        Ok(())
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.pacing_delay_secs)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| {
            AppError::Config(format!(
                "environment variable {} has invalid value '{}'",
                var_name, value
            ))
        }),
        Err(_) => Ok(None),
    }
}
