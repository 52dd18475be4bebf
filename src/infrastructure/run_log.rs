//! 运行日志 - 基础设施层
//!
//! 只追加、按行记录的文本日志。驱动写入状态变化和每个化合物的终止结果，
//! 对账服务重新读取整份日志，只依赖终止标记，不依赖其余文字。

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::ProcessingOutcome;

/// 运行日志
///
/// 同一进程内的追加通过内部锁串行化；不支持多进程同时写同一文件。
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条带时间戳的消息，同时输出到 tracing
    pub fn append(&self, message: impl AsRef<str>) -> AppResult<()> {
        let message = message.as_ref();
        info!("{}", message);

        let line = format!(
            "[{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// 追加消息；写盘失败只记警告，不影响当前化合物的处理
    pub fn note(&self, message: impl AsRef<str>) {
        if let Err(e) = self.append(message.as_ref()) {
            warn!("failed to append to run log {}: {}", self.path.display(), e);
        }
    }

    /// 记录终止结果（对账服务依赖的标记行）
    pub fn record_outcome(&self, outcome: &ProcessingOutcome) -> AppResult<()> {
        self.append(outcome_marker(outcome))
    }

    /// 重新读取整份日志；文件不存在时视为空
    pub fn read_history(&self) -> AppResult<LogHistory> {
        if !self.path.exists() {
            warn!("run log not found: {}", self.path.display());
            return Ok(LogHistory::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(LogHistory::parse(&content))
    }
}

/// 终止结果的标记行
pub fn outcome_marker(outcome: &ProcessingOutcome) -> String {
    if outcome.is_success() {
        format!("✓ Compound {} processed successfully", outcome.pubchem_id)
    } else {
        format!("✗ Compound {} processing failed", outcome.pubchem_id)
    }
}

fn success_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"✓ Compound (\d+) processed successfully").expect("valid success pattern")
    })
}

fn failure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"✗ Compound (\d+) processing failed").expect("valid failure pattern")
    })
}

/// 日志折叠结果
///
/// 同一 ID 只要出现过成功，就从失败集合中移除
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogHistory {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

impl LogHistory {
    pub fn parse(content: &str) -> Self {
        let mut succeeded = BTreeSet::new();
        let mut failed = BTreeSet::new();

        for line in content.lines() {
            if let Some(caps) = success_pattern().captures(line) {
                succeeded.insert(caps[1].to_string());
            }
            if let Some(caps) = failure_pattern().captures(line) {
                failed.insert(caps[1].to_string());
            }
        }

        failed.retain(|id| !succeeded.contains(id));
        Self { succeeded, failed }
    }
}
