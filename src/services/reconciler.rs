//! 对账服务 - 业务能力层
//!
//! 从两份独立的证据（运行日志、结果文件）计算仍需处理的化合物：
//! - 没有完整结果文件的一律需要重试，不管日志怎么说
//! - 日志中记为失败且从未成功的需要重试
//! - 有结果文件且日志中成功过的视为完成
//!
//! 每次都从头计算，结果与运行多少次、中断在哪里无关。

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::{csv_table, LogHistory, ResultStore, RunLog};
use crate::models::{compare_ids, Compound};

/// 计算需要重试的化合物，按 ID 数值升序
pub fn reconcile(
    all_compounds: &[Compound],
    history: &LogHistory,
    artifacts: &BTreeSet<String>,
) -> Vec<Compound> {
    let mut seen = BTreeSet::new();
    let mut failed: Vec<Compound> = all_compounds
        .iter()
        .filter(|c| seen.insert(c.pubchem_id.clone()))
        .filter(|c| {
            let id = c.pubchem_id.as_str();
            let has_artifact = artifacts.contains(id);
            let marked_failed = history.failed.contains(id);
            let marked_success = history.succeeded.contains(id);
            !has_artifact || (marked_failed && !marked_success)
        })
        .cloned()
        .collect();

    failed.sort_by(|a, b| compare_ids(&a.pubchem_id, &b.pubchem_id));
    failed
}

/// 对账结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub total_inputs: usize,
    pub succeeded_in_log: usize,
    pub failed_in_log: usize,
    pub artifacts_present: usize,
    pub worklist: Vec<Compound>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.worklist.is_empty()
    }
}

/// 对账服务
pub struct Reconciler {
    input_file: PathBuf,
    log: Arc<RunLog>,
    store: ResultStore,
}

impl Reconciler {
    pub fn new(input_file: impl Into<PathBuf>, log: Arc<RunLog>, store: ResultStore) -> Self {
        Self {
            input_file: input_file.into(),
            log,
            store,
        }
    }

    /// 读取三份输入并计算重试清单；输入表缺失时报错
    pub fn analyze(&self) -> AppResult<ReconcileReport> {
        info!("Reading input file: {}", self.input_file.display());
        let all_compounds = csv_table::read_compounds(&self.input_file)?;
        info!("  Total compounds in input: {}", all_compounds.len());

        info!("Analyzing log file: {}", self.log.path().display());
        let history = self.log.read_history()?;
        info!("  Successful from log: {}", history.succeeded.len());
        info!("  Failed from log: {}", history.failed.len());

        info!("Checking results directory: {}", self.store.dir().display());
        let artifacts = self.store.completed_ids()?;
        info!("  Compounds with result files: {}", artifacts.len());

        let worklist = reconcile(&all_compounds, &history, &artifacts);
        Ok(ReconcileReport {
            total_inputs: all_compounds.len(),
            succeeded_in_log: history.succeeded.len(),
            failed_in_log: history.failed.len(),
            artifacts_present: artifacts.len(),
            worklist,
        })
    }
}

/// 写出重试清单（与输入表同格式）
pub fn save_worklist(path: &Path, worklist: &[Compound]) -> AppResult<()> {
    csv_table::write_compounds(path, worklist)?;
    info!("✓ Failed compounds list saved to: {}", path.display());
    Ok(())
}

/// 临时重试清单，离开作用域时删除
pub struct TempWorklist {
    path: PathBuf,
}

impl TempWorklist {
    pub fn create(path: impl Into<PathBuf>, worklist: &[Compound]) -> AppResult<Self> {
        let path = path.into();
        save_worklist(&path, worklist)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWorklist {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => info!("Temporary file removed: {}", self.path.display()),
                Err(e) => warn!(
                    "failed to remove temporary file {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}
