//! 汇总服务 - 业务能力层
//!
//! 从每个结果文件中取出目标检测项那一行，合并为一张汇总表。
//! 结果文件里没有目标检测项不算错误，该化合物直接不出现在汇总中。

use std::path::Path;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::{csv_table, ResultStore};
use crate::models::SummaryRow;

/// 汇总结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    /// 扫描到的结果文件数
    pub artifacts_scanned: usize,
    /// 读取失败而被跳过的 ID
    pub unreadable: Vec<String>,
}

impl Summary {
    pub fn active_count(&self) -> usize {
        self.count_prediction("Active")
    }

    pub fn inactive_count(&self) -> usize {
        self.count_prediction("Inactive")
    }

    fn count_prediction(&self, prediction: &str) -> usize {
        self.rows
            .iter()
            .filter(|row| row.prediction.trim() == prediction)
            .count()
    }
}

/// 汇总服务
pub struct Aggregator {
    store: ResultStore,
    target_assay: String,
}

impl Aggregator {
    pub fn new(store: ResultStore, target_assay: impl Into<String>) -> Self {
        Self {
            store,
            target_assay: target_assay.into(),
        }
    }

    pub fn target_assay(&self) -> &str {
        &self.target_assay
    }

    /// 按文件名顺序扫描所有结果文件
    pub fn summarize(&self) -> AppResult<Summary> {
        let ids = self.store.list()?;
        let mut summary = Summary {
            artifacts_scanned: ids.len(),
            ..Default::default()
        };

        for id in ids {
            let table = match self.store.read(&id) {
                Ok(table) => table,
                Err(e) => {
                    warn!("  ✗ Error reading result file for CID {}: {}", id, e);
                    summary.unreadable.push(id);
                    continue;
                }
            };

            match table.find_assay(&self.target_assay) {
                Some(assay) => {
                    info!(
                        "  ✓ CID {}: {} = {} ({})",
                        id, assay.target, assay.prediction, assay.probability
                    );
                    summary.rows.push(SummaryRow::new(id, assay));
                }
                None => info!("  CID {}: no {} row", id, self.target_assay),
            }
        }

        Ok(summary)
    }
}

/// 写汇总表
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> AppResult<()> {
    csv_table::write_records(path, rows)?;
    info!("✓ Summary file saved: {}", path.display());
    Ok(())
}
