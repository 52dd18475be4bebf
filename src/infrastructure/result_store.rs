//! 结果文件存储 - 基础设施层
//!
//! 每个化合物一个 `CID_<id>.csv`。文件存在且含有检测项行才表示该化合物处理完成。

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::infrastructure::csv_table;
use crate::models::ResultTable;

const FILE_PREFIX: &str = "CID_";
const FILE_SUFFIX: &str = ".csv";

/// 结果文件存储
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, pubchem_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, pubchem_id, FILE_SUFFIX))
    }

    pub fn exists(&self, pubchem_id: &str) -> bool {
        self.path_for(pubchem_id).is_file()
    }

    /// 原子写入结果文件，返回文件路径
    pub fn write(&self, pubchem_id: &str, table: &ResultTable) -> AppResult<PathBuf> {
        let path = self.path_for(pubchem_id);
        csv_table::write_rows(&path, table.rows())?;
        debug!("wrote {} rows to {}", table.rows().len(), path.display());
        Ok(path)
    }

    pub fn read(&self, pubchem_id: &str) -> AppResult<ResultTable> {
        Ok(ResultTable::new(csv_table::read_rows(
            &self.path_for(pubchem_id),
        )?))
    }

    /// 按文件名排序列出所有结果文件的 ID；目录不存在时视为空
    pub fn list(&self) -> AppResult<Vec<String>> {
        if !self.dir.exists() {
            warn!("results directory not found: {}", self.dir.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if parse_file_name(&name).is_some() {
                names.push(name);
            }
        }
        names.sort();

        Ok(names
            .iter()
            .filter_map(|name| parse_file_name(name))
            .map(str::to_string)
            .collect())
    }

    pub fn ids(&self) -> AppResult<BTreeSet<String>> {
        Ok(self.list()?.into_iter().collect())
    }

    /// 内容完整的结果文件的 ID；空文件、只有标题或无法解析的文件不算完成
    pub fn completed_ids(&self) -> AppResult<BTreeSet<String>> {
        let mut completed = BTreeSet::new();
        for id in self.list()? {
            match self.read(&id) {
                Ok(table) if table.is_well_formed() => {
                    completed.insert(id);
                }
                Ok(_) => warn!(
                    "malformed result file ignored: {}",
                    self.path_for(&id).display()
                ),
                Err(e) => warn!(
                    "unreadable result file ignored: {}: {}",
                    self.path_for(&id).display(),
                    e
                ),
            }
        }
        Ok(completed)
    }
}

/// `CID_1001.csv` -> `1001`
fn parse_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|id| !id.is_empty())
}
