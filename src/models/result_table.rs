//! 结果表与汇总行
//!
//! 结果文件中每一行对应网站计算的一项检测：
//! `Classification, Target, Shorthand, Prediction, Probability`

use serde::Serialize;

/// 一行有效检测结果至少包含的字段数
pub const ASSAY_FIELD_COUNT: usize = 5;

/// 单个化合物的完整结果表（页面上所有表格的所有行）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// 丢弃空行
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows.into_iter().filter(|row| !row.is_empty()).collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 至少有一行包含完整的检测字段
    pub fn is_well_formed(&self) -> bool {
        self.rows.iter().any(|row| row.len() >= ASSAY_FIELD_COUNT)
    }

    /// 第一条 Target 等于 `target` 的检测行
    pub fn find_assay(&self, target: &str) -> Option<AssayRow> {
        self.rows
            .iter()
            .filter(|row| row.len() >= ASSAY_FIELD_COUNT)
            .find(|row| row[1].trim() == target)
            .map(|row| AssayRow::from_fields(row))
    }
}

/// 一项检测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssayRow {
    pub classification: String,
    pub target: String,
    pub shorthand: String,
    pub prediction: String,
    pub probability: String,
}

impl AssayRow {
    fn from_fields(fields: &[String]) -> Self {
        Self {
            classification: fields[0].clone(),
            target: fields[1].clone(),
            shorthand: fields[2].clone(),
            prediction: fields[3].clone(),
            probability: fields[4].clone(),
        }
    }
}

/// 汇总表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "PubChem_ID")]
    pub pubchem_id: String,
    #[serde(rename = "Classification")]
    pub classification: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Shorthand")]
    pub shorthand: String,
    #[serde(rename = "Prediction")]
    pub prediction: String,
    #[serde(rename = "Probability")]
    pub probability: String,
}

impl SummaryRow {
    pub fn new(pubchem_id: impl Into<String>, assay: AssayRow) -> Self {
        Self {
            pubchem_id: pubchem_id.into(),
            classification: assay.classification,
            target: assay.target,
            shorthand: assay.shorthand,
            prediction: assay.prediction,
            probability: assay.probability,
        }
    }
}
