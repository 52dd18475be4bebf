use std::cmp::Ordering;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 化合物
///
/// 从规范化 SMILES 表读入后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compound {
    #[serde(rename = "PubChem_ID")]
    pub pubchem_id: String,
    #[serde(rename = "Canonical_SMILES")]
    pub canonical_smiles: String,
}

impl Compound {
    pub fn new(pubchem_id: impl Into<String>, canonical_smiles: impl Into<String>) -> Self {
        Self {
            pubchem_id: pubchem_id.into(),
            canonical_smiles: canonical_smiles.into(),
        }
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CID {} ({})", self.pubchem_id, self.canonical_smiles)
    }
}

/// PubChem ID 排序：数字 ID 按数值升序，非数字 ID 排在后面按字典序
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
