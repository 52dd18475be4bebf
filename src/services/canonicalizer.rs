//! 规范化服务 - 业务能力层
//!
//! SMILES → 规范 SMILES。化学计算交给外部工具，本模块只负责调用和整表转换。

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::csv_table::{
    self, CanonicalRecord, PUBCHEM_ID_COLUMN, SMILES_COLUMN,
};

/// SMILES 规范化能力；返回 `None` 表示结构无法解析
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    async fn canonicalize(&self, smiles: &str) -> Option<String>;
}

/// 调用外部化学工具（默认 `obabel -ismi -ocan`）
///
/// SMILES 从 stdin 输入，取 stdout 第一行的第一个字段
#[derive(Debug, Clone)]
pub struct CommandCanonicalizer {
    program: String,
    args: Vec<String>,
}

impl CommandCanonicalizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn run(&self, smiles: &str) -> std::io::Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(smiles.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            debug!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(first_token(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl Canonicalizer for CommandCanonicalizer {
    async fn canonicalize(&self, smiles: &str) -> Option<String> {
        match self.run(smiles).await {
            Ok(result) => result,
            Err(e) => {
                warn!("  ✗ Error converting SMILES with {}: {}", self.program, e);
                None
            }
        }
    }
}

/// stdout 第一行的第一个字段（后面可能跟分子标题）
fn first_token(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
}

/// 转换统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
}

/// 把输入表 (PubChem_ID, SMILES) 转换为规范化表
///
/// 空 SMILES 和无法解析的结构计入失败并跳过；没有任何成功时不写输出文件
pub async fn convert_table<C: Canonicalizer + ?Sized>(
    canonicalizer: &C,
    input: &Path,
    output: &Path,
) -> AppResult<ConversionStats> {
    let rows = csv_table::read_columns(input, &[PUBCHEM_ID_COLUMN, SMILES_COLUMN])?;
    let mut stats = ConversionStats {
        total: rows.len(),
        ..Default::default()
    };
    info!("Total compounds in input file: {}", rows.len());

    let mut records = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let (pubchem_id, smiles) = (&row[0], &row[1]);
        info!(
            "[{}/{}] Processing PubChem_ID: {}",
            index + 1,
            rows.len(),
            pubchem_id
        );

        if smiles.is_empty() {
            warn!("  ✗ SMILES is empty");
            stats.failed += 1;
            continue;
        }

        match canonicalizer.canonicalize(smiles).await {
            Some(canonical) => {
                records.push(CanonicalRecord {
                    pubchem_id: pubchem_id.clone(),
                    original_smiles: smiles.clone(),
                    canonical_smiles: canonical,
                });
                stats.converted += 1;
            }
            None => {
                warn!("  ✗ Conversion failed for PubChem_ID {}", pubchem_id);
                stats.failed += 1;
            }
        }
    }

    if records.is_empty() {
        warn!("✗ No results to save");
    } else {
        csv_table::write_canonical_table(output, &records)?;
        info!("✓ Results saved to: {}", output.display());
    }

    Ok(stats)
}
