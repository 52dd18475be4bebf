//! CSV 表读写
//!
//! 所有输出文件都先完整写入内存，再通过同目录临时文件 + rename 一次性落盘，
//! 读者永远看不到写了一半的文件。

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{AppError, AppResult};
use crate::models::Compound;

pub const PUBCHEM_ID_COLUMN: &str = "PubChem_ID";
pub const SMILES_COLUMN: &str = "SMILES";
pub const CANONICAL_SMILES_COLUMN: &str = "Canonical_SMILES";

/// 规范化表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    #[serde(rename = "PubChem_ID")]
    pub pubchem_id: String,
    #[serde(rename = "Original_SMILES")]
    pub original_smiles: String,
    #[serde(rename = "Canonical_SMILES")]
    pub canonical_smiles: String,
}

/// 读取表中指定的列，按列名定位，缺列报错
pub fn read_columns(path: &Path, columns: &[&str]) -> AppResult<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(AppError::input_missing(path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let index = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == *column)
            .ok_or_else(|| AppError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })?;
        indices.push(index);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = indices
            .iter()
            .map(|&i| record.get(i).unwrap_or_default().to_string())
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// 读取化合物表（PubChem_ID, Canonical_SMILES），跳过没有 ID 的行
pub fn read_compounds(path: &Path) -> AppResult<Vec<Compound>> {
    let rows = read_columns(path, &[PUBCHEM_ID_COLUMN, CANONICAL_SMILES_COLUMN])?;
    Ok(rows
        .into_iter()
        .filter(|row| !row[0].is_empty())
        .map(|mut row| {
            let smiles = row.pop().unwrap_or_default();
            let id = row.pop().unwrap_or_default();
            Compound::new(id, smiles)
        })
        .collect())
}

/// 写化合物表（重试清单与输入表同格式）
pub fn write_compounds(path: &Path, compounds: &[Compound]) -> AppResult<()> {
    write_records(path, compounds)
}

pub fn write_canonical_table(path: &Path, records: &[CanonicalRecord]) -> AppResult<()> {
    write_records(path, records)
}

/// 带表头写出一组可序列化记录
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> AppResult<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    atomic_write(path, &bytes)?;
    Ok(())
}

/// 无表头、行宽不定的原始行
pub fn write_rows(path: &Path, rows: &[Vec<String>]) -> AppResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    atomic_write(path, &bytes)?;
    Ok(())
}

pub fn read_rows(path: &Path) -> AppResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// 同目录临时文件 + fsync + rename
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file_mut().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
