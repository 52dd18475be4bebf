//! 命令行定义

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "protox-batch",
    version,
    about = "Batch toxicity prediction through the ProTox-3 web form"
)]
pub struct Cli {
    /// TOML 配置文件（缺省时读取 ./protox.toml，若存在）
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Convert the input table's SMILES to canonical SMILES
    Convert {
        /// Input table (PubChem_ID, SMILES)
        input: Option<PathBuf>,
        /// Output table (PubChem_ID, Original_SMILES, Canonical_SMILES)
        output: Option<PathBuf>,
    },
    /// Submit compounds [start, end) to the prediction service
    Run {
        /// First index to process (default 0)
        start: Option<usize>,
        /// Index after the last one to process (default: all)
        end: Option<usize>,
        /// Use this compound table instead of the configured canonical table
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Work out which compounds still need processing and write a retry list
    Retry {
        /// Immediately re-run the batch on the computed list
        #[arg(long)]
        auto: bool,
    },
    /// Collect the target assay row of every result file into one summary
    Extract,
}
