//! 应用入口
//!
//! 持有配置、运行日志和结果目录，把命令分派到各层

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::browser::{ChromiumLauncher, SessionLauncher};
use crate::cli::Command;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{csv_table, ResultStore, RunLog};
use crate::models::Compound;
use crate::orchestrator::{BatchRange, BatchRunner, BatchTotals};
use crate::services::{
    convert_table, save_worklist, write_summary, Aggregator, CommandCanonicalizer,
    ConversionStats, ReconcileReport, Reconciler, Summary, TempWorklist,
};
use crate::utils::logging::{banner, log_path, log_step_start, print_final_stats};
use crate::workflow::{CompoundFlow, DriverSettings};

/// 重试清单在控制台最多显示的条数
const RETRY_DISPLAY_LIMIT: usize = 20;

/// 对账命令的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryResult {
    pub report: ReconcileReport,
    /// 仅在 `--auto` 且有需要重试的化合物时存在
    pub retry_totals: Option<BatchTotals>,
}

/// 应用主结构
pub struct App {
    config: Config,
    log: Arc<RunLog>,
    store: ResultStore,
}

impl App {
    /// 初始化应用：创建目录，打开运行日志和结果目录
    pub fn initialize(config: Config) -> Result<Self> {
        config
            .ensure_dirs()
            .context("failed to create data/results/logs directories")?;
        let log = Arc::new(RunLog::new(&config.processing_log_file));
        let store = ResultStore::new(&config.results_dir);
        Ok(Self { config, log, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run_log(&self) -> &Arc<RunLog> {
        &self.log
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// 执行一条命令
    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Convert { input, output } => {
                self.convert(input, output).await?;
            }
            Command::Run { start, end, input } => {
                let range = BatchRange::new(start.unwrap_or(0), end);
                self.run_batch(ChromiumLauncher::from_config(&self.config), range, input.as_deref())
                    .await?;
            }
            Command::Retry { auto } => {
                self.retry(ChromiumLauncher::from_config(&self.config), auto)
                    .await?;
            }
            Command::Extract => {
                self.extract()?;
            }
        }
        Ok(())
    }

    /// 规范化输入表
    pub async fn convert(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<ConversionStats> {
        let input = input.unwrap_or_else(|| self.config.input_file.clone());
        let output = output.unwrap_or_else(|| self.config.canonical_smiles_file.clone());
        log_step_start(
            "Converting SMILES to Canonical SMILES",
            &[
                ("Input file", input.display().to_string()),
                ("Output file", output.display().to_string()),
            ],
        );

        let canonicalizer = CommandCanonicalizer::new(
            self.config.canonicalizer_program.clone(),
            self.config.canonicalizer_args.clone(),
        );
        let stats = convert_table(&canonicalizer, &input, &output)
            .await
            .with_context(|| format!("failed to convert {}", input.display()))?;

        info!("Conversion complete:");
        info!("  Successful: {}", stats.converted);
        info!("  Failed: {}", stats.failed);
        Ok(stats)
    }

    /// 批量处理化合物表中 `range` 区间的化合物
    pub async fn run_batch<L: SessionLauncher>(
        &self,
        launcher: L,
        range: BatchRange,
        input: Option<&Path>,
    ) -> Result<BatchTotals> {
        let input = input.unwrap_or(self.config.canonical_smiles_file.as_path());

        self.log.note("=".repeat(60));
        self.log.note("ProTox-3 Automation Started");
        self.log.note("=".repeat(60));
        self.log.note(format!("  Input file: {}", input.display()));
        self.log
            .note(format!("  Output directory: {}", self.store.dir().display()));
        self.log
            .note(format!("  Log file: {}", self.log.path().display()));
        self.log.note(format!("  Start index: {}", range.start));
        self.log.note(format!(
            "  End index: {}",
            range
                .end
                .map(|e| e.to_string())
                .unwrap_or_else(|| "all".to_string())
        ));

        if !input.exists() {
            self.log
                .note(format!("✗ Input file not found: {}", input.display()));
            self.log
                .note("Run the convert command first to generate canonical SMILES");
            return Err(AppError::input_missing(input).into());
        }

        let compounds = csv_table::read_compounds(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        self.log
            .note(format!("Total compounds in file: {}", compounds.len()));

        let totals = self.process(launcher, &compounds, range).await?;
        self.log.note("Next step: run the extract command to aggregate results");
        Ok(totals)
    }

    /// 对账，写出重试清单；`auto` 时立即在进程内重跑清单中的化合物
    pub async fn retry<L: SessionLauncher>(&self, launcher: L, auto: bool) -> Result<RetryResult> {
        banner("Failed Compounds Analysis");

        let report = Reconciler::new(
            &self.config.canonical_smiles_file,
            self.log.clone(),
            self.store.clone(),
        )
        .analyze()?;

        if report.is_clean() {
            banner("✓ No failed compounds found!");
            info!("All compounds have been successfully processed.");
            let stale = &self.config.failed_list_file;
            if stale.exists() {
                std::fs::remove_file(stale).with_context(|| {
                    format!("failed to remove stale retry list {}", stale.display())
                })?;
                log_path("Removed stale retry list", stale);
            }
            return Ok(RetryResult {
                report,
                retry_totals: None,
            });
        }

        banner(&format!("Found {} failed compounds:", report.worklist.len()));
        log_worklist(&report.worklist);
        save_worklist(&self.config.failed_list_file, &report.worklist)?;

        if !auto {
            banner("Retry later");
            info!("To retry failed compounds, run: protox-batch retry --auto");
            log_path(
                "Or process the saved list with: protox-batch run --input",
                &self.config.failed_list_file,
            );
            return Ok(RetryResult {
                report,
                retry_totals: None,
            });
        }

        banner("Retrying Failed Compounds");
        let totals = {
            let temp = TempWorklist::create(&self.config.temp_retry_file, &report.worklist)?;
            log_path("Retry list", temp.path());
            self.process(launcher, &report.worklist, BatchRange::all())
                .await?
        };

        if totals.failure_count == 0 {
            banner("✓ Retry completed successfully");
        } else {
            banner("⚠ Retry completed with some errors");
        }

        Ok(RetryResult {
            report,
            retry_totals: Some(totals),
        })
    }

    /// 汇总目标检测项
    pub fn extract(&self) -> Result<Summary> {
        let target = &self.config.target_assay;
        log_step_start(
            &format!("Extracting {} Data", target),
            &[
                ("Results directory", self.store.dir().display().to_string()),
                ("Output file", self.config.summary_file.display().to_string()),
            ],
        );

        let summary = Aggregator::new(self.store.clone(), target.clone()).summarize()?;

        if summary.artifacts_scanned == 0 {
            warn!("✗ No CID_*.csv files found in results directory");
            return Ok(summary);
        }
        info!("Found {} CID files", summary.artifacts_scanned);
        info!("Total {} records extracted: {}", target, summary.rows.len());

        if summary.rows.is_empty() {
            warn!("✗ No {} data found", target);
            return Ok(summary);
        }

        write_summary(&self.config.summary_file, &summary.rows)?;
        info!("Statistics:");
        info!("  Total compounds: {}", summary.rows.len());
        info!("  Active: {}", summary.active_count());
        info!("  Inactive: {}", summary.inactive_count());
        if !summary.unreadable.is_empty() {
            warn!("  Unreadable result files: {}", summary.unreadable.len());
        }
        Ok(summary)
    }

    /// 构建批处理器并运行，最后输出统计
    async fn process<L: SessionLauncher>(
        &self,
        launcher: L,
        compounds: &[Compound],
        range: BatchRange,
    ) -> Result<BatchTotals> {
        let flow = CompoundFlow::new(
            DriverSettings::from_config(&self.config),
            self.store.clone(),
            self.log.clone(),
        );
        let runner = BatchRunner::new(launcher, flow, self.log.clone(), self.config.pacing_delay());
        let totals = runner.run(compounds, range).await?;

        self.log.note("=".repeat(60));
        self.log.note("Processing Complete");
        self.log.note("=".repeat(60));
        self.log
            .note(format!("Total processed: {}", totals.processed()));
        self.log.note(format!("Successful: {}", totals.success_count));
        self.log.note(format!("Failed: {}", totals.failure_count));
        print_final_stats(&totals, self.log.path());
        Ok(totals)
    }
}

fn log_worklist(worklist: &[Compound]) {
    for (i, compound) in worklist.iter().take(RETRY_DISPLAY_LIMIT).enumerate() {
        info!("  {}. PubChem_ID: {}", i + 1, compound.pubchem_id);
    }
    if worklist.len() > RETRY_DISPLAY_LIMIT {
        info!("  ... and {} more", worklist.len() - RETRY_DISPLAY_LIMIT);
    }
}
