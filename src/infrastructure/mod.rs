//! 基础设施层
//!
//! 持有文件资源（运行日志、结果目录、CSV 表），只暴露读写能力，
//! 不关心处理流程。

pub mod csv_table;
pub mod result_store;
pub mod run_log;

pub use result_store::ResultStore;
pub use run_log::{LogHistory, RunLog};
