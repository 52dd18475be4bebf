//! 编排层（Orchestration Layer）
//!
//! ```text
//! orchestrator::BatchRunner (处理 Vec<Compound>，持有浏览器会话)
//!     ↓
//! workflow::CompoundFlow (处理单个 Compound)
//!     ↓
//! infrastructure (运行日志 / 结果文件)
//! ```
//!
//! 只有编排层持有浏览器会话；本层只做调度和统计，不做具体业务判断。

pub mod batch_runner;

pub use batch_runner::{BatchRange, BatchRunner, BatchTotals};
