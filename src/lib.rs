//! # ProTox Batch
//!
//! 通过 ProTox-3 网页表单批量预测化合物毒性
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 浏览器会话抽象与 Chromium 实现，只暴露页面操作能力
//! - `infrastructure/` - 运行日志、结果文件、CSV 表的读写
//!
//! ### ② 业务能力层（Services）
//! - `Reconciler` - 对照日志与结果文件，计算需要重试的化合物
//! - `Aggregator` - 从结果文件汇总目标检测项
//! - `Canonicalizer` - SMILES 规范化
//!
//! ### ③ 流程层（Workflow）
//! - `CompoundFlow` - 单个化合物的状态机（打开表单 → 提交结构 → 选择检测项 → 开始预测 → 轮询提取）
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchRunner` - 持有浏览器会话，按顺序处理一批化合物

pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::{BrowserSession, ChromiumLauncher, Control, SessionLauncher};
pub use config::Config;
pub use error::{AppError, AppResult, FailureKind, SessionError, SessionResult};
pub use infrastructure::{LogHistory, ResultStore, RunLog};
pub use models::{Compound, ProcessingOutcome, ResultTable, SummaryRow};
pub use orchestrator::{BatchRange, BatchRunner, BatchTotals};
pub use services::{reconcile, Aggregator, Reconciler};
pub use workflow::{CompoundFlow, DriverSettings, DriverState};
