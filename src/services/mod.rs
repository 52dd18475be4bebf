//! 业务能力层
//!
//! 每个服务描述"我能做什么"，不持有浏览器，不关心批处理流程。

pub mod aggregator;
pub mod canonicalizer;
pub mod reconciler;

pub use aggregator::{write_summary, Aggregator, Summary};
pub use canonicalizer::{convert_table, Canonicalizer, CommandCanonicalizer, ConversionStats};
pub use reconciler::{reconcile, save_worklist, ReconcileReport, Reconciler, TempWorklist};
