//! 日志工具模块
//!
//! 提供控制台横幅和文本截断的辅助函数

use std::path::Path;

use tracing::info;

use crate::orchestrator::BatchTotals;

/// 打印分隔横幅
pub fn banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("{}", title);
    info!("{}", "=".repeat(60));
}

/// 打印单个步骤的开头
///
/// # 参数
/// - `step`: 步骤名称
/// - `entries`: (标签, 值) 列表
pub fn log_step_start(step: &str, entries: &[(&str, String)]) {
    banner(step);
    for (label, value) in entries {
        info!("{}: {}", label, value);
    }
}

/// 打印路径
pub fn log_path(label: &str, path: &Path) {
    info!("{}: {}", label, path.display());
}

/// 打印批处理最终统计
///
/// # 参数
/// - `totals`: 成功/失败数量
/// - `log_file_path`: 运行日志路径
pub fn print_final_stats(totals: &BatchTotals, log_file_path: &Path) {
    info!("{}", "=".repeat(60));
    info!("📊 Processing Complete");
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("Total processed: {}", totals.processed());
    info!("✅ Successful: {}", totals.success_count);
    info!("❌ Failed: {}", totals.failure_count);
    info!("{}", "=".repeat(60));
    info!("Run log saved to: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
