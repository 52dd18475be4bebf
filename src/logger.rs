//! tracing 初始化
//!
//! 默认 `info` 级别，可通过 `RUST_LOG` 覆盖

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化全局日志；重复调用时忽略
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
