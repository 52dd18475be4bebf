//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **会话管理**：每批只启动一个浏览器会话，所有化合物复用；
//!    任何退出路径（包括 panic）都会关闭会话，且只关闭一次
//! 2. **顺序处理**：按列表顺序逐个调用 `CompoundFlow`，不并发
//! 3. **节流**：化合物之间固定等待，避免触发网站的防滥用机制
//! 4. **统计**：输出成功/失败累计
//!
//! 单个化合物失败不会中断批次；批次内不重试，重试交给对账服务。

use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tracing::warn;

use crate::browser::{BrowserSession, SessionLauncher};
use crate::error::{AppError, AppResult};
use crate::infrastructure::RunLog;
use crate::models::Compound;
use crate::workflow::CompoundFlow;

/// 处理区间 `[start, end)`，`end` 缺省为列表末尾
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl BatchRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// 截断到列表长度内；start 大于 end 时得到空区间
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let end = self.end.unwrap_or(len).min(len);
        let start = self.start.min(end);
        start..end
    }
}

/// 批处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchTotals {
    pub fn processed(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// 批量处理器
pub struct BatchRunner<L: SessionLauncher> {
    launcher: L,
    flow: CompoundFlow,
    log: Arc<RunLog>,
    pacing_delay: Duration,
}

impl<L: SessionLauncher> BatchRunner<L> {
    pub fn new(launcher: L, flow: CompoundFlow, log: Arc<RunLog>, pacing_delay: Duration) -> Self {
        Self {
            launcher,
            flow,
            log,
            pacing_delay,
        }
    }

    /// 处理区间内的化合物
    ///
    /// 只有无法获得浏览器会话时返回错误
    pub async fn run(&self, compounds: &[Compound], range: BatchRange) -> AppResult<BatchTotals> {
        let range = range.resolve(compounds.len());
        let selected = &compounds[range.clone()];
        self.log.note(format!(
            "Processing compounds {} to {} ({} compounds)",
            range.start,
            range.end,
            selected.len()
        ));

        if selected.is_empty() {
            warn!("nothing to process in range {:?}", range);
            return Ok(BatchTotals::default());
        }

        let mut session = self.launcher.launch().await.map_err(|e| {
            self.log
                .note(format!("✗ Failed to start browser session: {}", e));
            AppError::SessionUnavailable(e)
        })?;
        self.log.note("✓ Browser session started");

        let result = AssertUnwindSafe(self.process_all(&mut session, selected, range))
            .catch_unwind()
            .await;

        if let Err(e) = session.close().await {
            warn!("failed to close browser session cleanly: {}", e);
        }
        self.log.note("Browser session closed");

        match result {
            Ok(totals) => Ok(totals),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn process_all(
        &self,
        session: &mut L::Session,
        selected: &[Compound],
        range: Range<usize>,
    ) -> BatchTotals {
        let mut totals = BatchTotals::default();

        for (offset, compound) in selected.iter().enumerate() {
            if offset > 0 && !self.pacing_delay.is_zero() {
                sleep(self.pacing_delay).await;
            }

            self.log.note(format!(
                "[{}/{}] Processing compound {}",
                range.start + offset + 1,
                range.end,
                compound.pubchem_id
            ));

            let outcome = self.flow.process(session, compound).await;
            if outcome.is_success() {
                totals.success_count += 1;
            } else {
                totals.failure_count += 1;
            }

            self.log.note(format!(
                "Running totals: {} succeeded, {} failed, {} remaining",
                totals.success_count,
                totals.failure_count,
                selected.len() - offset - 1
            ));
        }

        totals
    }
}
