use chrono::{DateTime, Local};

use crate::error::FailureKind;

/// 单次处理尝试的终止结果
///
/// 每次尝试恰好产生一个，由驱动写入运行日志
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub pubchem_id: String,
    pub status: OutcomeStatus,
    pub at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure(FailureKind),
}

impl ProcessingOutcome {
    pub fn success(pubchem_id: impl Into<String>) -> Self {
        Self {
            pubchem_id: pubchem_id.into(),
            status: OutcomeStatus::Success,
            at: Local::now(),
        }
    }

    pub fn failure(pubchem_id: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            pubchem_id: pubchem_id.into(),
            status: OutcomeStatus::Failure(kind),
            at: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            OutcomeStatus::Success => None,
            OutcomeStatus::Failure(kind) => Some(kind),
        }
    }
}
