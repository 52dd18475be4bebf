pub mod compound;
pub mod outcome;
pub mod result_table;

pub use compound::{compare_ids, Compound};
pub use outcome::{OutcomeStatus, ProcessingOutcome};
pub use result_table::{AssayRow, ResultTable, SummaryRow, ASSAY_FIELD_COUNT};
