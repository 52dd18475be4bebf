pub mod compound_flow;

pub use compound_flow::{CompoundFlow, DriverSettings, DriverState, EXTRACT_TABLES_JS};
