pub mod stage0_normalize;
pub mod stage1_consolidate;
pub mod stage2_report;

pub use stage0_normalize::*;
pub use stage1_consolidate::*;
pub use stage2_report::*;
