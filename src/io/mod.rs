pub mod input;
pub mod output;
pub mod report;

pub use input::*;
pub use output::*;
pub use report::*;
