pub mod filter;
pub mod record;
pub mod source;
pub mod table;

pub use filter::*;
pub use record::*;
pub use source::*;
pub use table::*;
