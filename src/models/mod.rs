pub mod bucket;
pub mod raw;
pub mod trade;

pub use bucket::*;
pub use raw::*;
pub use trade::*;
