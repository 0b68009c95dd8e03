pub mod channel_mask;
pub mod error;
pub mod header;
pub mod report_type;
pub mod sample;
pub mod stats;

pub use channel_mask::*;
pub use error::*;
pub use header::*;
pub use report_type::*;
pub use sample::*;
pub use stats::*;
