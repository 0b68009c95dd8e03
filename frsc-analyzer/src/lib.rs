pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod rebuffer;
pub mod stats;

pub use config::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
pub use rebuffer::*;
pub use stats::*;
