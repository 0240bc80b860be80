mod config;
mod constants;
mod metrics;
mod stats;

pub use config::*;
pub use constants::*;
pub use metrics::*;
pub use stats::*;
