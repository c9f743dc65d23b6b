pub mod config;
pub mod error;
pub mod types;

pub use config::{ClusterConfig, StrategyOverrides, StrategyParams, StringerConfig};
pub use error::{Result, StringerError};
pub use types::*;
