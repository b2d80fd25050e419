// Core modules
pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod regime;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::StrategyConfig;
pub use error::{Result, StrategyError};
pub use models::*;
pub use strategy::EntryScorer;
