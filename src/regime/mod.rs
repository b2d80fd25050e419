// Market context: trend classification, relative strength and regime routing
pub mod context;
pub mod relative_strength;
pub mod trend;

pub use context::{ContextAggregator, ContextDecision, ContextVerdict, Regime, SkipReason};
pub use relative_strength::{pct_change_series, relative_strength};
pub use trend::{detect_crossover, Crossover, TrendClassifier};
