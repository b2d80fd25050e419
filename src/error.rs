use thiserror::Error;

/// Failure taxonomy for a single evaluation cycle.
///
/// Only [`StrategyError::MisalignedSeries`] and [`StrategyError::InvalidConfig`]
/// are fatal. Everything else means "skip this symbol for this bar".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("insufficient history for {component}: need {needed} bars, have {available}")]
    InsufficientHistory {
        component: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("degenerate risk: {0}")]
    DegenerateRisk(String),

    #[error("portfolio risk budget exceeded: requested {requested:.2}, open {open:.2}, ceiling {ceiling:.2}")]
    BudgetExceeded {
        requested: f64,
        open: f64,
        ceiling: f64,
    },

    #[error("stale or misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid bar: {0}")]
    InvalidBar(String),
}

impl StrategyError {
    pub fn insufficient(component: &'static str, needed: usize, available: usize) -> Self {
        Self::InsufficientHistory {
            component,
            needed,
            available,
        }
    }

    /// Fatal errors abort the whole cycle instead of skipping one symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MisalignedSeries(_) | Self::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_misalignment_and_config_are_fatal() {
        assert!(StrategyError::MisalignedSeries("x".into()).is_fatal());
        assert!(StrategyError::InvalidConfig("x".into()).is_fatal());
        assert!(!StrategyError::insufficient("trend", 2, 1).is_fatal());
        assert!(!StrategyError::DegenerateRisk("zero stop distance".into()).is_fatal());
        assert!(!StrategyError::BudgetExceeded {
            requested: 1.0,
            open: 2.0,
            ceiling: 2.5
        }
        .is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = StrategyError::insufficient("pivot", 5, 3);
        assert_eq!(
            err.to_string(),
            "insufficient history for pivot: need 5 bars, have 3"
        );
    }
}
