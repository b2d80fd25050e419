/// Trend classification from the ADX / +DI / -DI triple
///
/// One classifier serves both the benchmark and the instrument:
/// - +DI > -DI: Up, otherwise Down
/// - ADX < 20: Weak, 20..=30: Moderate, > 30: Strong
use crate::config::TrendConfig;
use crate::models::series::{last_two, SeriesWindow};
use crate::models::{TradeDirection, TrendDirection, TrendState, TrendStrength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crossover {
    /// +DI moved from below -DI to above it
    Bullish,
    /// -DI moved from below +DI to above it
    Bearish,
}

impl Crossover {
    /// True when the crossover points away from a position in `direction`
    pub fn is_against(self, direction: TradeDirection) -> bool {
        matches!(
            (self, direction),
            (Crossover::Bearish, TradeDirection::Long) | (Crossover::Bullish, TradeDirection::Short)
        )
    }

    pub fn supports(self, direction: TradeDirection) -> bool {
        !self.is_against(direction)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendClassifier {
    weak_adx: f64,
    strong_adx: f64,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self::new(&TrendConfig::default())
    }
}

impl TrendClassifier {
    pub fn new(config: &TrendConfig) -> Self {
        Self {
            weak_adx: config.weak_adx,
            strong_adx: config.strong_adx,
        }
    }

    /// Step function of ADX; both boundaries belong to Moderate
    pub fn strength(&self, adx: f64) -> TrendStrength {
        if adx < self.weak_adx {
            TrendStrength::Weak
        } else if adx <= self.strong_adx {
            TrendStrength::Moderate
        } else {
            TrendStrength::Strong
        }
    }

    /// Classify the last bar of the given series.
    ///
    /// Returns None (indeterminate) unless the last two bars carry finite
    /// values for all three inputs.
    pub fn classify(&self, adx: &[f64], plus_di: &[f64], minus_di: &[f64]) -> Option<TrendState> {
        let (_, adx_last) = last_two(adx)?;
        let (_, plus_last) = last_two(plus_di)?;
        let (_, minus_last) = last_two(minus_di)?;

        let direction = if plus_last > minus_last {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        Some(TrendState {
            direction,
            strength: self.strength(adx_last),
        })
    }

    pub fn classify_window(&self, window: &SeriesWindow<'_>) -> Option<TrendState> {
        let state = self.classify(window.adx, window.plus_di, window.minus_di);
        if state.is_none() {
            tracing::debug!(
                "{} {:?}: trend indeterminate ({} bars)",
                window.symbol,
                window.timeframe,
                window.len()
            );
        }
        state
    }
}

/// DI crossover between the prior and the last bar
pub fn detect_crossover(plus_di: &[f64], minus_di: &[f64]) -> Option<Crossover> {
    let (plus_prev, plus_last) = last_two(plus_di)?;
    let (minus_prev, minus_last) = last_two(minus_di)?;

    if plus_prev < minus_prev && plus_last > minus_last {
        Some(Crossover::Bullish)
    } else if plus_prev > minus_prev && plus_last < minus_last {
        Some(Crossover::Bearish)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_boundaries() {
        let classifier = TrendClassifier::default();
        assert_eq!(classifier.strength(19.99), TrendStrength::Weak);
        assert_eq!(classifier.strength(20.0), TrendStrength::Moderate);
        assert_eq!(classifier.strength(25.0), TrendStrength::Moderate);
        assert_eq!(classifier.strength(30.0), TrendStrength::Moderate);
        assert_eq!(classifier.strength(30.01), TrendStrength::Strong);
    }

    #[test]
    fn test_classify_up_strong() {
        let classifier = TrendClassifier::default();
        let state = classifier
            .classify(&[28.0, 35.0], &[20.0, 30.0], &[22.0, 12.0])
            .unwrap();
        assert_eq!(state.direction, TrendDirection::Up);
        assert_eq!(state.strength, TrendStrength::Strong);
    }

    #[test]
    fn test_equal_di_is_down() {
        let classifier = TrendClassifier::default();
        let state = classifier.classify(&[10.0, 10.0], &[20.0, 20.0], &[20.0, 20.0]).unwrap();
        assert_eq!(state.direction, TrendDirection::Down);
        assert_eq!(state.strength, TrendStrength::Weak);
    }

    #[test]
    fn test_insufficient_history_is_indeterminate() {
        let classifier = TrendClassifier::default();
        assert_eq!(classifier.classify(&[25.0], &[20.0], &[10.0]), None);
        assert_eq!(
            classifier.classify(&[f64::NAN, 25.0], &[20.0, 21.0], &[10.0, 9.0]),
            None
        );
    }

    #[test]
    fn test_bullish_crossover() {
        assert_eq!(
            detect_crossover(&[18.0, 24.0], &[22.0, 19.0]),
            Some(Crossover::Bullish)
        );
    }

    #[test]
    fn test_bearish_crossover() {
        assert_eq!(
            detect_crossover(&[24.0, 18.0], &[19.0, 22.0]),
            Some(Crossover::Bearish)
        );
    }

    #[test]
    fn test_no_crossover_when_already_above() {
        assert_eq!(detect_crossover(&[24.0, 26.0], &[19.0, 18.0]), None);
        assert_eq!(detect_crossover(&[24.0], &[19.0]), None);
    }

    #[test]
    fn test_crossover_direction_helpers() {
        assert!(Crossover::Bearish.is_against(TradeDirection::Long));
        assert!(Crossover::Bullish.is_against(TradeDirection::Short));
        assert!(Crossover::Bullish.supports(TradeDirection::Long));
    }
}
