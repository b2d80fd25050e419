use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

/// Environment prefix for overrides, e.g. `SWINGBOT__SIZING__RISK_PCT=0.01`
pub const ENV_PREFIX: &str = "SWINGBOT";

/// Full parameter set for one strategy run.
///
/// Immutable once built: every component receives a reference, so many
/// configurations can be evaluated side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub trend: TrendConfig,
    pub context: ContextConfig,
    pub entry: EntryConfig,
    pub oscillator: OscillatorConfig,
    pub sizing: SizingConfig,
    pub pivot: PivotConfig,
    pub exits: ExitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub adx_period: usize,
    /// ADX below this is WEAK
    pub weak_adx: f64,
    /// ADX above this is STRONG
    pub strong_adx: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            adx_period: 14,
            weak_adx: 20.0,
            strong_adx: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Instrument ADX below this routes to the oscillator scorer
    pub consolidation_adx: f64,
    /// Relative strength that overrides misalignment in a benchmark downtrend
    pub rs_override: f64,
    pub rs_lookback: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            consolidation_adx: 15.0,
            rs_override: 5.0,
            rs_lookback: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    pub ma_period: usize,
    pub aligned_confirmations: u8,
    pub counter_trend_confirmations: u8,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            rsi_period: 7,
            rsi_oversold: 40.0,
            rsi_overbought: 60.0,
            stoch_k_period: 7,
            stoch_d_period: 10,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,
            ma_period: 20,
            aligned_confirmations: 2,
            counter_trend_confirmations: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub strong_tier: f64,
    pub moderate_tier: f64,
    pub weak_tier: f64,
    pub aligned_strong_modifier: f64,
    pub aligned_moderate_modifier: f64,
    pub aligned_weak_modifier: f64,
    pub misaligned_modifier: f64,
    /// Fraction of equity risked per trade
    pub risk_pct: f64,
    /// Ceiling on aggregate open risk as a fraction of equity
    pub max_portfolio_risk_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            strong_tier: 1.0,
            moderate_tier: 0.66,
            weak_tier: 0.33,
            aligned_strong_modifier: 1.0,
            aligned_moderate_modifier: 0.9,
            aligned_weak_modifier: 0.8,
            misaligned_modifier: 0.5,
            risk_pct: 0.02,
            max_portfolio_risk_pct: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    pub window: usize,
    /// Bars on each side that must be less extreme than the pivot
    pub wing: usize,
    pub fallback_window: usize,
    /// Offset beyond the anchor level, as a fraction of that level
    pub buffer_pct: f64,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            window: 20,
            wing: 2,
            fallback_window: 5,
            buffer_pct: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingMode {
    /// Close minus `atr_multiple` ATRs (plus for shorts)
    Atr,
    /// The entry-timeframe moving average
    MovingAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub max_holding_bars: u32,
    pub no_progress_bars: u32,
    pub first_target_r: f64,
    pub second_target_r: f64,
    /// Fraction of the original size closed at each target
    pub partial_fraction: f64,
    pub trailing_activation_r: f64,
    pub trailing_mode: TrailingMode,
    pub atr_multiple: f64,
    /// DI reversals only count above this ADX
    pub reversal_adx: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            max_holding_bars: 10,
            no_progress_bars: 3,
            first_target_r: 1.5,
            second_target_r: 2.5,
            partial_fraction: 0.33,
            trailing_activation_r: 1.0,
            trailing_mode: TrailingMode::Atr,
            atr_multiple: 2.0,
            reversal_adx: 20.0,
        }
    }
}

impl StrategyConfig {
    /// Layer defaults, an optional TOML file, then `SWINGBOT__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: StrategyConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;

        cfg.validate()?;
        tracing::debug!("Loaded strategy config: {:?}", cfg);
        Ok(cfg)
    }

    /// Reject parameter sets no component can sensibly run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(StrategyError::InvalidConfig(msg));

        let bounded = [
            ("trend.weak_adx", self.trend.weak_adx),
            ("trend.strong_adx", self.trend.strong_adx),
            ("context.consolidation_adx", self.context.consolidation_adx),
            ("entry.rsi_oversold", self.entry.rsi_oversold),
            ("entry.rsi_overbought", self.entry.rsi_overbought),
            ("entry.stoch_oversold", self.entry.stoch_oversold),
            ("entry.stoch_overbought", self.entry.stoch_overbought),
            ("oscillator.rsi_oversold", self.oscillator.rsi_oversold),
            ("oscillator.rsi_overbought", self.oscillator.rsi_overbought),
            ("oscillator.stoch_oversold", self.oscillator.stoch_oversold),
            ("oscillator.stoch_overbought", self.oscillator.stoch_overbought),
            ("exits.reversal_adx", self.exits.reversal_adx),
        ];
        for (name, value) in bounded {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("{} must be within [0, 100], got {}", name, value));
            }
        }

        if self.trend.weak_adx >= self.trend.strong_adx {
            return invalid(format!(
                "trend.weak_adx ({}) must be below trend.strong_adx ({})",
                self.trend.weak_adx, self.trend.strong_adx
            ));
        }

        let periods = [
            ("trend.adx_period", self.trend.adx_period),
            ("context.rs_lookback", self.context.rs_lookback),
            ("entry.rsi_period", self.entry.rsi_period),
            ("entry.stoch_k_period", self.entry.stoch_k_period),
            ("entry.stoch_d_period", self.entry.stoch_d_period),
            ("entry.ma_period", self.entry.ma_period),
            ("pivot.window", self.pivot.window),
            ("pivot.wing", self.pivot.wing),
            ("pivot.fallback_window", self.pivot.fallback_window),
        ];
        for (name, value) in periods {
            if value == 0 {
                return invalid(format!("{} must be positive", name));
            }
        }

        if self.entry.aligned_confirmations > self.entry.counter_trend_confirmations {
            return invalid(
                "entry.aligned_confirmations cannot exceed entry.counter_trend_confirmations"
                    .to_string(),
            );
        }

        let s = &self.sizing;
        if s.risk_pct <= 0.0 || s.risk_pct > 1.0 {
            return invalid(format!("sizing.risk_pct must be in (0, 1], got {}", s.risk_pct));
        }
        if s.max_portfolio_risk_pct < s.risk_pct {
            return invalid(format!(
                "sizing.max_portfolio_risk_pct ({}) is below sizing.risk_pct ({})",
                s.max_portfolio_risk_pct, s.risk_pct
            ));
        }
        let factors = [
            s.strong_tier,
            s.moderate_tier,
            s.weak_tier,
            s.aligned_strong_modifier,
            s.aligned_moderate_modifier,
            s.aligned_weak_modifier,
            s.misaligned_modifier,
        ];
        if factors.iter().any(|f| *f <= 0.0 || *f > 1.0) {
            return invalid("sizing tiers and modifiers must be in (0, 1]".to_string());
        }

        if self.pivot.buffer_pct < 0.0 {
            return invalid("pivot.buffer_pct cannot be negative".to_string());
        }

        let e = &self.exits;
        if e.first_target_r <= 0.0 || e.second_target_r <= e.first_target_r {
            return invalid(format!(
                "profit targets must be positive and increasing, got {}R / {}R",
                e.first_target_r, e.second_target_r
            ));
        }
        if e.partial_fraction <= 0.0 || e.partial_fraction * 2.0 > 1.0 {
            return invalid(format!(
                "exits.partial_fraction must leave a remainder, got {}",
                e.partial_fraction
            ));
        }
        if e.max_holding_bars == 0 || e.no_progress_bars == 0 {
            return invalid("exit bar counts must be positive".to_string());
        }
        if e.trailing_activation_r < 0.0 || e.atr_multiple <= 0.0 {
            return invalid("trailing parameters must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = StrategyConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.trend.adx_period, 14);
        assert_eq!(cfg.entry.rsi_period, 7);
        assert_eq!(cfg.sizing.risk_pct, 0.02);
        assert_eq!(cfg.exits.first_target_r, 1.5);
        assert_eq!(cfg.exits.second_target_r, 2.5);
    }

    #[test]
    fn test_rejects_inverted_adx_boundaries() {
        let mut cfg = StrategyConfig::default();
        cfg.trend.weak_adx = 35.0;
        let result = cfg.validate();
        assert!(matches!(result, Err(StrategyError::InvalidConfig(msg)) if msg.contains("weak_adx")));
    }

    #[test]
    fn test_rejects_ceiling_below_trade_risk() {
        let mut cfg = StrategyConfig::default();
        cfg.sizing.max_portfolio_risk_pct = 0.01;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_non_increasing_targets() {
        let mut cfg = StrategyConfig::default();
        cfg.exits.second_target_r = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("swingbot-cfg-{}.toml", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "[sizing]\nrisk_pct = 0.01\n\n[exits]\nmax_holding_bars = 7").unwrap();
        }

        let cfg = StrategyConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.sizing.risk_pct, 0.01);
        assert_eq!(cfg.exits.max_holding_bars, 7);
        // untouched sections keep their defaults
        assert_eq!(cfg.trend.strong_adx, 30.0);
        assert_eq!(cfg.sizing.max_portfolio_risk_pct, 0.04);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = StrategyConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));
    }
}
