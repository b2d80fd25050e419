/// Stochastic oscillator
///
/// %K places the close within the high/low range of the last `k_period`
/// bars; %D is an SMA of %K over `d_period`.
use super::moving_average::calculate_sma_skip_nan;
use crate::models::Bar;

/// Returns (%K, %D), both aligned with `bars`
pub fn calculate_stochastic_series(
    bars: &[Bar],
    k_period: usize,
    d_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut k = vec![f64::NAN; bars.len()];
    if k_period == 0 || bars.len() < k_period {
        return (k.clone(), k);
    }

    for i in k_period - 1..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let highest = window.iter().fold(f64::NEG_INFINITY, |a, b| a.max(b.high));
        let lowest = window.iter().fold(f64::INFINITY, |a, b| a.min(b.low));
        let range = highest - lowest;
        k[i] = if range > 0.0 {
            (bars[i].close - lowest) / range * 100.0
        } else {
            50.0
        };
    }

    let d = calculate_sma_skip_nan(&k, d_period);
    (k, d)
}
