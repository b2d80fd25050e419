/// Average True Range (ATR) indicator
///
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Uses Wilder's smoothing (same as RSI and ADX) for the moving average.
use crate::models::Bar;

/// ATR aligned with `bars`; NaN until index `period`
pub fn calculate_atr_series(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return out;
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| {
            (w[1].high - w[1].low)
                .max((w[1].high - w[0].close).abs())
                .max((w[1].low - w[0].close).abs())
        })
        .collect();

    // First ATR is simple average of first 'period' true ranges
    let p = period as f64;
    let mut atr = true_ranges[..period].iter().sum::<f64>() / p;
    out[period] = atr;
    for (i, tr) in true_ranges.iter().enumerate().skip(period) {
        atr = (atr * (p - 1.0) + tr) / p;
        out[i + 1] = atr;
    }

    out
}
