/// Average Directional Index (ADX) with +DI / -DI
///
/// ADX ranges from 0 to 100 and measures trend strength regardless of
/// direction. +DI above -DI marks an uptrend, the reverse a downtrend.
///
/// All three series are aligned with the input bars. Values before the
/// warm-up (`period` bars for DI, `2 * period - 1` for ADX) are NaN.
use crate::models::Bar;

/// Directional movement series for a bar sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalSeries {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// Calculate ADX, +DI and -DI for every bar using Wilder's smoothing
pub fn calculate_adx_series(bars: &[Bar], period: usize) -> DirectionalSeries {
    let n = bars.len();
    let mut out = DirectionalSeries {
        adx: vec![f64::NAN; n],
        plus_di: vec![f64::NAN; n],
        minus_di: vec![f64::NAN; n],
    };
    if period == 0 || n < period + 1 {
        return out;
    }

    // Index 0 has no previous bar; keep the vectors aligned with `bars`
    let mut true_ranges = vec![0.0; n];
    let mut plus_dms = vec![0.0; n];
    let mut minus_dms = vec![0.0; n];
    for i in 1..n {
        let (cur, prev) = (&bars[i], &bars[i - 1]);
        true_ranges[i] = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;
        plus_dms[i] = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        minus_dms[i] = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
    }

    let p = period as f64;
    let mut tr_s: f64 = true_ranges[1..=period].iter().sum::<f64>() / p;
    let mut plus_s: f64 = plus_dms[1..=period].iter().sum::<f64>() / p;
    let mut minus_s: f64 = minus_dms[1..=period].iter().sum::<f64>() / p;

    let mut dx = vec![f64::NAN; n];
    for i in period..n {
        if i > period {
            tr_s = (tr_s * (p - 1.0) + true_ranges[i]) / p;
            plus_s = (plus_s * (p - 1.0) + plus_dms[i]) / p;
            minus_s = (minus_s * (p - 1.0) + minus_dms[i]) / p;
        }

        let (plus_di, minus_di) = if tr_s > 0.0 {
            (plus_s / tr_s * 100.0, minus_s / tr_s * 100.0)
        } else {
            (0.0, 0.0)
        };
        out.plus_di[i] = plus_di;
        out.minus_di[i] = minus_di;

        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        };
    }

    // ADX seeds from the average of the first `period` DX values
    let first_adx = 2 * period - 1;
    if first_adx >= n {
        return out;
    }
    let mut adx = dx[period..=first_adx].iter().sum::<f64>() / p;
    out.adx[first_adx] = adx;
    for i in first_adx + 1..n {
        adx = (adx * (p - 1.0) + dx[i]) / p;
        out.adx[i] = adx;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::series::test_support::bar_at;

    fn create_test_bars(prices: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| bar_at(i, open, high, low, close))
            .collect()
    }

    fn uptrend(len: usize) -> Vec<Bar> {
        create_test_bars(
            &(0..len)
                .map(|i| {
                    let base = 100.0 + i as f64 * 3.0;
                    (base, base + 5.0, base - 1.0, base + 3.0)
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let bars = uptrend(40);
        let series = calculate_adx_series(&bars, 14);

        let last = bars.len() - 1;
        assert!(series.plus_di[last] > series.minus_di[last], "+DI should be > -DI in uptrend");
        assert!(series.adx[last] > 30.0, "ADX should be strong, got {:.2}", series.adx[last]);
    }

    #[test]
    fn test_adx_downtrend_flips_di() {
        let bars = create_test_bars(
            &(0..40)
                .map(|i| {
                    let base = 300.0 - i as f64 * 3.0;
                    (base, base + 1.0, base - 5.0, base - 3.0)
                })
                .collect::<Vec<_>>(),
        );
        let series = calculate_adx_series(&bars, 14);
        let last = bars.len() - 1;
        assert!(series.minus_di[last] > series.plus_di[last]);
    }

    #[test]
    fn test_adx_warmup_is_nan() {
        let bars = uptrend(40);
        let series = calculate_adx_series(&bars, 14);

        assert_eq!(series.adx.len(), 40);
        assert!(series.plus_di[13].is_nan());
        assert!(series.plus_di[14].is_finite());
        assert!(series.adx[26].is_nan());
        assert!(series.adx[27].is_finite());
    }

    #[test]
    fn test_adx_values_bounded() {
        let bars = uptrend(60);
        let series = calculate_adx_series(&bars, 14);
        for v in series.adx.iter().chain(series.plus_di.iter()).filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn test_adx_insufficient_data() {
        let bars = uptrend(2);
        let series = calculate_adx_series(&bars, 14);
        assert!(series.adx.iter().all(|v| v.is_nan()));
    }
}
