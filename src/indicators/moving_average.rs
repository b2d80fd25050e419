/// Simple Moving Average aligned with `prices`; NaN until `period - 1`
pub fn calculate_sma_series(prices: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; prices.len()];
    if period == 0 || prices.len() < period {
        return out;
    }

    let mut sum: f64 = prices[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..prices.len() {
        sum += prices[i] - prices[i - period];
        out[i] = sum / period as f64;
    }
    out
}

/// SMA over a series that may itself start with NaN warm-up values
pub(crate) fn calculate_sma_skip_nan(values: &[f64], period: usize) -> Vec<f64> {
    let start = values.iter().position(|v| v.is_finite()).unwrap_or(values.len());
    let mut out = vec![f64::NAN; values.len()];
    let tail = calculate_sma_series(&values[start..], period);
    out[start..].copy_from_slice(&tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let sma = calculate_sma_series(&prices, 5);
        assert!(sma[3].is_nan());
        assert_eq!(sma[4], 104.0);
    }

    #[test]
    fn test_sma_rolls() {
        let prices = vec![1.0, 2.0, 3.0, 4.0];
        let sma = calculate_sma_series(&prices, 2);
        assert_eq!(&sma[1..], &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let prices = vec![100.0, 102.0];
        assert!(calculate_sma_series(&prices, 5).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sma_skips_leading_nan() {
        let values = vec![f64::NAN, f64::NAN, 2.0, 4.0, 6.0];
        let sma = calculate_sma_skip_nan(&values, 2);
        assert!(sma[2].is_nan());
        assert_eq!(sma[3], 3.0);
        assert_eq!(sma[4], 5.0);
    }
}
