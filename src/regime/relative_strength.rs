/// Percentage change over `lookback` bars for every index.
///
/// Indices before `lookback` have no comparison bar and report 0.
pub fn pct_change_series(closes: &[f64], lookback: usize) -> Vec<f64> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            if lookback == 0 || i < lookback {
                return 0.0;
            }
            let base = closes[i - lookback];
            if base == 0.0 {
                0.0
            } else {
                (close - base) / base * 100.0
            }
        })
        .collect()
}

/// Instrument percentage return minus benchmark percentage return, last bar
pub fn relative_strength(instrument: &[f64], benchmark: &[f64], lookback: usize) -> f64 {
    let last_change = |closes: &[f64]| -> f64 {
        match closes.len() {
            0 => 0.0,
            len => {
                let i = len - 1;
                if lookback == 0 || i < lookback || closes[i - lookback] == 0.0 {
                    0.0
                } else {
                    (closes[i] - closes[i - lookback]) / closes[i - lookback] * 100.0
                }
            }
        }
    };

    last_change(instrument) - last_change(benchmark)
}
