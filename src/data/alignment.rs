use crate::error::{Result, StrategyError};
use crate::models::Bar;

/// Trim two series to the timestamp range they share
pub fn align_timeframes(higher: &[Bar], lower: &[Bar]) -> (Vec<Bar>, Vec<Bar>) {
    let (Some(h_first), Some(h_last), Some(l_first), Some(l_last)) =
        (higher.first(), higher.last(), lower.first(), lower.last())
    else {
        return (Vec::new(), Vec::new());
    };

    let start = h_first.timestamp.max(l_first.timestamp);
    let end = h_last.timestamp.min(l_last.timestamp);
    let in_range = |b: &&Bar| b.timestamp >= start && b.timestamp <= end;

    let higher: Vec<Bar> = higher.iter().filter(in_range).copied().collect();
    let lower: Vec<Bar> = lower.iter().filter(in_range).copied().collect();

    tracing::debug!(
        "Aligned timeframes {} to {}: {} higher bars, {} lower bars",
        start,
        end,
        higher.len(),
        lower.len()
    );

    (higher, lower)
}

/// Benchmark and instrument must describe the same periods.
///
/// Compares the trailing `lookback` timestamps; any mismatch is fatal.
pub fn ensure_aligned(benchmark: &[Bar], instrument: &[Bar], lookback: usize) -> Result<()> {
    if benchmark.len() != instrument.len() {
        return Err(StrategyError::MisalignedSeries(format!(
            "benchmark has {} bars, instrument has {}",
            benchmark.len(),
            instrument.len()
        )));
    }

    let start = benchmark.len().saturating_sub(lookback);
    let mismatch = benchmark[start..]
        .iter()
        .zip(&instrument[start..])
        .find(|(b, i)| b.timestamp != i.timestamp);

    if let Some((b, i)) = mismatch {
        return Err(StrategyError::MisalignedSeries(format!(
            "benchmark bar {} does not match instrument bar {}",
            b.timestamp, i.timestamp
        )));
    }

    Ok(())
}

/// Build higher-timeframe bars from consecutive groups of `factor` lower bars.
///
/// An incomplete trailing group is dropped; it has not closed yet.
pub fn resample(bars: &[Bar], factor: usize) -> Vec<Bar> {
    if factor == 0 {
        return Vec::new();
    }

    bars.chunks_exact(factor)
        .map(|group| {
            let first = &group[0];
            let last = &group[group.len() - 1];
            Bar {
                timestamp: last.timestamp,
                open: first.open,
                high: group.iter().fold(f64::NEG_INFINITY, |a, b| a.max(b.high)),
                low: group.iter().fold(f64::INFINITY, |a, b| a.min(b.low)),
                close: last.close,
                volume: group.iter().map(|b| b.volume).sum(),
            }
        })
        .collect()
}
