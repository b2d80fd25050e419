// Entry scoring
pub mod oscillator;
pub mod reaction;

pub use oscillator::OscillatorScorer;
pub use reaction::{ReactionScorer, SubSignals};

use crate::models::series::SeriesWindow;
use crate::models::Signal;
use crate::regime::ContextVerdict;

/// Base trait for entry scorers
pub trait EntryScorer: Send + Sync {
    /// Score the lower-timeframe window under a context verdict.
    /// Returns a signal only when the confluence threshold is met.
    fn score(&self, verdict: &ContextVerdict, entry: &SeriesWindow<'_>) -> Option<Signal>;

    /// Get scorer name
    fn name(&self) -> &str;

    /// Minimum lower-timeframe bars needed before scoring
    fn min_bars_required(&self) -> usize;
}
