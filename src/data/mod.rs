// Bar validation, cleaning and timeframe alignment
pub mod alignment;
pub mod validator;

pub use alignment::{align_timeframes, ensure_aligned, resample};
pub use validator::{clean_bars, validate_series, BarValidator, SeriesReport};
