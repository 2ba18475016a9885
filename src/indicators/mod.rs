// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the rolling and Wilder-smoothed
// primitives the metric engine is built from.  Every function returns an
// index-aligned `Vec<Option<f64>>` so callers are forced to handle warm-up
// bars and numerical edge cases explicitly.

pub mod atr;
pub mod rolling;
pub mod rsi;

pub use atr::atr_series;
pub use rolling::{rolling_max, rolling_mean, rolling_min};
pub use rsi::rsi_series;
