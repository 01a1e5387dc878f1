// Technical indicators module
// Implements EMA, MACD, VWAP bands and ATR for the candle pipeline

pub mod atr;
pub mod ema;
pub mod frame;
pub mod macd;
pub mod vwap;

pub use atr::{atr_series, true_ranges};
pub use ema::{ema_latest, ema_series};
pub use frame::{compute_frames, IndicatorFrame, IndicatorParams};
pub use macd::{macd_series, MacdPoint};
pub use vwap::{vwap_series, VwapPoint};
