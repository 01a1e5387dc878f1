// Trading strategy module
pub mod ema_macd_vwap;
pub mod events;

pub use ema_macd_vwap::{EmaMacdVwapStrategy, EntrySignal, StrategyParams};
pub use events::{band_proximity, detect_crossover, Crossover, VwapBand};
