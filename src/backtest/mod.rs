pub mod report;
pub mod runner;
pub mod synthetic;

pub use report::{BacktestReport, EquityState};
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
