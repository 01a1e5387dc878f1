// Position ownership and order sizing module
pub mod ledger;
pub mod sizing;

pub use ledger::{PlannedTransition, PositionLedger, TickPrices, Transition};
pub use sizing::position_size;
