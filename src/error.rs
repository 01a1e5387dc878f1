use thiserror::Error;

/// Error taxonomy for the signal and position lifecycle engine.
///
/// `Configuration` and `Computation` are fatal for the running setup and
/// abort before (or at) pipeline start. `DataUnavailable` and `Execution`
/// are recoverable: the driver logs them at the tick boundary and retries
/// on the next tick without touching ledger or equity state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("order execution failed: {0}")]
    Execution(String),

    #[error("indicator computation failed: {0}")]
    Computation(String),
}

impl EngineError {
    /// Whether the driver may keep running and retry on the next tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::DataUnavailable(_) | EngineError::Execution(_)
        )
    }
}
