use thiserror::Error;

/// Failure modes of a single engine request.
///
/// Errors carry no state across requests: a failed run returns nothing and
/// the next request starts from scratch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The configuration cannot produce a meaningful run. Raised before any
    /// integration work is attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The stepper could not advance within its tolerances. No partial
    /// series is returned.
    #[error("integration failed at t = {t}: {reason}")]
    IntegrationFailure { t: f64, reason: String },
}
