use thiserror::Error;

/// Failures the partitioning engine can surface. Degenerate geometry during
/// splitting and empty aggregation input are handled by policy, not here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A boolean operation on malformed input failed. The whole render is
    /// abandoned rather than returning a partial cell list.
    #[error("geometry operation failed during {0}")]
    GeometryOperationFailed(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
