/// Errors produced when consuming the event fabric.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FabricError {
    /// The warehouse dropped the bus; no further events will arrive.
    #[error("event stream closed")]
    Closed,

    /// The subscriber fell behind and missed events.
    #[error("subscriber lagged, {0} events skipped")]
    Lagged(u64),
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
