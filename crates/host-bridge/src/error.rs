#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A newer request for the same primitive replaced this one.
    #[error("superseded by a newer request")]
    Superseded,
    #[error("no native host attached")]
    HostUnavailable,
    #[error("invalid host callback: {0}")]
    InvalidCallback(String),
}
