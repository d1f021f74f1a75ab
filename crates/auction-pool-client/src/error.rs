use thiserror::Error;

/// Failure surfaced by a singleton [`crate::RepPoolClient`] call.
///
/// `Vote` never surfaces this: a representative that cannot be reached or
/// errors is simply absent from the returned sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("insufficient resources on representative")]
    InsufficientResources,
    #[error("transport timed out")]
    Timeout,
    #[error("representative request failed: {0}")]
    RequestFailed(String),
}
