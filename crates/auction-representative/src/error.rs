use thiserror::Error;

/// Failure returned by [`crate::Representative::vote`] and
/// [`crate::Representative::reserve_and_recast_vote`].
///
/// This is the only error a representative returns to a well-behaved
/// caller; anything else (releasing a non-tentative entry, claiming an
/// absent one) is a contract violation and panics instead, per the
/// representative's invariants.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("insufficient resources for instance")]
pub struct InsufficientResources;
