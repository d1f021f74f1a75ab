//! Wire and domain types shared between the representative, pool client,
//! auctioneer, and coordinator crates.
//!
//! Nothing in this crate talks to a network or holds a lock; it only
//! describes the shapes that cross those boundaries.

mod instance;
mod rules;
mod wire;

pub use instance::{
    AppGuid,
    Instance,
    InstanceGuid,
};
pub use rules::AuctionRules;
pub use wire::{
    AuctionRequest,
    AuctionResult,
    VoteResult,
};
