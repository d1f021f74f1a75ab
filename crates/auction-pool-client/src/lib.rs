//! The transport-agnostic fan-out RPC surface the auctioneer talks to.
//!
//! [`RepPoolClient`] is implemented by four variants: in-process direct
//! calls, HTTP, request/response pub-sub, and a fault-injecting wrapper
//! around any of the others. The auctioneer only ever depends on the trait.

mod error;
pub mod fault_injector;
pub mod http;
pub mod in_process;
pub mod pubsub;

pub use error::PoolError;

use async_trait::async_trait;
use auction_types::{
    Instance,
    VoteResult,
};

/// The fan-out surface a single auction talks to.
///
/// Implementations fan `vote` out to every id in parallel and return
/// whatever answered before their own transport timeout; they never block
/// on stragglers. `release` and `claim` are fire-and-observe: transport
/// failures are logged by the implementation, not surfaced here, since the
/// auctioneer has no useful recourse for either.
#[async_trait]
pub trait RepPoolClient: Send + Sync {
    /// Fans a non-mutating score request out to every id in `ids`.
    ///
    /// The returned sequence is unordered and may be shorter than `ids`:
    /// representatives that errored or did not answer in time are simply
    /// absent, not represented by an error entry.
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult>;

    /// Scores `instance` against the *pre-reservation* state of `id`, then
    /// tentatively reserves it there.
    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError>;

    /// Rolls back a tentative reservation. Transport failures are logged,
    /// not surfaced.
    async fn release(&self, id: &str, instance: &Instance);

    /// Finalizes a tentative reservation. Transport failures are logged,
    /// not surfaced.
    async fn claim(&self, id: &str, instance: &Instance);

    /// `None` if `id` is unreachable.
    async fn total_resources(&self, id: &str) -> Option<u32>;

    /// `None` if `id` is unreachable.
    async fn instances(&self, id: &str) -> Option<Vec<Instance>>;

    async fn set_instances(&self, id: &str, instances: Vec<Instance>);

    async fn reset(&self, id: &str);
}
