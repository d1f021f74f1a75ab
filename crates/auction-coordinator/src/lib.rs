//! Runs many single-instance auctions in parallel, bounded by a concurrency
//! cap, and optionally dispatches each one to a remote pool of auctioneer
//! workers instead of running it in this process.

mod executor;
mod worker;

pub use executor::{
    AuctionExecutor,
    DirectExecutor,
    RemoteDispatchError,
    RemoteExecutor,
    REMOTE_DISPATCH_CEILING,
};
pub use worker::RemoteAuctioneerWorker;

use std::sync::Arc;

use auction_types::AuctionRequest;
use futures::stream::{
    self,
    StreamExt as _,
};
use tracing::instrument;

/// Launches one auction per instance concurrently, bounded by
/// `max_concurrent` in-flight, and collects results.
///
/// Result order is unspecified: it follows completion order, not request
/// order.
pub struct AuctionCoordinator {
    executor: Arc<dyn AuctionExecutor>,
    max_concurrent: usize,
}

impl AuctionCoordinator {
    #[must_use]
    pub fn new(executor: Arc<dyn AuctionExecutor>, max_concurrent: usize) -> Self {
        Self {
            executor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    #[instrument(skip_all, fields(batch_size = requests.len(), max_concurrent = self.max_concurrent))]
    pub async fn run_batch(
        &self,
        requests: Vec<AuctionRequest>,
    ) -> Vec<auction_types::AuctionResult> {
        stream::iter(requests)
            .map(|request| {
                let executor = Arc::clone(&self.executor);
                async move { executor.run(&request).await }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }
}
