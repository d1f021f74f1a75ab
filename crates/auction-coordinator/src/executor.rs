use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

use async_trait::async_trait;
use auction_pool_client::RepPoolClient;
use auction_types::{
    AuctionRequest,
    AuctionResult,
};
use thiserror::Error;
use tracing::warn;

/// The top-level bound a coordinator enforces on a single remote-dispatched
/// auction, independent of any per-RPC transport timeout used inside the
/// auction itself.
pub const REMOTE_DISPATCH_CEILING: Duration = Duration::from_secs(60);

const AUCTION_SUBJECT: &str = "diego.auction";
const ERROR_SENTINEL: &[u8] = b"error";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDispatchError {
    #[error("remote auction did not complete within the dispatch ceiling")]
    Ceiling,
    #[error("remote auction request failed")]
    RequestFailed,
}

/// How a single auction request gets run: in this process, or dispatched to
/// a remote pool of auctioneer workers.
#[async_trait]
pub trait AuctionExecutor: Send + Sync {
    async fn run(&self, request: &AuctionRequest) -> AuctionResult;
}

/// Runs the auction in this process against a shared pool client.
pub struct DirectExecutor {
    pool: Arc<dyn RepPoolClient>,
}

impl DirectExecutor {
    #[must_use]
    pub fn new(pool: Arc<dyn RepPoolClient>) -> Self {
        Self {
            pool,
        }
    }
}

#[async_trait]
impl AuctionExecutor for DirectExecutor {
    async fn run(&self, request: &AuctionRequest) -> AuctionResult {
        auction_auctioneer::auction(self.pool.as_ref(), request).await
    }
}

/// Publishes the request on the well-known auction subject and awaits the
/// reply, bounded by [`REMOTE_DISPATCH_CEILING`].
///
/// Any worker subscribed under the `auction-channel` queue group competes
/// for the message, so exactly one of them answers.
pub struct RemoteExecutor {
    client: async_nats::Client,
}

impl RemoteExecutor {
    #[must_use]
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
        }
    }
}

#[async_trait]
impl AuctionExecutor for RemoteExecutor {
    async fn run(&self, request: &AuctionRequest) -> AuctionResult {
        let started = Instant::now();
        match self.dispatch(request).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, instance = %request.instance.instance_guid, "remote auction dispatch failed");
                failed_result(request, started.elapsed())
            }
        }
    }
}

impl RemoteExecutor {
    async fn dispatch(&self, request: &AuctionRequest) -> Result<AuctionResult, RemoteDispatchError> {
        let payload =
            serde_json::to_vec(request).expect("AuctionRequest always serializes");
        let call = self.client.request(AUCTION_SUBJECT, payload.into());

        let message = tokio::time::timeout(REMOTE_DISPATCH_CEILING, call)
            .await
            .map_err(|_elapsed| RemoteDispatchError::Ceiling)?
            .map_err(|_error| RemoteDispatchError::RequestFailed)?;

        if message.payload.as_ref() == ERROR_SENTINEL {
            return Err(RemoteDispatchError::RequestFailed);
        }

        serde_json::from_slice(&message.payload).map_err(|_error| RemoteDispatchError::RequestFailed)
    }
}

fn failed_result(request: &AuctionRequest, elapsed: Duration) -> AuctionResult {
    AuctionResult {
        instance: request.instance.clone(),
        winner: String::new(),
        num_rounds: 0,
        num_votes: 0,
        duration: elapsed.into(),
    }
}
