//! The request/response pub-sub pool client, addressing representatives on
//! `rep.<id>.<verb>` subjects.
//!
//! Mirrors [`auction_representative::pubsub`] verb-for-verb. The server
//! side always replies, including a sentinel error payload on decode
//! failure, so every call here resolves on either a real reply or its own
//! timeout — never indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use auction_types::{
    Instance,
    VoteResult,
};
use futures::future::join_all;
use tracing::warn;

use crate::{
    PoolError,
    RepPoolClient,
};

const ERROR_SENTINEL: &[u8] = b"error";

pub struct PubSubPoolClient {
    client: async_nats::Client,
    timeout: Duration,
}

impl PubSubPoolClient {
    #[must_use]
    pub fn new(client: async_nats::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
        }
    }

    fn subject(id: &str, verb: &str) -> String {
        format!("rep.{id}.{verb}")
    }

    async fn request(&self, id: &str, verb: &str, payload: Vec<u8>) -> Result<Vec<u8>, PoolError> {
        let subject = Self::subject(id, verb);
        let call = self.client.request(subject, payload.into());
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(message)) if message.payload.as_ref() == ERROR_SENTINEL => {
                Err(PoolError::RequestFailed(format!("{id}/{verb} returned an error sentinel")))
            }
            Ok(Ok(message)) => Ok(message.payload.to_vec()),
            Ok(Err(error)) => Err(PoolError::RequestFailed(error.to_string())),
            Err(_elapsed) => Err(PoolError::Timeout),
        }
    }

    async fn request_instance(
        &self,
        id: &str,
        verb: &str,
        instance: &Instance,
    ) -> Result<Vec<u8>, PoolError> {
        let payload = serde_json::to_vec(instance).expect("Instance always serializes");
        self.request(id, verb, payload).await
    }
}

#[async_trait]
impl RepPoolClient for PubSubPoolClient {
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult> {
        let payload = serde_json::to_vec(instance).expect("Instance always serializes");
        let calls = ids.iter().map(|id| async move {
            let response = self.request(id, "vote", payload.clone()).await.ok()?;
            let score: f64 = serde_json::from_slice(&response).ok()?;
            Some(VoteResult::ok(id, score))
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError> {
        let response = self.request_instance(id, "reserve_and_recast_vote", instance).await?;
        serde_json::from_slice(&response)
            .map_err(|error| PoolError::RequestFailed(error.to_string()))
    }

    async fn release(&self, id: &str, instance: &Instance) {
        if let Err(error) = self.request_instance(id, "release", instance).await {
            warn!(rep = id, %error, "release failed");
        }
    }

    async fn claim(&self, id: &str, instance: &Instance) {
        if let Err(error) = self.request_instance(id, "claim", instance).await {
            warn!(rep = id, %error, "claim failed");
        }
    }

    async fn total_resources(&self, id: &str) -> Option<u32> {
        let response = self.request(id, "total_resources", Vec::new()).await.ok()?;
        serde_json::from_slice(&response).ok()
    }

    async fn instances(&self, id: &str) -> Option<Vec<Instance>> {
        let response = self.request(id, "instances", Vec::new()).await.ok()?;
        serde_json::from_slice(&response).ok()
    }

    async fn set_instances(&self, id: &str, instances: Vec<Instance>) {
        let payload = serde_json::to_vec(&instances).expect("instances always serialize");
        if let Err(error) = self.request(id, "set_instances", payload).await {
            warn!(rep = id, %error, "set_instances failed");
        }
    }

    async fn reset(&self, id: &str) {
        if let Err(error) = self.request(id, "reset", Vec::new()).await {
            warn!(rep = id, %error, "reset failed");
        }
    }
}
