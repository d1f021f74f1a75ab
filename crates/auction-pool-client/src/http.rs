//! The HTTP pool client: one `reqwest` client per pool, addressing
//! representatives by a fixed guid-to-base-URL map.
//!
//! `reqwest` has no separate response-header timeout knob; `.timeout()` on
//! the request is used as a stand-in for the response-header timeout this
//! pool's contract specifies (see DESIGN.md).

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use auction_types::{
    Instance,
    VoteResult,
};
use futures::future::join_all;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::{
    PoolError,
    RepPoolClient,
};

/// An HTTP-transport pool client.
///
/// `max_concurrent` bounds the number of outstanding requests across *all*
/// representatives at once, mirroring the shared client-side concurrency
/// limiter the transport contract calls for.
pub struct HttpPoolClient {
    client: reqwest::Client,
    bases: HashMap<String, String>,
    limiter: Arc<Semaphore>,
}

impl HttpPoolClient {
    /// `bases` maps representative guid to its HTTP base address, e.g.
    /// `rep-1` → `http://10.0.0.1:8080`.
    #[must_use]
    pub fn new(bases: HashMap<String, String>, timeout: Duration, max_concurrent: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with no exotic config always builds");
        Self {
            client,
            bases,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    fn url(&self, id: &str, path: &str) -> Option<String> {
        self.bases.get(id).map(|base| format!("{base}{path}"))
    }

    async fn post_instance(&self, id: &str, path: &str, instance: &Instance) -> Result<StatusCode, PoolError> {
        let url = self.url(id, path).ok_or_else(|| PoolError::RequestFailed(id.to_owned()))?;
        let _permit = self.limiter.acquire().await.expect("semaphore is never closed");
        let response = self
            .client
            .post(url)
            .json(instance)
            .send()
            .await
            .map_err(to_pool_error)?;
        Ok(response.status())
    }
}

fn to_pool_error(error: reqwest::Error) -> PoolError {
    if error.is_timeout() {
        PoolError::Timeout
    } else {
        PoolError::RequestFailed(error.to_string())
    }
}

#[async_trait]
impl RepPoolClient for HttpPoolClient {
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult> {
        let calls = ids.iter().map(|id| async move {
            let url = self.url(id, "/vote")?;
            let _permit = self.limiter.acquire().await.ok()?;
            let response = self.client.post(url).json(instance).send().await.ok()?;
            if response.status() != StatusCode::OK {
                return None;
            }
            let score: f64 = response.json().await.ok()?;
            Some(VoteResult::ok(id, score))
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError> {
        let url = self.url(id, "/reserve_and_recast_vote").ok_or_else(|| {
            PoolError::RequestFailed(id.to_owned())
        })?;
        let _permit = self.limiter.acquire().await.expect("semaphore is never closed");
        let response = self
            .client
            .post(url)
            .json(instance)
            .send()
            .await
            .map_err(to_pool_error)?;
        match response.status() {
            StatusCode::OK => response.json().await.map_err(to_pool_error),
            StatusCode::SERVICE_UNAVAILABLE => Err(PoolError::InsufficientResources),
            other => Err(PoolError::RequestFailed(format!("unexpected status {other}"))),
        }
    }

    async fn release(&self, id: &str, instance: &Instance) {
        if let Err(error) = self.post_instance(id, "/release", instance).await {
            warn!(rep = id, %error, "release failed");
        }
    }

    async fn claim(&self, id: &str, instance: &Instance) {
        if let Err(error) = self.post_instance(id, "/claim", instance).await {
            warn!(rep = id, %error, "claim failed");
        }
    }

    async fn total_resources(&self, id: &str) -> Option<u32> {
        let url = self.url(id, "/total_resources")?;
        let _permit = self.limiter.acquire().await.ok()?;
        self.client.get(url).send().await.ok()?.json().await.ok()
    }

    async fn instances(&self, id: &str) -> Option<Vec<Instance>> {
        let url = self.url(id, "/instances")?;
        let _permit = self.limiter.acquire().await.ok()?;
        self.client.get(url).send().await.ok()?.json().await.ok()
    }

    async fn set_instances(&self, id: &str, instances: Vec<Instance>) {
        let Some(url) = self.url(id, "/set_instances") else { return };
        let Ok(_permit) = self.limiter.acquire().await else { return };
        if let Err(error) = self.client.post(url).json(&instances).send().await {
            warn!(rep = id, %error, "set_instances failed");
        }
    }

    async fn reset(&self, id: &str) {
        let Some(url) = self.url(id, "/reset") else { return };
        let Ok(_permit) = self.limiter.acquire().await else { return };
        if let Err(error) = self.client.get(url).send().await {
            warn!(rep = id, %error, "reset failed");
        }
    }
}
