//! A fault-injecting wrapper used by tests and local soak runs to exercise
//! the auctioneer against a lossy pool.
//!
//! On each call against a representative in `flaky_reps`, with probability
//! `flakiness` the call sleeps the full timeout and fails; otherwise every
//! call (flaky or not) sleeps a random delay in `[latency_min, latency_max]`
//! before being forwarded to the wrapped client.

use std::{
    collections::HashSet,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use auction_types::{
    Instance,
    VoteResult,
};
use rand::Rng;

use crate::{
    PoolError,
    RepPoolClient,
};

#[derive(Clone, Debug)]
pub struct LossyConfig {
    pub latency_min: Duration,
    pub latency_max: Duration,
    pub timeout: Duration,
    /// Probability, in `[0.0, 1.0]`, that a call against a representative
    /// in `flaky_reps` times out instead of proceeding.
    pub flakiness: f64,
    pub flaky_reps: HashSet<String>,
}

impl Default for LossyConfig {
    fn default() -> Self {
        Self {
            latency_min: Duration::ZERO,
            latency_max: Duration::ZERO,
            timeout: Duration::from_millis(500),
            flakiness: 0.0,
            flaky_reps: HashSet::new(),
        }
    }
}

pub struct LossyPoolClient<C> {
    inner: C,
    config: LossyConfig,
}

impl<C: RepPoolClient> LossyPoolClient<C> {
    #[must_use]
    pub fn new(inner: C, config: LossyConfig) -> Self {
        Self {
            inner,
            config,
        }
    }

    fn is_flaky(&self, id: &str) -> bool {
        self.config.flaky_reps.contains(id) && rand::thread_rng().gen_bool(self.config.flakiness)
    }

    /// Returns `Err(())` if the call should time out instead of proceeding.
    async fn maybe_flake(&self, id: &str) -> Result<(), ()> {
        if self.is_flaky(id) {
            tokio::time::sleep(self.config.timeout).await;
            return Err(());
        }
        let delay = random_duration_between(self.config.latency_min, self.config.latency_max);
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

fn random_duration_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = max - min;
    let jitter_nanos = rand::thread_rng().gen_range(0..=span.as_nanos());
    min + Duration::from_nanos(u64::try_from(jitter_nanos).unwrap_or(u64::MAX))
}

#[async_trait]
impl<C: RepPoolClient> RepPoolClient for LossyPoolClient<C> {
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult> {
        let mut live = Vec::with_capacity(ids.len());
        for id in ids {
            if self.maybe_flake(id).await.is_ok() {
                live.push(id.clone());
            }
        }
        self.inner.vote(&live, instance).await
    }

    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError> {
        if self.maybe_flake(id).await.is_err() {
            return Err(PoolError::Timeout);
        }
        self.inner.reserve_and_recast_vote(id, instance).await
    }

    async fn release(&self, id: &str, instance: &Instance) {
        if self.maybe_flake(id).await.is_err() {
            return;
        }
        self.inner.release(id, instance).await;
    }

    async fn claim(&self, id: &str, instance: &Instance) {
        if self.maybe_flake(id).await.is_err() {
            return;
        }
        self.inner.claim(id, instance).await;
    }

    async fn total_resources(&self, id: &str) -> Option<u32> {
        if self.maybe_flake(id).await.is_err() {
            return None;
        }
        self.inner.total_resources(id).await
    }

    async fn instances(&self, id: &str) -> Option<Vec<Instance>> {
        if self.maybe_flake(id).await.is_err() {
            return None;
        }
        self.inner.instances(id).await
    }

    async fn set_instances(&self, id: &str, instances: Vec<Instance>) {
        if self.maybe_flake(id).await.is_err() {
            return;
        }
        self.inner.set_instances(id, instances).await;
    }

    async fn reset(&self, id: &str) {
        if self.maybe_flake(id).await.is_err() {
            return;
        }
        self.inner.reset(id).await;
    }
}

#[async_trait]
impl RepPoolClient for Arc<dyn RepPoolClient> {
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult> {
        (**self).vote(ids, instance).await
    }

    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError> {
        (**self).reserve_and_recast_vote(id, instance).await
    }

    async fn release(&self, id: &str, instance: &Instance) {
        (**self).release(id, instance).await;
    }

    async fn claim(&self, id: &str, instance: &Instance) {
        (**self).claim(id, instance).await;
    }

    async fn total_resources(&self, id: &str) -> Option<u32> {
        (**self).total_resources(id).await
    }

    async fn instances(&self, id: &str) -> Option<Vec<Instance>> {
        (**self).instances(id).await
    }

    async fn set_instances(&self, id: &str, instances: Vec<Instance>) {
        (**self).set_instances(id, instances).await;
    }

    async fn reset(&self, id: &str) {
        (**self).reset(id).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use auction_types::AppGuid;

    use super::*;
    use crate::in_process::InProcessPoolClient;

    #[tokio::test(start_paused = true)]
    async fn fully_flaky_rep_never_answers_a_vote() {
        let rep = auction_representative::Representative::new("rep-1", 100);
        let inner = InProcessPoolClient::new([rep]);
        let config = LossyConfig {
            flakiness: 1.0,
            flaky_reps: ["rep-1".to_owned()].into_iter().collect(),
            timeout: Duration::from_millis(10),
            ..LossyConfig::default()
        };
        let lossy = LossyPoolClient::new(inner, config);

        let instance = Instance::new(AppGuid::new("app"), 10);
        let votes = lossy.vote(&["rep-1".to_owned()], &instance).await;
        assert!(votes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn non_flaky_rep_always_answers() {
        let rep = auction_representative::Representative::new("rep-1", 100);
        let inner = InProcessPoolClient::new([rep]);
        let lossy = LossyPoolClient::new(inner, LossyConfig::default());

        let instance = Instance::new(AppGuid::new("app"), 10);
        let votes = lossy.vote(&["rep-1".to_owned()], &instance).await;
        assert_eq!(votes.len(), 1);
    }
}
