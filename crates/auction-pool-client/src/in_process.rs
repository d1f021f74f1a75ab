//! The in-process pool client: direct calls against representatives living
//! in the same process, with no transport in between.
//!
//! Used by single-process tests and by a remote auctioneer worker talking
//! to its own locally-owned representatives.

use std::collections::HashMap;

use async_trait::async_trait;
use auction_representative::{
    InsufficientResources,
    Representative,
};
use auction_types::{
    Instance,
    VoteResult,
};

use crate::{
    PoolError,
    RepPoolClient,
};

/// A pool client addressing a fixed set of representatives by guid.
#[derive(Clone, Default)]
pub struct InProcessPoolClient {
    reps: HashMap<String, Representative>,
}

impl InProcessPoolClient {
    #[must_use]
    pub fn new(reps: impl IntoIterator<Item = Representative>) -> Self {
        Self {
            reps: reps.into_iter().map(|rep| (rep.guid().to_owned(), rep)).collect(),
        }
    }
}

impl From<InsufficientResources> for PoolError {
    fn from(_: InsufficientResources) -> Self {
        Self::InsufficientResources
    }
}

#[async_trait]
impl RepPoolClient for InProcessPoolClient {
    async fn vote(&self, ids: &[String], instance: &Instance) -> Vec<VoteResult> {
        ids.iter()
            .filter_map(|id| self.reps.get(id))
            .filter_map(|rep| match rep.vote(instance) {
                Ok(score) => Some(VoteResult::ok(rep.guid(), score)),
                Err(_insufficient_resources) => None,
            })
            .collect()
    }

    async fn reserve_and_recast_vote(
        &self,
        id: &str,
        instance: &Instance,
    ) -> Result<f64, PoolError> {
        let rep = self.reps.get(id).ok_or_else(|| PoolError::RequestFailed(id.to_owned()))?;
        Ok(rep.reserve_and_recast_vote(instance)?)
    }

    async fn release(&self, id: &str, instance: &Instance) {
        if let Some(rep) = self.reps.get(id) {
            rep.release(instance);
        }
    }

    async fn claim(&self, id: &str, instance: &Instance) {
        if let Some(rep) = self.reps.get(id) {
            rep.claim(instance);
        }
    }

    async fn total_resources(&self, id: &str) -> Option<u32> {
        self.reps.get(id).map(Representative::total_resources)
    }

    async fn instances(&self, id: &str) -> Option<Vec<Instance>> {
        self.reps.get(id).map(Representative::instances)
    }

    async fn set_instances(&self, id: &str, instances: Vec<Instance>) {
        if let Some(rep) = self.reps.get(id) {
            rep.set_instances(instances);
        }
    }

    async fn reset(&self, id: &str) {
        if let Some(rep) = self.reps.get(id) {
            rep.reset();
        }
    }
}
