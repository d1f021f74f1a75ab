use std::{
    collections::HashMap,
    sync::Arc,
    time::Instant,
};

use auction_types::{
    AppGuid,
    Instance,
    InstanceGuid,
};
use parking_lot::Mutex;
use tracing::instrument;

use crate::error::InsufficientResources;

/// A per-host bookkeeper tracking committed and tentatively reserved
/// instances against a fixed capacity.
///
/// All public operations are atomic with respect to each other: they take
/// the same lock over the whole instance table for their duration. None of
/// them suspend, so the lock is never held across an `.await` point.
#[derive(Clone)]
pub struct Representative {
    guid: String,
    inner: Arc<Inner>,
}

struct Inner {
    total_resources: u32,
    table: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    instances: HashMap<InstanceGuid, Instance>,
    tentative_since: HashMap<InstanceGuid, Instant>,
}

impl Representative {
    #[must_use]
    pub fn new(guid: impl Into<String>, total_resources: u32) -> Self {
        Self {
            guid: guid.into(),
            inner: Arc::new(Inner {
                total_resources,
                table: Mutex::new(Table::default()),
            }),
        }
    }

    #[must_use]
    pub fn guid(&self) -> &str {
        &self.guid
    }

    #[must_use]
    pub fn total_resources(&self) -> u32 {
        self.inner.total_resources
    }

    /// A snapshot of every instance currently tracked, committed or
    /// tentative.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        self.inner.table.lock().instances.values().cloned().collect()
    }

    /// Replaces the whole instance table. Used by tests to set up fixture
    /// state.
    pub fn set_instances(&self, instances: Vec<Instance>) {
        let mut table = self.inner.table.lock();
        table.instances = instances
            .into_iter()
            .map(|instance| (instance.instance_guid.clone(), instance))
            .collect();
        table.tentative_since.clear();
    }

    /// Empties the instance table.
    pub fn reset(&self) {
        let mut table = self.inner.table.lock();
        table.instances.clear();
        table.tentative_since.clear();
    }

    /// Scores `instance` against the current table without reserving
    /// anything.
    ///
    /// # Errors
    /// Returns [`InsufficientResources`] if there is no room for
    /// `instance` given the representative's current usage.
    #[instrument(skip_all, fields(rep = %self.guid, instance = %instance.instance_guid), err)]
    pub fn vote(&self, instance: &Instance) -> Result<f64, InsufficientResources> {
        let table = self.inner.table.lock();
        table.vote(self.inner.total_resources, instance)
    }

    /// Scores `instance` using the state *before* reservation, then
    /// tentatively reserves it.
    ///
    /// The ordering is load-bearing: the score returned here is what the
    /// auctioneer compares against competing bids, so it must reflect the
    /// state the representative was in when it decided to accept the
    /// reservation, not the state after.
    ///
    /// Idempotent on `instance.instance_guid`: reserving the same guid
    /// twice while it is still tentative just re-scores and leaves the
    /// existing reservation in place.
    ///
    /// # Errors
    /// Returns [`InsufficientResources`] if there is no room for
    /// `instance`.
    #[instrument(skip_all, fields(rep = %self.guid, instance = %instance.instance_guid), err)]
    pub fn reserve_and_recast_vote(
        &self,
        instance: &Instance,
    ) -> Result<f64, InsufficientResources> {
        let mut table = self.inner.table.lock();
        let score = table.vote(self.inner.total_resources, instance)?;

        let mut reserved = instance.clone();
        reserved.tentative = true;
        table
            .tentative_since
            .insert(reserved.instance_guid.clone(), Instant::now());
        table.instances.insert(reserved.instance_guid.clone(), reserved);

        Ok(score)
    }

    /// Rolls back a tentative reservation.
    ///
    /// # Panics
    /// Panics if `instance.instance_guid` is absent or is not currently
    /// tentative. This is a contract violation on the part of the caller
    /// (the auctioneer must only release what it just reserved) and is
    /// intentionally fatal rather than silently ignored.
    #[instrument(skip_all, fields(rep = %self.guid, instance = %instance.instance_guid))]
    pub fn release(&self, instance: &Instance) {
        let mut table = self.inner.table.lock();
        match table.instances.get(&instance.instance_guid) {
            Some(existing) if existing.tentative => {
                table.instances.remove(&instance.instance_guid);
                table.tentative_since.remove(&instance.instance_guid);
            }
            Some(_) => panic!(
                "contract violation: release of committed instance `{}` on representative `{}`",
                instance.instance_guid, self.guid
            ),
            None => panic!(
                "contract violation: release of absent instance `{}` on representative `{}`",
                instance.instance_guid, self.guid
            ),
        }
    }

    /// Finalizes a tentative reservation.
    ///
    /// # Panics
    /// Panics if `instance.instance_guid` is absent on this representative.
    #[instrument(skip_all, fields(rep = %self.guid, instance = %instance.instance_guid))]
    pub fn claim(&self, instance: &Instance) {
        let mut table = self.inner.table.lock();
        match table.instances.get_mut(&instance.instance_guid) {
            Some(existing) => {
                existing.tentative = false;
                table.tentative_since.remove(&instance.instance_guid);
            }
            None => panic!(
                "contract violation: claim of absent instance `{}` on representative `{}`",
                instance.instance_guid, self.guid
            ),
        }
    }

    /// Force-releases tentative reservations older than `horizon`, as a
    /// backstop against auctions that died without releasing or claiming.
    ///
    /// Returns the guids of the entries that were swept.
    pub(crate) fn sweep_orphans(&self, horizon: std::time::Duration) -> Vec<InstanceGuid> {
        let now = Instant::now();
        let mut table = self.inner.table.lock();
        let expired: Vec<InstanceGuid> = table
            .tentative_since
            .iter()
            .filter(|(_, since)| now.duration_since(**since) > horizon)
            .map(|(guid, _)| guid.clone())
            .collect();
        for guid in &expired {
            table.instances.remove(guid);
            table.tentative_since.remove(guid);
        }
        expired
    }
}

impl Table {
    fn vote(&self, total_resources: u32, instance: &Instance) -> Result<f64, InsufficientResources> {
        if !self.has_room_for(total_resources, instance) {
            return Err(InsufficientResources);
        }
        Ok(self.score(total_resources, &instance.app_guid))
    }

    fn has_room_for(&self, total_resources: u32, instance: &Instance) -> bool {
        self.used_resources() + instance.required_resources <= total_resources
    }

    fn score(&self, total_resources: u32, app_guid: &AppGuid) -> f64 {
        let fraction_used = f64::from(self.used_resources()) / f64::from(total_resources);
        let colocated = self.count_app_guid(app_guid);
        fraction_used + f64::from(u32::try_from(colocated).unwrap_or(u32::MAX))
    }

    fn used_resources(&self) -> u32 {
        self.instances.values().map(|i| i.required_resources).sum()
    }

    fn count_app_guid(&self, app_guid: &AppGuid) -> usize {
        self.instances.values().filter(|i| &i.app_guid == app_guid).count()
    }
}
