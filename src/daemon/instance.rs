use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::store::{
    blob_storage::BlobStorage,
    entities::{InstanceDescriptor, InstanceId},
    gateway::PersistenceGateway,
};

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(2);
pub const STALE_AFTER: chrono::Duration = chrono::Duration::seconds(5);

/// Refreshes `self_id` in the shared list, drops instances that stopped pinging and decides
/// whether `self_id` is the oldest live instance.
pub fn elect(
    mut descriptors: Vec<InstanceDescriptor>,
    self_id: InstanceId,
    now: DateTime<Utc>,
    stale_after: chrono::Duration,
) -> (Vec<InstanceDescriptor>, bool) {
    descriptors.retain(|v| now - v.last_ping <= stale_after);

    match descriptors.iter_mut().find(|v| v.id == self_id) {
        Some(current) => current.last_ping = now,
        None => descriptors.push(InstanceDescriptor {
            id: self_id,
            last_ping: now,
        }),
    }

    descriptors.sort_by_key(|v| v.id);
    let is_primary = descriptors.first().is_some_and(|v| v.id == self_id);
    (descriptors, is_primary)
}

/// Advertises the liveness of this daemon to every other one. The primary instance is the only
/// one performing auto-saves. Writes to the shared list are not synchronized, two daemons can
/// overwrite each other's ping, which the next refresh repairs.
pub struct InstanceCoordinator {
    id: InstanceId,
    is_primary: bool,
    ping_interval: Duration,
}

impl InstanceCoordinator {
    pub fn new(id: InstanceId, ping_interval: Duration) -> Self {
        Self {
            id,
            is_primary: true,
            ping_interval,
        }
    }

    /// Identifier derived from the creation instant so that older instances sort first.
    pub fn created_at(now: DateTime<Utc>) -> Self {
        Self::new(
            InstanceId(now.timestamp_millis().max(0) as u64),
            DEFAULT_PING_INTERVAL,
        )
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub async fn refresh<S: BlobStorage>(
        &mut self,
        gateway: &PersistenceGateway<S>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let descriptors = gateway.load_instances().await?;
        let (descriptors, is_primary) = elect(descriptors, self.id, now, STALE_AFTER);
        gateway.save_instances(&descriptors).await?;

        if is_primary != self.is_primary {
            info!(
                "Instance {} is {} primary",
                self.id,
                if is_primary { "now" } else { "no longer" }
            );
        }
        debug!("{} live instances", descriptors.len());
        self.is_primary = is_primary;
        Ok(is_primary)
    }

    pub async fn leave<S: BlobStorage>(&self, gateway: &PersistenceGateway<S>) -> Result<()> {
        let mut descriptors = gateway.load_instances().await?;
        descriptors.retain(|v| v.id != self.id);
        gateway.save_instances(&descriptors).await?;
        info!("Instance {} left", self.id);
        Ok(())
    }
}
