use std::sync::Arc;

use uuid::Uuid;

use crate::directory::ShipmentLedger;
use crate::lifecycle::{BuddyError, BuddyRequestManager, Clock, SystemClock};
use crate::models::buddy_request::BuddyRequest;
use crate::models::shipment_cycle::ShipmentCycle;
use crate::store::RelationshipStore;

/// The one role a user presents as. A user with any active joiner is a receiver, even if
/// a stale joiner record of their own exists.
#[derive(Clone, Debug, PartialEq)]
pub enum BuddyRole {
    Receiver { joiners: Vec<BuddyRequest> },
    Joiner { request: Option<BuddyRequest> },
}

/// Reads roles from the store. Refreshed order counts are written back through the
/// `BuddyRequestManager`.
pub struct RoleResolver {
    store: Arc<dyn RelationshipStore>,
    ledger: Arc<dyn ShipmentLedger>,
    manager: Arc<BuddyRequestManager>,
    clock: Arc<dyn Clock>,
}

impl RoleResolver {
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        ledger: Arc<dyn ShipmentLedger>,
        manager: Arc<BuddyRequestManager>,
    ) -> Self {
        Self {
            store,
            ledger,
            manager,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn resolve(&self, user_id: Uuid) -> Result<BuddyRole, BuddyError> {
        let joiners = self.joiners_for(user_id).await?;

        if !joiners.is_empty() {
            return Ok(BuddyRole::Receiver { joiners });
        }

        Ok(BuddyRole::Joiner {
            request: self.request_for(user_id).await?,
        })
    }

    /// Active requests targeting `receiver_id`, oldest first
    pub async fn joiners_for(&self, receiver_id: Uuid) -> Result<Vec<BuddyRequest>, BuddyError> {
        let now = self.clock.now();

        let mut joiners = self
            .store
            .open_requests_for_receiver(receiver_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active_at(now))
            .collect::<Vec<_>>();

        if joiners.is_empty() {
            return Ok(joiners);
        }

        let cycle = self.ledger.active_cycle(receiver_id, now).await?;

        for request in joiners.iter_mut() {
            self.refresh_order_count(request, cycle.as_ref()).await?;
        }

        Ok(joiners)
    }

    /// The joiner's own active request, if any
    pub async fn request_for(&self, joiner_id: Uuid) -> Result<Option<BuddyRequest>, BuddyError> {
        let now = self.clock.now();

        let Some(mut request) = self.store.open_request_for_joiner(joiner_id).await? else {
            return Ok(None);
        };

        if !request.is_active_at(now) {
            return Ok(None);
        }

        let cycle = self.ledger.active_cycle(request.receiver_id, now).await?;
        self.refresh_order_count(&mut request, cycle.as_ref()).await?;

        Ok(Some(request))
    }

    async fn refresh_order_count(
        &self,
        request: &mut BuddyRequest,
        cycle: Option<&ShipmentCycle>,
    ) -> Result<(), BuddyError> {
        let Some(cycle) = cycle else {
            return Ok(());
        };

        let count = self.ledger.order_count(request.joiner_id, cycle.id).await?;
        let count = i32::try_from(count).unwrap_or(i32::MAX);

        if count != request.order_count {
            self.manager.record_order_count(request.id, count).await?;
            request.order_count = count;
        }

        Ok(())
    }
}
