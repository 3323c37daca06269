use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::directory::{CandidateDirectory, DirectoryError, ShipmentLedger};
use crate::models::buddy_request::{BuddyRequest, BuddyRequestStatus};
use crate::store::{OpenRequest, RelationshipStore, StatusTransition, StoreError};
use crate::validators::{self, Validity};

pub mod events;

#[cfg(test)]
pub(crate) mod test_utils;

pub use events::{BuddyEvent, BuddyEventKind};

pub const DEFAULT_MIN_CUTOFF_LEAD_TIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

const NO_ACTIVE_CYCLE_MSG: &str = "This receiver has no open shipment cycle to join.";
const JOINER_HAS_JOINERS_MSG: &str =
    "You may request a receiver only when there are no existing joiners.";
const RECEIVER_IS_JOINING_MSG: &str =
    "This buyer ships through another receiver and cannot take joiners.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotFoundKind {
    Request,
    User,
}

#[derive(Debug)]
pub enum BuddyError {
    Validation(Cow<'static, str>),
    StaleState {
        request_id: Uuid,
        current: BuddyRequestStatus,
        lapsed: bool,
    },
    ReceiverNotEligible(String),
    NotFound(NotFoundKind),
    AlreadyRequested {
        request_id: Uuid,
        status: BuddyRequestStatus,
    },
    NotParticipant,
    Transient(String),
}

impl BuddyError {
    /// Eligibility failures carry a message meant to be shown to the user as-is
    pub fn presents_as_dialog(&self) -> bool {
        matches!(self, BuddyError::ReceiverNotEligible(_))
    }

    fn stale(current: &BuddyRequest, now: SystemTime) -> Self {
        BuddyError::StaleState {
            request_id: current.id,
            current: current.status,
            lapsed: current.is_lapsed_at(now),
        }
    }
}

impl std::error::Error for BuddyError {}

impl fmt::Display for BuddyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuddyError::Validation(msg) => write!(f, "BuddyError: Validation failed: {msg}"),
            BuddyError::StaleState {
                request_id,
                current,
                lapsed,
            } => {
                if *lapsed {
                    write!(
                        f,
                        "BuddyError: Buddy request {request_id} has lapsed (status {current})"
                    )
                } else {
                    write!(
                        f,
                        "BuddyError: Buddy request {request_id} is already {current}"
                    )
                }
            }
            BuddyError::ReceiverNotEligible(msg) => {
                write!(f, "BuddyError: Receiver not eligible: {msg}")
            }
            BuddyError::NotFound(NotFoundKind::Request) => {
                write!(f, "BuddyError: Buddy request not found")
            }
            BuddyError::NotFound(NotFoundKind::User) => write!(f, "BuddyError: Buyer not found"),
            BuddyError::AlreadyRequested { request_id, status } => write!(
                f,
                "BuddyError: Joiner already has buddy request {request_id} ({status})"
            ),
            BuddyError::NotParticipant => {
                write!(f, "BuddyError: User is not a party to this buddy request")
            }
            BuddyError::Transient(msg) => write!(f, "BuddyError: Temporary failure: {msg}"),
        }
    }
}

impl From<StoreError> for BuddyError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => BuddyError::NotFound(NotFoundKind::Request),
            StoreError::JoinerHasOpenRequest(existing) => BuddyError::AlreadyRequested {
                request_id: existing.id,
                status: existing.status,
            },
            StoreError::JoinerIsReceiving => {
                BuddyError::ReceiverNotEligible(String::from(JOINER_HAS_JOINERS_MSG))
            }
            StoreError::ReceiverIsJoining => {
                BuddyError::ReceiverNotEligible(String::from(RECEIVER_IS_JOINING_MSG))
            }
            StoreError::StatusMismatch(current) => BuddyError::StaleState {
                request_id: current.id,
                current: current.status,
                lapsed: false,
            },
            StoreError::Unavailable(msg) => BuddyError::Transient(msg),
        }
    }
}

impl From<DirectoryError> for BuddyError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Unavailable(msg) => BuddyError::Transient(msg),
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// How far in the future a receiver's cutoff must be for a new request to be accepted
    pub min_cutoff_lead_time: Duration,
    pub event_channel_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_cutoff_lead_time: DEFAULT_MIN_CUTOFF_LEAD_TIME,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Party {
    Joiner,
    Receiver,
}

struct Edge {
    kind: BuddyEventKind,
    actor: Party,
    from: BuddyRequestStatus,
    to: BuddyRequestStatus,
    // A retry that finds the record already in `to` gets the record back unchanged
    idempotent: bool,
    refresh_cycle: bool,
}

const APPROVE: Edge = Edge {
    kind: BuddyEventKind::Approved,
    actor: Party::Receiver,
    from: BuddyRequestStatus::Pending,
    to: BuddyRequestStatus::Approved,
    idempotent: true,
    refresh_cycle: true,
};

const REJECT_JOIN: Edge = Edge {
    kind: BuddyEventKind::Rejected,
    actor: Party::Receiver,
    from: BuddyRequestStatus::Pending,
    to: BuddyRequestStatus::Rejected,
    idempotent: false,
    refresh_cycle: false,
};

const REQUEST_CANCEL: Edge = Edge {
    kind: BuddyEventKind::CancelRequested,
    actor: Party::Joiner,
    from: BuddyRequestStatus::Approved,
    to: BuddyRequestStatus::PendingCancel,
    idempotent: true,
    refresh_cycle: false,
};

const CONFIRM_CANCEL: Edge = Edge {
    kind: BuddyEventKind::CancelConfirmed,
    actor: Party::Receiver,
    from: BuddyRequestStatus::PendingCancel,
    to: BuddyRequestStatus::Cancelled,
    idempotent: false,
    refresh_cycle: false,
};

const DECLINE_CANCEL: Edge = Edge {
    kind: BuddyEventKind::CancelDeclined,
    actor: Party::Receiver,
    from: BuddyRequestStatus::PendingCancel,
    to: BuddyRequestStatus::Approved,
    idempotent: true,
    refresh_cycle: false,
};

const WITHDRAW: Edge = Edge {
    kind: BuddyEventKind::Withdrawn,
    actor: Party::Joiner,
    from: BuddyRequestStatus::Pending,
    to: BuddyRequestStatus::Cancelled,
    idempotent: false,
    refresh_cycle: false,
};

/// Owns every write to the relationship store and publishes a `BuddyEvent` for each
/// transition that changed a record.
pub struct BuddyRequestManager {
    store: Arc<dyn RelationshipStore>,
    directory: Arc<dyn CandidateDirectory>,
    ledger: Arc<dyn ShipmentLedger>,
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BuddyEvent>,
}

impl BuddyRequestManager {
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        directory: Arc<dyn CandidateDirectory>,
        ledger: Arc<dyn ShipmentLedger>,
        config: LifecycleConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            store,
            directory,
            ledger,
            config,
            clock: Arc::new(SystemClock),
            events,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuddyEvent> {
        self.events.subscribe()
    }

    pub async fn submit(
        &self,
        joiner_id: Uuid,
        receiver_username_or_id: &str,
    ) -> Result<BuddyRequest, BuddyError> {
        if let Validity::Invalid(msg) =
            validators::validate_receiver_identifier(receiver_username_or_id)
        {
            return Err(BuddyError::Validation(Cow::Borrowed(msg)));
        }

        let receiver = self
            .directory
            .find_buyer(receiver_username_or_id)
            .await?
            .ok_or(BuddyError::NotFound(NotFoundKind::User))?;

        if receiver.id == joiner_id {
            return Err(BuddyError::Validation(Cow::Borrowed(
                "You cannot ship with yourself.",
            )));
        }

        let now = self.clock.now();

        let cycle = self
            .ledger
            .active_cycle(receiver.id, now)
            .await?
            .ok_or_else(|| BuddyError::ReceiverNotEligible(String::from(NO_ACTIVE_CYCLE_MSG)))?;

        let earliest_cutoff = now.checked_add(self.config.min_cutoff_lead_time);
        if earliest_cutoff.map_or(true, |earliest| cycle.cutoff_date < earliest) {
            let lead_days = self.config.min_cutoff_lead_time.as_secs().div_ceil(86400);
            return Err(BuddyError::ReceiverNotEligible(format!(
                "This receiver's next shipment cutoff is less than {lead_days} days away."
            )));
        }

        let inserted = self
            .store
            .insert_open_request(
                OpenRequest {
                    joiner_id,
                    receiver_id: receiver.id,
                    cutoff_date: cycle.cutoff_date,
                    shipping_address: cycle.shipping_address,
                },
                now,
            )
            .await?;

        for closed in &inserted.closed_lapsed {
            self.publish(BuddyEventKind::Lapsed, closed, joiner_id, now);
        }

        self.publish(BuddyEventKind::Submitted, &inserted.request, joiner_id, now);

        Ok(inserted.request)
    }

    pub async fn approve(
        &self,
        request_id: Uuid,
        acting_receiver_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_receiver_id, &APPROVE).await
    }

    /// Denies whatever the joiner is waiting on: a pending join request is rejected, a
    /// pending cancellation is declined.
    pub async fn reject(
        &self,
        request_id: Uuid,
        acting_receiver_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        let current = self.store.get(request_id).await?;

        match current.status {
            BuddyRequestStatus::PendingCancel => {
                self.decline_cancel(request_id, acting_receiver_id).await
            }
            _ => self.reject_join(request_id, acting_receiver_id).await,
        }
    }

    pub async fn reject_join(
        &self,
        request_id: Uuid,
        acting_receiver_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_receiver_id, &REJECT_JOIN).await
    }

    pub async fn decline_cancel(
        &self,
        request_id: Uuid,
        acting_receiver_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_receiver_id, &DECLINE_CANCEL).await
    }

    pub async fn request_cancel(
        &self,
        request_id: Uuid,
        acting_joiner_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_joiner_id, &REQUEST_CANCEL).await
    }

    pub async fn confirm_cancel(
        &self,
        request_id: Uuid,
        acting_receiver_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_receiver_id, &CONFIRM_CANCEL).await
    }

    pub async fn withdraw(
        &self,
        request_id: Uuid,
        acting_joiner_id: Uuid,
    ) -> Result<BuddyRequest, BuddyError> {
        self.apply(request_id, acting_joiner_id, &WITHDRAW).await
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<BuddyRequest>, BuddyError> {
        Ok(self.store.history_for_user(user_id).await?)
    }

    /// Stores the joiner's order count for the receiver's current cycle. Counts are
    /// bookkeeping, not a transition, so no event is published.
    pub async fn record_order_count(
        &self,
        request_id: Uuid,
        order_count: i32,
    ) -> Result<(), BuddyError> {
        Ok(self.store.set_order_count(request_id, order_count).await?)
    }

    async fn apply(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        edge: &Edge,
    ) -> Result<BuddyRequest, BuddyError> {
        let now = self.clock.now();
        let current = self.store.get(request_id).await?;

        let expected_actor = match edge.actor {
            Party::Joiner => current.joiner_id,
            Party::Receiver => current.receiver_id,
        };

        if actor_id != expected_actor {
            return Err(BuddyError::NotParticipant);
        }

        if let Some(unchanged) = settled(&current, edge, now)? {
            return Ok(unchanged);
        }

        let mut transition = StatusTransition {
            request_id,
            from: edge.from,
            to: edge.to,
            cutoff_date: None,
            shipping_address: None,
            require_receiver_unattached: false,
        };

        if edge.refresh_cycle {
            let cycle = self
                .ledger
                .active_cycle(current.receiver_id, now)
                .await?
                .ok_or_else(|| {
                    BuddyError::ReceiverNotEligible(String::from(NO_ACTIVE_CYCLE_MSG))
                })?;

            transition.cutoff_date = Some(cycle.cutoff_date);
            transition.shipping_address = Some(cycle.shipping_address);
            transition.require_receiver_unattached = true;
        }

        let updated = match self.store.transition(transition, now).await {
            Ok(updated) => updated,
            // Lost a race with another writer; a duplicate of this same call still succeeds
            Err(StoreError::StatusMismatch(latest)) => {
                return match settled(&latest, edge, now)? {
                    Some(unchanged) => Ok(unchanged),
                    None => Err(BuddyError::stale(&latest, now)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        self.publish(edge.kind, &updated, actor_id, now);

        Ok(updated)
    }

    fn publish(
        &self,
        kind: BuddyEventKind,
        request: &BuddyRequest,
        actor_id: Uuid,
        at: SystemTime,
    ) {
        let event = BuddyEvent {
            kind,
            request: request.clone(),
            actor_id,
            at,
        };

        log::debug!("{event}");

        // Sending only fails when nobody is subscribed
        let _ = self.events.send(event);
    }
}

/// Decides a transition without touching the store. `Ok(Some(_))` means the edge has
/// already been applied, `Ok(None)` means the record is in the edge's source status.
fn settled(
    current: &BuddyRequest,
    edge: &Edge,
    now: SystemTime,
) -> Result<Option<BuddyRequest>, BuddyError> {
    if current.status.is_terminal() || current.is_lapsed_at(now) {
        return Err(BuddyError::stale(current, now));
    }

    if edge.idempotent && current.status == edge.to {
        return Ok(Some(current.clone()));
    }

    if current.status != edge.from {
        return Err(BuddyError::stale(current, now));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_utils::{days, Harness};

    use futures::future;
    use tokio::sync::broadcast::error::TryRecvError;

    fn assert_stale(
        result: Result<BuddyRequest, BuddyError>,
        expected: BuddyRequestStatus,
        expected_lapsed: bool,
    ) {
        match result {
            Err(BuddyError::StaleState {
                current, lapsed, ..
            }) => {
                assert_eq!(current, expected);
                assert_eq!(lapsed, expected_lapsed);
            }
            other => panic!("Expected StaleState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_request_from_active_cycle() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;
        let receiver = h.receiver("harbor").await;

        let created = h.manager.submit(joiner.id, "@Harbor").await.unwrap();

        assert_eq!(created.status, BuddyRequestStatus::Pending);
        assert_eq!(created.joiner_id, joiner.id);
        assert_eq!(created.receiver_id, receiver.id);
        assert_eq!(created.cutoff_date, Some(h.clock.now() + days(10)));
        assert_eq!(
            created.shipping_address_snapshot.as_deref(),
            Some("harbor Depot")
        );
        assert_eq!(created.order_count, 0);

        let by_id = h.buyer("keel").await;
        let created = h
            .manager
            .submit(by_id.id, &receiver.id.to_string())
            .await
            .unwrap();
        assert_eq!(created.receiver_id, receiver.id);
    }

    #[tokio::test]
    async fn submit_validates_receiver() {
        let h = Harness::new();
        let joiner = h.receiver("anchor").await;

        assert!(matches!(
            h.manager.submit(joiner.id, "  ").await,
            Err(BuddyError::Validation(_))
        ));

        assert!(matches!(
            h.manager.submit(joiner.id, "nobody").await,
            Err(BuddyError::NotFound(NotFoundKind::User))
        ));

        assert!(matches!(
            h.manager.submit(joiner.id, "anchor").await,
            Err(BuddyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn submit_requires_cycle_with_lead_time() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;

        h.buyer("drifter").await;
        let result = h.manager.submit(joiner.id, "drifter").await;
        match result {
            Err(e @ BuddyError::ReceiverNotEligible(_)) => assert!(e.presents_as_dialog()),
            other => panic!("Expected ReceiverNotEligible, got {other:?}"),
        }

        let soon = h.buyer("soon").await;
        h.ledger
            .open_cycle(soon.id, h.clock.now() + days(3), "Soon Depot")
            .await;
        assert!(matches!(
            h.manager.submit(joiner.id, "soon").await,
            Err(BuddyError::ReceiverNotEligible(_))
        ));

        let exact = h.buyer("exact").await;
        h.ledger
            .open_cycle(exact.id, h.clock.now() + days(7), "Exact Depot")
            .await;
        assert!(h.manager.submit(joiner.id, "exact").await.is_ok());
    }

    #[tokio::test]
    async fn oversized_lead_time_makes_every_receiver_ineligible() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;
        h.receiver("harbor").await;

        let manager = BuddyRequestManager::new(
            h.store.clone(),
            h.directory.clone(),
            h.ledger.clone(),
            LifecycleConfig {
                min_cutoff_lead_time: Duration::MAX,
                ..LifecycleConfig::default()
            },
        )
        .with_clock(h.clock.clone());

        assert!(matches!(
            manager.submit(joiner.id, "harbor").await,
            Err(BuddyError::ReceiverNotEligible(_))
        ));
    }

    #[tokio::test]
    async fn joiner_holds_at_most_one_open_request() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;
        h.receiver("harbor").await;
        h.receiver("quay").await;

        let first = h.manager.submit(joiner.id, "harbor").await.unwrap();

        match h.manager.submit(joiner.id, "quay").await {
            Err(BuddyError::AlreadyRequested { request_id, status }) => {
                assert_eq!(request_id, first.id);
                assert_eq!(status, BuddyRequestStatus::Pending);
            }
            other => panic!("Expected AlreadyRequested, got {other:?}"),
        }

        h.manager.reject_join(first.id, first.receiver_id).await.unwrap();
        assert!(h.manager.submit(joiner.id, "quay").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_for_one_joiner() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;

        let mut receivers = Vec::new();
        for i in 0..8 {
            receivers.push(h.receiver(&format!("receiver{i}")).await);
        }

        let joiner_id = joiner.id;
        let handles = receivers
            .iter()
            .map(|receiver| {
                let manager = Arc::clone(&h.manager);
                let receiver_id = receiver.id.to_string();
                tokio::spawn(async move { manager.submit(joiner_id, &receiver_id).await })
            })
            .collect::<Vec<_>>();

        let results = future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect::<Vec<_>>();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BuddyError::AlreadyRequested { .. })));

        let open = h.store.open_request_for_joiner(joiner.id).await.unwrap();
        assert!(open.is_some());
    }

    #[tokio::test]
    async fn receiver_with_joiners_cannot_join() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;
        h.receiver("quay").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.approve(request.id, b.id).await.unwrap();

        match h.manager.submit(b.id, "quay").await {
            Err(BuddyError::ReceiverNotEligible(msg)) => {
                assert_eq!(msg, JOINER_HAS_JOINERS_MSG)
            }
            other => panic!("Expected ReceiverNotEligible, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn joiner_cannot_become_receiver() {
        let h = Harness::new();
        let a = h.receiver("anchor").await;
        h.receiver("harbor").await;
        let c = h.buyer("keel").await;

        h.manager.submit(a.id, "harbor").await.unwrap();

        match h.manager.submit(c.id, "anchor").await {
            Err(BuddyError::ReceiverNotEligible(msg)) => {
                assert_eq!(msg, RECEIVER_IS_JOINING_MSG)
            }
            other => panic!("Expected ReceiverNotEligible, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn approve_snapshots_current_cycle_and_is_idempotent() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;
        let receiver = h.receiver("harbor").await;

        let request = h.manager.submit(joiner.id, "harbor").await.unwrap();

        let nearer = h
            .ledger
            .open_cycle(receiver.id, h.clock.now() + days(8), "Harbor Annex")
            .await;

        let approved = h.manager.approve(request.id, receiver.id).await.unwrap();
        assert_eq!(approved.status, BuddyRequestStatus::Approved);
        assert_eq!(approved.cutoff_date, Some(nearer.cutoff_date));
        assert_eq!(
            approved.shipping_address_snapshot.as_deref(),
            Some("Harbor Annex")
        );

        let mut events = h.manager.subscribe();

        let again = h.manager.approve(request.id, receiver.id).await.unwrap();
        assert_eq!(again, approved);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        let open = h.store.open_requests_for_receiver(receiver.id).await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn approve_requires_active_cycle() {
        let h = Harness::new();
        let joiner = h.buyer("anchor").await;
        let receiver = h.buyer("harbor").await;
        let cycle = h
            .ledger
            .open_cycle(receiver.id, h.clock.now() + days(10), "Harbor Depot")
            .await;

        let request = h.manager.submit(joiner.id, "harbor").await.unwrap();
        h.ledger.close_cycle(cycle.id).await;

        assert!(matches!(
            h.manager.approve(request.id, receiver.id).await,
            Err(BuddyError::ReceiverNotEligible(_))
        ));
        assert_eq!(
            h.store.get(request.id).await.unwrap().status,
            BuddyRequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn full_relationship_scenario() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::Pending);

        let request = h.manager.approve(request.id, b.id).await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::Approved);
        assert_eq!(request.cutoff_date, Some(h.clock.now() + days(10)));

        let request = h.manager.request_cancel(request.id, a.id).await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::PendingCancel);

        let request = h.manager.reject(request.id, b.id).await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::Approved);

        let request = h.manager.request_cancel(request.id, a.id).await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::PendingCancel);

        let request = h.manager.confirm_cancel(request.id, b.id).await.unwrap();
        assert_eq!(request.status, BuddyRequestStatus::Cancelled);

        let id = request.id;
        let cancelled = BuddyRequestStatus::Cancelled;
        assert_stale(h.manager.approve(id, b.id).await, cancelled, false);
        assert_stale(h.manager.reject(id, b.id).await, cancelled, false);
        assert_stale(h.manager.reject_join(id, b.id).await, cancelled, false);
        assert_stale(h.manager.decline_cancel(id, b.id).await, cancelled, false);
        assert_stale(h.manager.confirm_cancel(id, b.id).await, cancelled, false);
        assert_stale(h.manager.request_cancel(id, a.id).await, cancelled, false);
        assert_stale(h.manager.withdraw(id, a.id).await, cancelled, false);
    }

    #[tokio::test]
    async fn decline_cancel_round_trip() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.approve(request.id, b.id).await.unwrap();
        h.manager.request_cancel(request.id, a.id).await.unwrap();

        let again = h.manager.request_cancel(request.id, a.id).await.unwrap();
        assert_eq!(again.status, BuddyRequestStatus::PendingCancel);

        let declined = h.manager.decline_cancel(request.id, b.id).await.unwrap();
        assert_eq!(declined.status, BuddyRequestStatus::Approved);

        let again = h.manager.decline_cancel(request.id, b.id).await.unwrap();
        assert_eq!(again, declined);
    }

    #[tokio::test]
    async fn out_of_order_transitions_are_stale() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        let id = request.id;

        let pending = BuddyRequestStatus::Pending;
        assert_stale(h.manager.request_cancel(id, a.id).await, pending, false);
        assert_stale(h.manager.confirm_cancel(id, b.id).await, pending, false);
        assert_stale(h.manager.decline_cancel(id, b.id).await, pending, false);

        h.manager.approve(id, b.id).await.unwrap();

        let approved = BuddyRequestStatus::Approved;
        assert_stale(h.manager.reject_join(id, b.id).await, approved, false);
        assert_stale(h.manager.reject(id, b.id).await, approved, false);
        assert_stale(h.manager.confirm_cancel(id, b.id).await, approved, false);
        assert_stale(h.manager.withdraw(id, a.id).await, approved, false);

        h.manager.request_cancel(id, a.id).await.unwrap();

        let pending_cancel = BuddyRequestStatus::PendingCancel;
        assert_stale(h.manager.approve(id, b.id).await, pending_cancel, false);
        assert_stale(h.manager.reject_join(id, b.id).await, pending_cancel, false);
        assert_stale(h.manager.withdraw(id, a.id).await, pending_cancel, false);

        assert_eq!(
            h.store.get(id).await.unwrap().status,
            BuddyRequestStatus::PendingCancel
        );
    }

    #[tokio::test]
    async fn rejected_request_is_terminal() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        let rejected = h.manager.reject(request.id, b.id).await.unwrap();
        assert_eq!(rejected.status, BuddyRequestStatus::Rejected);

        let id = request.id;
        let status = BuddyRequestStatus::Rejected;
        assert_stale(h.manager.reject(id, b.id).await, status, false);
        assert_stale(h.manager.approve(id, b.id).await, status, false);
        assert_stale(h.manager.withdraw(id, a.id).await, status, false);
    }

    #[tokio::test]
    async fn withdraw_cancels_pending_request() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();

        assert!(matches!(
            h.manager.withdraw(request.id, b.id).await,
            Err(BuddyError::NotParticipant)
        ));

        let withdrawn = h.manager.withdraw(request.id, a.id).await.unwrap();
        assert_eq!(withdrawn.status, BuddyRequestStatus::Cancelled);

        assert_stale(
            h.manager.approve(request.id, b.id).await,
            BuddyRequestStatus::Cancelled,
            false,
        );
    }

    #[tokio::test]
    async fn only_participants_may_act() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;
        let stranger = h.buyer("stranger").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();

        assert!(matches!(
            h.manager.approve(request.id, a.id).await,
            Err(BuddyError::NotParticipant)
        ));
        assert!(matches!(
            h.manager.approve(request.id, stranger.id).await,
            Err(BuddyError::NotParticipant)
        ));

        h.manager.approve(request.id, b.id).await.unwrap();

        assert!(matches!(
            h.manager.request_cancel(request.id, b.id).await,
            Err(BuddyError::NotParticipant)
        ));

        h.manager.request_cancel(request.id, a.id).await.unwrap();

        assert!(matches!(
            h.manager.confirm_cancel(request.id, a.id).await,
            Err(BuddyError::NotParticipant)
        ));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let h = Harness::new();
        let id = Uuid::now_v7();

        assert!(matches!(
            h.manager.approve(id, Uuid::now_v7()).await,
            Err(BuddyError::NotFound(NotFoundKind::Request))
        ));
        assert!(matches!(
            h.manager.reject(id, Uuid::now_v7()).await,
            Err(BuddyError::NotFound(NotFoundKind::Request))
        ));
    }

    #[tokio::test]
    async fn lapsed_relationship_is_stale_and_does_not_block() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.approve(request.id, b.id).await.unwrap();

        h.clock.advance(days(11));

        assert_stale(
            h.manager.request_cancel(request.id, a.id).await,
            BuddyRequestStatus::Approved,
            true,
        );

        h.receiver("quay").await;
        let next = h.manager.submit(a.id, "quay").await.unwrap();
        assert_eq!(next.status, BuddyRequestStatus::Pending);

        let closed = h.store.get(request.id).await.unwrap();
        assert_eq!(closed.status, BuddyRequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn closing_lapsed_request_publishes_event() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let first = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.approve(first.id, b.id).await.unwrap();

        h.clock.advance(days(11));
        h.receiver("quay").await;

        let mut events = h.manager.subscribe();
        let second = h.manager.submit(a.id, "quay").await.unwrap();

        let lapsed = events.try_recv().unwrap();
        assert_eq!(lapsed.kind, BuddyEventKind::Lapsed);
        assert_eq!(lapsed.request.id, first.id);
        assert_eq!(lapsed.request.status, BuddyRequestStatus::Cancelled);
        assert_eq!(lapsed.actor_id, a.id);

        let submitted = events.try_recv().unwrap();
        assert_eq!(submitted.kind, BuddyEventKind::Submitted);
        assert_eq!(submitted.request.id, second.id);

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn transitions_publish_events() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let mut events = h.manager.subscribe();

        let request = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.approve(request.id, b.id).await.unwrap();
        h.manager.request_cancel(request.id, a.id).await.unwrap();
        h.manager.decline_cancel(request.id, b.id).await.unwrap();

        let expected = [
            (BuddyEventKind::Submitted, a.id, BuddyRequestStatus::Pending),
            (BuddyEventKind::Approved, b.id, BuddyRequestStatus::Approved),
            (
                BuddyEventKind::CancelRequested,
                a.id,
                BuddyRequestStatus::PendingCancel,
            ),
            (
                BuddyEventKind::CancelDeclined,
                b.id,
                BuddyRequestStatus::Approved,
            ),
        ];

        for (kind, actor_id, status) in expected {
            let event = events.try_recv().unwrap();
            assert_eq!(event.kind, kind);
            assert_eq!(event.actor_id, actor_id);
            assert_eq!(event.request.id, request.id);
            assert_eq!(event.request.status, status);
            assert_eq!(event.at, h.clock.now());
        }

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        h.manager.decline_cancel(request.id, b.id).await.unwrap();
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn history_lists_both_roles() {
        let h = Harness::new();
        let a = h.buyer("anchor").await;
        let b = h.receiver("harbor").await;

        let first = h.manager.submit(a.id, "harbor").await.unwrap();
        h.manager.reject(first.id, b.id).await.unwrap();
        h.clock.advance(Duration::from_secs(1));
        let second = h.manager.submit(a.id, "harbor").await.unwrap();

        let history = h.manager.history(b.id).await.unwrap();
        assert_eq!(
            history.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(h.manager.history(a.id).await.unwrap().len(), 2);
    }
}
