use async_trait::async_trait;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::buddy_request::{BuddyRequest, BuddyRequestStatus, NewBuddyRequest};
use crate::store::{
    InsertedRequest, OpenRequest, RelationshipStore, StatusTransition, StoreError,
};

/// In-process relationship store. A single lock is held across every check-and-write, which
/// serializes all mutations.
#[derive(Default)]
pub struct MemoryStore {
    requests: Mutex<HashMap<Uuid, BuddyRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn active_as_joiner(
    requests: &HashMap<Uuid, BuddyRequest>,
    user_id: Uuid,
    now: SystemTime,
) -> Option<&BuddyRequest> {
    requests
        .values()
        .find(|r| r.joiner_id == user_id && r.is_active_at(now))
}

fn has_active_joiners(
    requests: &HashMap<Uuid, BuddyRequest>,
    user_id: Uuid,
    now: SystemTime,
) -> bool {
    requests
        .values()
        .any(|r| r.receiver_id == user_id && r.is_active_at(now))
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn get(&self, request_id: Uuid) -> Result<BuddyRequest, StoreError> {
        self.requests
            .lock()
            .await
            .get(&request_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_open_request(
        &self,
        request: OpenRequest,
        now: SystemTime,
    ) -> Result<InsertedRequest, StoreError> {
        let mut requests = self.requests.lock().await;

        if let Some(existing) = active_as_joiner(&requests, request.joiner_id, now) {
            return Err(StoreError::JoinerHasOpenRequest(existing.clone()));
        }

        if has_active_joiners(&requests, request.joiner_id, now) {
            return Err(StoreError::JoinerIsReceiving);
        }

        if active_as_joiner(&requests, request.receiver_id, now).is_some() {
            return Err(StoreError::ReceiverIsJoining);
        }

        let mut closed_lapsed = Vec::new();
        for lapsed in requests
            .values_mut()
            .filter(|r| r.joiner_id == request.joiner_id && r.is_lapsed_at(now))
        {
            lapsed.status = BuddyRequestStatus::Cancelled;
            lapsed.modified_timestamp = now;
            closed_lapsed.push(lapsed.clone());
        }

        let new_request = NewBuddyRequest {
            id: Uuid::now_v7(),
            joiner_id: request.joiner_id,
            receiver_id: request.receiver_id,
            status: BuddyRequestStatus::Pending,
            created_timestamp: now,
            modified_timestamp: now,
            cutoff_date: Some(request.cutoff_date),
            order_count: 0,
            shipping_address_snapshot: Some(&request.shipping_address),
        };

        let created = BuddyRequest::from(&new_request);
        requests.insert(created.id, created.clone());

        Ok(InsertedRequest {
            request: created,
            closed_lapsed,
        })
    }

    async fn transition(
        &self,
        transition: StatusTransition,
        now: SystemTime,
    ) -> Result<BuddyRequest, StoreError> {
        let mut requests = self.requests.lock().await;

        let current = requests
            .get(&transition.request_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        if current.status != transition.from {
            return Err(StoreError::StatusMismatch(current));
        }

        if transition.require_receiver_unattached
            && active_as_joiner(&requests, current.receiver_id, now).is_some()
        {
            return Err(StoreError::ReceiverIsJoining);
        }

        let Some(record) = requests.get_mut(&transition.request_id) else {
            return Err(StoreError::NotFound);
        };

        record.status = transition.to;
        record.modified_timestamp = now;

        if let Some(cutoff_date) = transition.cutoff_date {
            record.cutoff_date = Some(cutoff_date);
        }

        if let Some(shipping_address) = transition.shipping_address {
            record.shipping_address_snapshot = Some(shipping_address);
        }

        Ok(record.clone())
    }

    async fn open_request_for_joiner(
        &self,
        joiner_id: Uuid,
    ) -> Result<Option<BuddyRequest>, StoreError> {
        Ok(self
            .requests
            .lock()
            .await
            .values()
            .find(|r| r.joiner_id == joiner_id && r.is_open())
            .cloned())
    }

    async fn open_requests_for_receiver(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<BuddyRequest>, StoreError> {
        let mut open_requests = self
            .requests
            .lock()
            .await
            .values()
            .filter(|r| r.receiver_id == receiver_id && r.is_open())
            .cloned()
            .collect::<Vec<_>>();

        open_requests.sort_by_key(|r| (r.created_timestamp, r.id));
        Ok(open_requests)
    }

    async fn set_order_count(&self, request_id: Uuid, order_count: i32) -> Result<(), StoreError> {
        let mut requests = self.requests.lock().await;
        let record = requests.get_mut(&request_id).ok_or(StoreError::NotFound)?;
        record.order_count = order_count;
        Ok(())
    }

    async fn history_for_user(&self, user_id: Uuid) -> Result<Vec<BuddyRequest>, StoreError> {
        let mut history = self
            .requests
            .lock()
            .await
            .values()
            .filter(|r| r.joiner_id == user_id || r.receiver_id == user_id)
            .cloned()
            .collect::<Vec<_>>();

        history.sort_by(|a, b| {
            b.created_timestamp
                .cmp(&a.created_timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(history)
    }
}
