use async_trait::async_trait;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::DaoError;
use crate::models::buddy_request::{BuddyRequest, BuddyRequestStatus};

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    /// The joiner already holds a request that has not lapsed
    JoinerHasOpenRequest(BuddyRequest),
    /// The joiner has joiners of their own
    JoinerIsReceiving,
    /// The receiver holds a request as a joiner of someone else
    ReceiverIsJoining,
    /// Compare-and-set on the status failed; carries the record as it is now
    StatusMismatch(BuddyRequest),
    Unavailable(String),
}

impl std::error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "StoreError: Buddy request not found"),
            StoreError::JoinerHasOpenRequest(existing) => write!(
                f,
                "StoreError: Joiner already has request {} in status {}",
                existing.id, existing.status
            ),
            StoreError::JoinerIsReceiving => write!(f, "StoreError: Joiner has joiners"),
            StoreError::ReceiverIsJoining => {
                write!(f, "StoreError: Receiver is a joiner of another receiver")
            }
            StoreError::StatusMismatch(current) => write!(
                f,
                "StoreError: Buddy request {} is in status {}",
                current.id, current.status
            ),
            StoreError::Unavailable(msg) => write!(f, "StoreError: Storage unavailable: {msg}"),
        }
    }
}

impl From<DaoError> for StoreError {
    fn from(error: DaoError) -> Self {
        match error {
            DaoError::QueryFailure(diesel::result::Error::NotFound) => StoreError::NotFound,
            e if e.is_serialization_failure() => StoreError::Unavailable(String::from(
                "Transaction conflicted with a concurrent update",
            )),
            e => StoreError::Unavailable(e.to_string()),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::from(error).into()
    }
}

/// Data for a new pending request. The cutoff date and address come from the receiver's
/// active shipment cycle at the time of submission.
#[derive(Clone, Debug)]
pub struct OpenRequest {
    pub joiner_id: Uuid,
    pub receiver_id: Uuid,
    pub cutoff_date: SystemTime,
    pub shipping_address: String,
}

/// A newly inserted pending request, along with any lapsed requests of the same joiner that
/// were closed as cancelled to make room for it
#[derive(Clone, Debug)]
pub struct InsertedRequest {
    pub request: BuddyRequest,
    pub closed_lapsed: Vec<BuddyRequest>,
}

#[derive(Clone, Debug)]
pub struct StatusTransition {
    pub request_id: Uuid,
    pub from: BuddyRequestStatus,
    pub to: BuddyRequestStatus,
    pub cutoff_date: Option<SystemTime>,
    pub shipping_address: Option<String>,
    /// Fail with `ReceiverIsJoining` if the receiver holds an active request as a joiner
    pub require_receiver_unattached: bool,
}

/// Durable storage for buddy requests. Implementations must perform the eligibility checks
/// and the write of `insert_open_request` and `transition` as one atomic step.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn get(&self, request_id: Uuid) -> Result<BuddyRequest, StoreError>;

    /// Inserts a pending request after checking that the joiner has no active request, that
    /// the joiner has no active joiners and that the receiver has no active request as a
    /// joiner. A lapsed request held by the joiner is closed as cancelled in the same step.
    async fn insert_open_request(
        &self,
        request: OpenRequest,
        now: SystemTime,
    ) -> Result<InsertedRequest, StoreError>;

    async fn transition(
        &self,
        transition: StatusTransition,
        now: SystemTime,
    ) -> Result<BuddyRequest, StoreError>;

    async fn open_request_for_joiner(
        &self,
        joiner_id: Uuid,
    ) -> Result<Option<BuddyRequest>, StoreError>;

    async fn open_requests_for_receiver(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<BuddyRequest>, StoreError>;

    async fn set_order_count(&self, request_id: Uuid, order_count: i32) -> Result<(), StoreError>;

    /// Every request the user took part in, newest first
    async fn history_for_user(&self, user_id: Uuid) -> Result<Vec<BuddyRequest>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    fn database_error(kind: DatabaseErrorKind) -> DaoError {
        DaoError::QueryFailure(DieselError::DatabaseError(
            kind,
            Box::new(String::from("could not serialize access")),
        ))
    }

    #[test]
    fn dao_errors_map_to_store_errors() {
        let conflict = StoreError::from(database_error(DatabaseErrorKind::SerializationFailure));
        match conflict {
            StoreError::Unavailable(msg) => {
                assert_eq!(msg, "Transaction conflicted with a concurrent update")
            }
            other => panic!("Expected Unavailable, got {other:?}"),
        }

        assert!(matches!(
            StoreError::from(DieselError::NotFound),
            StoreError::NotFound
        ));
        assert!(matches!(
            StoreError::from(DaoError::DbAsyncPoolFailure(String::from("timed out"))),
            StoreError::Unavailable(_)
        ));
    }
}
