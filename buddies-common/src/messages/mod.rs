mod protobuf;
mod query;

use std::time::{Duration, SystemTime};

pub use protobuf::*;
pub use query::*;

use uuid::Uuid as NonMessageUuid;

use crate::models::buddy_request::{
    BuddyRequest as BuddyRequestModel, BuddyRequestStatus as BuddyRequestStatusModel,
};
use crate::models::user::User;
use crate::role::BuddyRole as BuddyRoleModel;

#[derive(Debug)]
pub enum MessageError {
    InvalidUuid,
    InvalidTimestamp,
}

impl std::error::Error for MessageError {}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageError::InvalidUuid => write!(f, "Invalid UUID"),
            MessageError::InvalidTimestamp => write!(f, "Invalid timestamp"),
        }
    }
}

impl From<&NonMessageUuid> for Uuid {
    fn from(uuid: &NonMessageUuid) -> Self {
        Uuid {
            value: Vec::from(uuid.into_bytes()),
        }
    }
}

impl From<NonMessageUuid> for Uuid {
    fn from(uuid: NonMessageUuid) -> Self {
        (&uuid).into()
    }
}

impl TryFrom<Uuid> for NonMessageUuid {
    type Error = MessageError;

    fn try_from(uuid: Uuid) -> Result<Self, Self::Error> {
        (&uuid).try_into()
    }
}

impl TryFrom<&Uuid> for NonMessageUuid {
    type Error = MessageError;

    fn try_from(uuid: &Uuid) -> Result<Self, Self::Error> {
        Ok(NonMessageUuid::from_bytes(
            uuid.value
                .as_slice()
                .try_into()
                .map_err(|_| MessageError::InvalidUuid)?,
        ))
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = MessageError;

    fn try_from(timestamp: SystemTime) -> Result<Self, Self::Error> {
        let since_unix_epoch = timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| MessageError::InvalidTimestamp)?;

        Ok(Timestamp {
            secs: since_unix_epoch.as_secs(),
            nanos: since_unix_epoch.subsec_nanos(),
        })
    }
}

impl From<&Timestamp> for SystemTime {
    fn from(timestamp: &Timestamp) -> Self {
        SystemTime::UNIX_EPOCH
            + Duration::from_secs(timestamp.secs)
            + Duration::from_nanos(timestamp.nanos.into())
    }
}

impl From<BuddyRequestStatusModel> for RequestStatus {
    fn from(status: BuddyRequestStatusModel) -> Self {
        match status {
            BuddyRequestStatusModel::Pending => RequestStatus::Pending,
            BuddyRequestStatusModel::Approved => RequestStatus::Approved,
            BuddyRequestStatusModel::Rejected => RequestStatus::Rejected,
            BuddyRequestStatusModel::PendingCancel => RequestStatus::PendingCancel,
            BuddyRequestStatusModel::Cancelled => RequestStatus::Cancelled,
        }
    }
}

impl BuddyRequest {
    /// `now` decides the `lapsed` flag
    pub fn from_model(request: &BuddyRequestModel, now: SystemTime) -> Result<Self, MessageError> {
        Ok(BuddyRequest {
            id: request.id.into(),
            joiner_id: request.joiner_id.into(),
            receiver_id: request.receiver_id.into(),
            status: RequestStatus::from(request.status).into(),
            created_timestamp: request.created_timestamp.try_into()?,
            modified_timestamp: request.modified_timestamp.try_into()?,
            cutoff_date: request.cutoff_date.map(Timestamp::try_from).transpose()?,
            order_count: request.order_count,
            shipping_address_snapshot: request.shipping_address_snapshot.clone(),
            lapsed: request.is_lapsed_at(now),
        })
    }
}

impl BuddyRequestList {
    pub fn from_models(
        requests: &[BuddyRequestModel],
        now: SystemTime,
    ) -> Result<Self, MessageError> {
        Ok(BuddyRequestList {
            requests: requests
                .iter()
                .map(|r| BuddyRequest::from_model(r, now))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl BuddyRole {
    pub fn from_model(role: &BuddyRoleModel, now: SystemTime) -> Result<Self, MessageError> {
        let role = match role {
            BuddyRoleModel::Receiver { joiners } => {
                buddy_role::Role::Receiver(BuddyRequestList::from_models(joiners, now)?)
            }
            BuddyRoleModel::Joiner { request } => buddy_role::Role::Joiner(JoinerRole {
                request: request
                    .as_ref()
                    .map(|r| BuddyRequest::from_model(r, now))
                    .transpose()?,
            }),
        };

        Ok(BuddyRole { role: Some(role) })
    }
}

impl From<&User> for Candidate {
    fn from(user: &User) -> Self {
        Candidate {
            id: user.id.into(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}
