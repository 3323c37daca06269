use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::SmallInt;
use diesel::{AsChangeset, Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::buddy_requests;

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = SmallInt)]
pub enum BuddyRequestStatus {
    Pending,
    Approved,
    Rejected,
    PendingCancel,
    Cancelled,
}

impl BuddyRequestStatus {
    /// Statuses that are still subject to further transitions
    pub const OPEN: [BuddyRequestStatus; 3] = [
        BuddyRequestStatus::Pending,
        BuddyRequestStatus::Approved,
        BuddyRequestStatus::PendingCancel,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuddyRequestStatus::Rejected | BuddyRequestStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuddyRequestStatus::Pending => "pending",
            BuddyRequestStatus::Approved => "approved",
            BuddyRequestStatus::Rejected => "rejected",
            BuddyRequestStatus::PendingCancel => "pending_cancel",
            BuddyRequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BuddyRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct UnknownStatus(pub i16);

impl std::error::Error for UnknownStatus {}

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown buddy request status code: {}", self.0)
    }
}

impl TryFrom<i16> for BuddyRequestStatus {
    type Error = UnknownStatus;

    fn try_from(value: i16) -> Result<Self, UnknownStatus> {
        match value {
            0 => Ok(BuddyRequestStatus::Pending),
            1 => Ok(BuddyRequestStatus::Approved),
            2 => Ok(BuddyRequestStatus::Rejected),
            3 => Ok(BuddyRequestStatus::PendingCancel),
            4 => Ok(BuddyRequestStatus::Cancelled),
            _ => Err(UnknownStatus(value)),
        }
    }
}

impl From<BuddyRequestStatus> for i16 {
    fn from(status: BuddyRequestStatus) -> Self {
        match status {
            BuddyRequestStatus::Pending => 0,
            BuddyRequestStatus::Approved => 1,
            BuddyRequestStatus::Rejected => 2,
            BuddyRequestStatus::PendingCancel => 3,
            BuddyRequestStatus::Cancelled => 4,
        }
    }
}

impl ToSql<SmallInt, Pg> for BuddyRequestStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(&i16::from(*self).to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for BuddyRequestStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let code = <i16 as FromSql<SmallInt, Pg>>::from_sql(bytes)?;
        Ok(BuddyRequestStatus::try_from(code)?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = buddy_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuddyRequest {
    pub id: Uuid,

    pub joiner_id: Uuid,
    pub receiver_id: Uuid,

    pub status: BuddyRequestStatus,

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,

    pub cutoff_date: Option<SystemTime>,
    pub order_count: i32,
    pub shipping_address_snapshot: Option<String>,
}

impl BuddyRequest {
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// An approved relationship (or one awaiting cancellation) lapses once the receiver's
    /// cutoff date passes. Lapse is never written back as a status.
    pub fn is_lapsed_at(&self, now: SystemTime) -> bool {
        matches!(
            self.status,
            BuddyRequestStatus::Approved | BuddyRequestStatus::PendingCancel
        ) && self.cutoff_date.is_some_and(|cutoff| cutoff <= now)
    }

    pub fn is_active_at(&self, now: SystemTime) -> bool {
        self.is_open() && !self.is_lapsed_at(now)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = buddy_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBuddyRequest<'a> {
    pub id: Uuid,

    pub joiner_id: Uuid,
    pub receiver_id: Uuid,

    pub status: BuddyRequestStatus,

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,

    pub cutoff_date: Option<SystemTime>,
    pub order_count: i32,
    pub shipping_address_snapshot: Option<&'a str>,
}

impl From<&NewBuddyRequest<'_>> for BuddyRequest {
    fn from(new_request: &NewBuddyRequest<'_>) -> Self {
        BuddyRequest {
            id: new_request.id,
            joiner_id: new_request.joiner_id,
            receiver_id: new_request.receiver_id,
            status: new_request.status,
            created_timestamp: new_request.created_timestamp,
            modified_timestamp: new_request.modified_timestamp,
            cutoff_date: new_request.cutoff_date,
            order_count: new_request.order_count,
            shipping_address_snapshot: new_request.shipping_address_snapshot.map(String::from),
        }
    }
}

// Fields left as `None` are not touched by the update
#[derive(Debug, AsChangeset)]
#[diesel(table_name = buddy_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuddyRequestStatusChange<'a> {
    pub status: BuddyRequestStatus,
    pub modified_timestamp: SystemTime,
    pub cutoff_date: Option<SystemTime>,
    pub shipping_address_snapshot: Option<&'a str>,
}
