use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::shipment_cycles;

/// A receiver's consolidation window. Orders attached to the cycle ship together to
/// `shipping_address` once `cutoff_date` passes.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Serialize,
    Deserialize,
    Identifiable,
    Insertable,
    Queryable,
    QueryableByName,
)]
#[diesel(table_name = shipment_cycles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShipmentCycle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cutoff_date: SystemTime,
    pub shipping_address: String,
    pub closed: bool,
}

impl ShipmentCycle {
    pub fn is_active_at(&self, now: SystemTime) -> bool {
        !self.closed && self.cutoff_date > now
    }
}
