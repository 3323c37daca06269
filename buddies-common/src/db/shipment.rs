use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::directory::{DirectoryError, ShipmentLedger};
use crate::models::shipment_cycle::ShipmentCycle;

use crate::schema::orders as order_fields;
use crate::schema::orders::dsl::orders;
use crate::schema::shipment_cycles as shipment_cycle_fields;
use crate::schema::shipment_cycles::dsl::shipment_cycles;

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }
}

#[async_trait]
impl ShipmentLedger for Dao {
    async fn active_cycle(
        &self,
        user_id: Uuid,
        now: SystemTime,
    ) -> Result<Option<ShipmentCycle>, DirectoryError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(shipment_cycles
            .filter(shipment_cycle_fields::user_id.eq(user_id))
            .filter(shipment_cycle_fields::closed.eq(false))
            .filter(shipment_cycle_fields::cutoff_date.gt(now))
            .order(shipment_cycle_fields::cutoff_date.asc())
            .first::<ShipmentCycle>(&mut conn)
            .await
            .optional()
            .map_err(DaoError::from)?)
    }

    async fn order_count(&self, joiner_id: Uuid, cycle_id: Uuid) -> Result<i64, DirectoryError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(orders
            .filter(order_fields::buyer_id.eq(joiner_id))
            .filter(order_fields::shipment_cycle_id.eq(cycle_id))
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(DaoError::from)?)
    }
}
