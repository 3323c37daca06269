use async_trait::async_trait;
use std::time::SystemTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::directory::{
    is_same_buyer, matches_query, normalize_username, CandidateDirectory, DirectoryError,
    ShipmentLedger,
};
use crate::models::shipment_cycle::ShipmentCycle;
use crate::models::user::User;

#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<Vec<User>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.push(user);
    }
}

#[async_trait]
impl CandidateDirectory for MemoryDirectory {
    async fn search(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<User>, DirectoryError> {
        let users = self.users.read().await;
        let caller = users.iter().find(|u| u.id == exclude_user_id);

        let mut results = users
            .iter()
            .filter(|u| u.id != exclude_user_id)
            .filter(|u| !caller.is_some_and(|caller| is_same_buyer(caller, u)))
            .filter(|u| matches_query(u, query))
            .cloned()
            .collect::<Vec<_>>();

        results.sort_by(|a, b| a.username.cmp(&b.username));
        results.truncate(limit);

        Ok(results)
    }

    async fn find_buyer(&self, username_or_id: &str) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().await;

        if let Ok(user_id) = Uuid::parse_str(username_or_id.trim()) {
            return Ok(users.iter().find(|u| u.id == user_id).cloned());
        }

        let username = normalize_username(username_or_id);
        Ok(users
            .iter()
            .find(|u| u.username.to_lowercase() == username)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    cycles: RwLock<Vec<ShipmentCycle>>,
    // (buyer_id, shipment_cycle_id)
    orders: RwLock<Vec<(Uuid, Uuid)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open_cycle(
        &self,
        user_id: Uuid,
        cutoff_date: SystemTime,
        shipping_address: &str,
    ) -> ShipmentCycle {
        let cycle = ShipmentCycle {
            id: Uuid::now_v7(),
            user_id,
            cutoff_date,
            shipping_address: String::from(shipping_address),
            closed: false,
        };

        self.cycles.write().await.push(cycle.clone());
        cycle
    }

    pub async fn close_cycle(&self, cycle_id: Uuid) {
        if let Some(cycle) = self
            .cycles
            .write()
            .await
            .iter_mut()
            .find(|c| c.id == cycle_id)
        {
            cycle.closed = true;
        }
    }

    pub async fn record_order(&self, buyer_id: Uuid, cycle_id: Uuid) {
        self.orders.write().await.push((buyer_id, cycle_id));
    }
}

#[async_trait]
impl ShipmentLedger for MemoryLedger {
    async fn active_cycle(
        &self,
        user_id: Uuid,
        now: SystemTime,
    ) -> Result<Option<ShipmentCycle>, DirectoryError> {
        Ok(self
            .cycles
            .read()
            .await
            .iter()
            .filter(|c| c.user_id == user_id && c.is_active_at(now))
            .min_by_key(|c| c.cutoff_date)
            .cloned())
    }

    async fn order_count(&self, joiner_id: Uuid, cycle_id: Uuid) -> Result<i64, DirectoryError> {
        let count = self
            .orders
            .read()
            .await
            .iter()
            .filter(|(buyer_id, order_cycle_id)| {
                *buyer_id == joiner_id && *order_cycle_id == cycle_id
            })
            .count();

        Ok(count as i64)
    }
}
