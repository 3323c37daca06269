use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::directory::{MemoryDirectory, MemoryLedger};
use crate::lifecycle::{BuddyRequestManager, Clock, LifecycleConfig};
use crate::models::user::User;
use crate::role::RoleResolver;
use crate::store::MemoryStore;

pub fn days(count: u64) -> Duration {
    Duration::from_secs(count * 86400)
}

pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(SystemTime::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub ledger: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub manager: Arc<BuddyRequestManager>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let ledger = Arc::new(MemoryLedger::new());
        let clock = Arc::new(ManualClock::new());

        let manager = BuddyRequestManager::new(
            store.clone(),
            directory.clone(),
            ledger.clone(),
            LifecycleConfig::default(),
        )
        .with_clock(clock.clone());

        Self {
            store,
            directory,
            ledger,
            clock,
            manager: Arc::new(manager),
        }
    }

    pub fn role_resolver(&self) -> RoleResolver {
        RoleResolver::new(
            self.store.clone(),
            self.ledger.clone(),
            Arc::clone(&self.manager),
        )
        .with_clock(self.clock.clone())
    }

    pub async fn buyer(&self, username: &str) -> User {
        let user = User {
            id: Uuid::now_v7(),
            username: String::from(username),
            email: format!("{username}@buddies.test"),
            first_name: String::from("Test"),
            last_name: String::from("Buyer"),
            profile_image: None,
            created_timestamp: self.clock.now(),
        };

        self.directory.insert_user(user.clone()).await;
        user
    }

    /// A buyer with an open shipment cycle that closes in ten days
    pub async fn receiver(&self, username: &str) -> User {
        let user = self.buyer(username).await;
        self.ledger
            .open_cycle(
                user.id,
                self.clock.now() + days(10),
                &format!("{username} Depot"),
            )
            .await;
        user
    }
}
