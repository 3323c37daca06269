use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::bb8::Pool as AsyncPool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use std::fmt;
use std::time::Duration;

pub mod buddy_request;
pub mod shipment;
pub mod user;

pub type DbAsyncPool = AsyncPool<AsyncPgConnection>;
pub type DbAsyncConnection =
    bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>;

pub async fn create_db_async_pool(
    database_uri: &str,
    max_db_connections: u32,
    idle_timeout: Duration,
) -> Result<DbAsyncPool, DaoError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_uri);
    AsyncPool::builder()
        .max_size(max_db_connections)
        .idle_timeout(Some(idle_timeout))
        .build(config)
        .await
        .map_err(|e| DaoError::DbAsyncPoolFailure(e.to_string()))
}

#[derive(Debug)]
pub enum DaoError {
    DbAsyncPoolFailure(String),
    QueryFailure(diesel::result::Error),
}

impl DaoError {
    /// Postgres aborted a serializable transaction because of a concurrent writer. The whole
    /// operation can be retried.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::SerializationFailure,
                _,
            ))
        )
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbAsyncPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain async DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<bb8::RunError<E>> for DaoError {
    fn from(error: bb8::RunError<E>) -> Self {
        DaoError::DbAsyncPoolFailure(error.to_string())
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}

#[cfg(test)]
pub mod test_utils {
    use once_cell::sync::Lazy;
    use std::time::{Duration, SystemTime};
    use uuid::Uuid;

    use diesel::{dsl, ExpressionMethods};

    use crate::db::{create_db_async_pool, DbAsyncConnection, DbAsyncPool};
    use crate::models::shipment_cycle::ShipmentCycle;
    use crate::models::user::User;
    use crate::schema::orders as order_fields;
    use crate::schema::orders::dsl::orders;
    use crate::schema::shipment_cycles::dsl::shipment_cycles;
    use crate::schema::users::dsl::users;

    const DB_USERNAME_VAR: &str = "BUDDIES_DB_USERNAME";
    const DB_PASSWORD_VAR: &str = "BUDDIES_DB_PASSWORD";
    const DB_HOSTNAME_VAR: &str = "BUDDIES_DB_HOSTNAME";
    const DB_PORT_VAR: &str = "BUDDIES_DB_PORT";
    const DB_NAME_VAR: &str = "BUDDIES_DB_NAME";
    const DB_MAX_CONNECTIONS_VAR: &str = "BUDDIES_DB_MAX_CONNECTIONS";

    pub static DB_ASYNC_POOL: Lazy<DbAsyncPool> = Lazy::new(|| {
        let username = env_or_panic(DB_USERNAME_VAR);
        let password = env_or_panic(DB_PASSWORD_VAR);
        let hostname = env_or_panic(DB_HOSTNAME_VAR);
        let port = env_or_panic(DB_PORT_VAR);
        let db_name = env_or_panic(DB_NAME_VAR);

        let max_connections = env_or_parse(DB_MAX_CONNECTIONS_VAR, 48u32);

        let db_uri = format!(
            "postgres://{}:{}@{}:{}/{}",
            username, password, hostname, port, db_name
        );

        futures::executor::block_on(create_db_async_pool(
            &db_uri,
            max_connections,
            Duration::from_secs(30),
        ))
        .expect("Failed to create async DB pool for tests")
    });

    pub fn db_async_pool() -> &'static DbAsyncPool {
        &DB_ASYNC_POOL
    }

    pub async fn db_async_conn() -> DbAsyncConnection {
        DB_ASYNC_POOL
            .get()
            .await
            .expect("Failed to obtain pooled DB connection for tests")
    }

    pub async fn insert_user() -> User {
        insert_user_named("Test", "Buyer").await
    }

    pub async fn insert_user_named(first_name: &str, last_name: &str) -> User {
        let id = Uuid::now_v7();
        let username = format!("db-test-{}", id.simple());

        let user = User {
            id,
            email: format!("{username}@buddies.test"),
            username,
            first_name: String::from(first_name),
            last_name: String::from(last_name),
            profile_image: None,
            created_timestamp: SystemTime::now(),
        };

        diesel_async::RunQueryDsl::execute(
            dsl::insert_into(users).values(&user),
            &mut db_async_conn().await,
        )
        .await
        .expect("Failed to insert user");

        user
    }

    pub async fn insert_cycle(user_id: Uuid, cutoff_date: SystemTime) -> ShipmentCycle {
        let cycle = ShipmentCycle {
            id: Uuid::now_v7(),
            user_id,
            cutoff_date,
            shipping_address: format!("{} Consolidation Way", user_id.simple()),
            closed: false,
        };

        diesel_async::RunQueryDsl::execute(
            dsl::insert_into(shipment_cycles).values(&cycle),
            &mut db_async_conn().await,
        )
        .await
        .expect("Failed to insert shipment cycle");

        cycle
    }

    pub async fn insert_order(buyer_id: Uuid, shipment_cycle_id: Option<Uuid>) {
        diesel_async::RunQueryDsl::execute(
            dsl::insert_into(orders).values((
                order_fields::id.eq(Uuid::now_v7()),
                order_fields::buyer_id.eq(buyer_id),
                order_fields::shipment_cycle_id.eq(shipment_cycle_id),
                order_fields::created_timestamp.eq(SystemTime::now()),
            )),
            &mut db_async_conn().await,
        )
        .await
        .expect("Failed to insert order");
    }

    pub fn days(count: u64) -> Duration {
        Duration::from_secs(count * 86400)
    }

    fn env_or_panic(key: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| panic!("Environment variable {key} must be set"))
    }

    fn env_or_parse<T>(key: &str, default: T) -> T
    where
        T: std::str::FromStr,
    {
        std::env::var(key)
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(default)
    }
}
