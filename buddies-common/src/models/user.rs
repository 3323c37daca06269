use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::users;

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
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>,

    pub created_timestamp: SystemTime,
}
