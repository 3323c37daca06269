use async_trait::async_trait;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::DaoError;
use crate::models::shipment_cycle::ShipmentCycle;
use crate::models::user::User;

pub mod memory;

pub use memory::{MemoryDirectory, MemoryLedger};

pub const MAX_SEARCH_RESULTS: usize = 25;

#[derive(Debug)]
pub enum DirectoryError {
    Unavailable(String),
}

impl std::error::Error for DirectoryError {}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Unavailable(msg) => {
                write!(f, "DirectoryError: Directory unavailable: {msg}")
            }
        }
    }
}

impl From<DaoError> for DirectoryError {
    fn from(error: DaoError) -> Self {
        DirectoryError::Unavailable(error.to_string())
    }
}

/// Read-only view of the buyers who can be picked as receivers.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    /// Case-insensitive substring search over usernames, names and emails. The caller (and
    /// any account that looks like the caller) is never returned.
    async fn search(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<User>, DirectoryError>;

    /// Resolves either a user ID or a username (with or without a leading `@`).
    async fn find_buyer(&self, username_or_id: &str) -> Result<Option<User>, DirectoryError>;
}

/// Read-only view of receivers' shipment cycles and the orders attached to them.
#[async_trait]
pub trait ShipmentLedger: Send + Sync {
    /// The open cycle for `user_id` with the nearest cutoff still in the future
    async fn active_cycle(
        &self,
        user_id: Uuid,
        now: SystemTime,
    ) -> Result<Option<ShipmentCycle>, DirectoryError>;

    async fn order_count(&self, joiner_id: Uuid, cycle_id: Uuid) -> Result<i64, DirectoryError>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_username(username: &str) -> String {
    let username = username.trim();
    username.strip_prefix('@').unwrap_or(username).to_lowercase()
}

/// The username a signup form would suggest for `email`, i.e. its local part restricted to
/// the characters usernames may contain.
pub fn username_from_email(email: &str) -> String {
    let email = normalize_email(email);
    let local_part = email.split('@').next().unwrap_or_default();

    local_part
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

pub fn is_same_buyer(caller: &User, candidate: &User) -> bool {
    if caller.id == candidate.id {
        return true;
    }

    let caller_email = normalize_email(&caller.email);
    if !caller_email.is_empty() && caller_email == normalize_email(&candidate.email) {
        return true;
    }

    let candidate_username = normalize_username(&candidate.username);
    if candidate_username.is_empty() {
        return false;
    }

    candidate_username == normalize_username(&caller.username)
        || candidate_username == username_from_email(&caller.email)
}

pub fn matches_query(user: &User, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }

    let full_name = format!("{} {}", user.first_name, user.last_name);

    [
        user.username.as_str(),
        user.first_name.as_str(),
        user.last_name.as_str(),
        user.email.as_str(),
        full_name.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&query))
}

/// Builds a `%...%` pattern for `ILIKE` with the wildcard characters in `query` escaped.
pub fn substring_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');

    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }

        pattern.push(c);
    }

    pattern.push('%');
    pattern
}
