use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "BUDDIES_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "BUDDIES_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "BUDDIES_DB_HOSTNAME";
const DB_PORT_VAR: &str = "BUDDIES_DB_PORT";
const DB_NAME_VAR: &str = "BUDDIES_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "BUDDIES_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "BUDDIES_DB_IDLE_TIMEOUT_SECS";

const TOKEN_SIGNING_KEY_VAR: &str = "BUDDIES_TOKEN_SIGNING_KEY_B64";
const HEALTH_ENDPOINT_KEY_VAR: &str = "BUDDIES_HEALTH_ENDPOINT_KEY";

const MIN_CUTOFF_LEAD_DAYS_VAR: &str = "BUDDIES_MIN_CUTOFF_LEAD_DAYS";
const CANDIDATE_SEARCH_LIMIT_VAR: &str = "BUDDIES_CANDIDATE_SEARCH_LIMIT";
const EVENT_CHANNEL_CAPACITY_VAR: &str = "BUDDIES_EVENT_CHANNEL_CAPACITY";

const MAX_CUTOFF_LEAD_DAYS: u64 = 365;

const ACTIX_WORKER_COUNT_VAR: &str = "BUDDIES_ACTIX_WORKER_COUNT";

const LOG_LEVEL_VAR: &str = "BUDDIES_LOG_LEVEL";
const LOG_DIRECTORY_VAR: &str = "BUDDIES_LOG_DIRECTORY";

const TOKEN_SIGNING_KEY_SIZE: usize = 64;

#[cfg(test)]
const TEST_TOKEN_SIGNING_KEY: [u8; TOKEN_SIGNING_KEY_SIZE] = [7; TOKEN_SIGNING_KEY_SIZE];

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    #[zeroize(skip)]
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],
    pub health_endpoint_key: String,

    #[zeroize(skip)]
    pub min_cutoff_lead_time: Duration,
    #[zeroize(skip)]
    pub candidate_search_limit: usize,
    #[zeroize(skip)]
    pub event_channel_capacity: usize,

    #[zeroize(skip)]
    pub actix_worker_count: usize,

    #[zeroize(skip)]
    pub log_level: String,
    #[zeroize(skip)]
    pub log_directory: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::new()),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("buddies")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            token_signing_key: token_signing_key()?,
            health_endpoint_key: env_var_or(HEALTH_ENDPOINT_KEY_VAR, String::new()),

            min_cutoff_lead_time: cutoff_lead_time(env_var_or(MIN_CUTOFF_LEAD_DAYS_VAR, 7))?,
            candidate_search_limit: env_var_or(
                CANDIDATE_SEARCH_LIMIT_VAR,
                buddies_common::directory::MAX_SEARCH_RESULTS,
            ),
            event_channel_capacity: env_var_or(
                EVENT_CHANNEL_CAPACITY_VAR,
                buddies_common::lifecycle::DEFAULT_EVENT_CHANNEL_CAPACITY,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
            log_directory: env_var_or(LOG_DIRECTORY_VAR, String::from("./logs")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    pub fn db_uri(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        ))
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn token_signing_key() -> Result<[u8; TOKEN_SIGNING_KEY_SIZE], ConfigError> {
    #[cfg(test)]
    if std::env::var(TOKEN_SIGNING_KEY_VAR).is_err() {
        return Ok(TEST_TOKEN_SIGNING_KEY);
    }

    let key = Zeroizing::new(
        b64.decode(env_var::<String>(TOKEN_SIGNING_KEY_VAR)?.as_bytes())
            .map_err(|_| ConfigError::invalid(TOKEN_SIGNING_KEY_VAR))?,
    );

    key.get(..TOKEN_SIGNING_KEY_SIZE)
        .and_then(|k| k.try_into().ok())
        .ok_or(ConfigError::invalid(TOKEN_SIGNING_KEY_VAR))
}

fn cutoff_lead_time(days: u64) -> Result<Duration, ConfigError> {
    if days > MAX_CUTOFF_LEAD_DAYS {
        return Err(ConfigError::invalid(MIN_CUTOFF_LEAD_DAYS_VAR));
    }

    days.checked_mul(86400)
        .map(Duration::from_secs)
        .ok_or(ConfigError::invalid(MIN_CUTOFF_LEAD_DAYS_VAR))
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
