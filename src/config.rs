use std::sync::OnceLock;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// A static cell that ensures environment variables are loaded only once
static ENV_LOADED: OnceLock<()> = OnceLock::new();

/// Loads environment variables from a .env file if they haven't been loaded yet.
fn load_env() {
    ENV_LOADED.get_or_init(|| {
        dotenvy::dotenv().ok();
    });
}

const STATEMENT_TIMEOUT_VAR: &str = "TXNMGR_STATEMENT_TIMEOUT_MS";
const HOOK_CAPACITY_VAR: &str = "TXNMGR_HOOK_CAPACITY";

/// Configuration for a transaction manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Deadline applied to statements run through [`Current`](crate::current::Current)
    pub statement_timeout: Option<Duration>,
    /// Initial capacity of the end-hook list
    pub hook_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            statement_timeout: None,
            hook_capacity: 3,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default statement timeout
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Set the initial end-hook capacity
    pub fn hook_capacity(mut self, capacity: usize) -> Self {
        self.hook_capacity = capacity;
        self
    }

    /// Build a configuration from environment variables
    ///
    /// Reads `TXNMGR_STATEMENT_TIMEOUT_MS` and `TXNMGR_HOOK_CAPACITY`; unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env();
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(STATEMENT_TIMEOUT_VAR) {
            let millis = parse_var::<u64>(STATEMENT_TIMEOUT_VAR, &raw)?;
            config.statement_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Ok(raw) = std::env::var(HOOK_CAPACITY_VAR) {
            config.hook_capacity = parse_var(HOOK_CAPACITY_VAR, &raw)?;
        }

        tracing::debug!(?config, "Loaded manager configuration");
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

/// Gets the database URL from the `DATABASE_URL` environment variable.
///
/// The value is validated as a URL before it is returned.
pub fn database_url() -> Result<String, ConfigError> {
    load_env();
    let raw = std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
    let url = Url::parse(&raw)?;
    Ok(url.to_string())
}
