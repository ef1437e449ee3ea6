use std::time::Duration;

/// Postgres store configuration.
///
/// `from_env` reads the `VACANCY_*` variables so an embedding binary can
/// configure the store the same way everywhere; defaults are fine for
/// development.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection; keeps store calls
    /// from blocking indefinitely when the pool is exhausted.
    pub acquire_timeout: Duration,
}

impl PgConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 16,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Build from `VACANCY_DATABASE_URL`, `VACANCY_MAX_CONNECTIONS` and
    /// `VACANCY_ACQUIRE_TIMEOUT_SECS`. `None` when no database URL is set.
    pub fn from_env() -> Option<Self> {
        let database_url = std::env::var("VACANCY_DATABASE_URL").ok()?;
        let mut cfg = Self::new(database_url);
        if let Some(n) = std::env::var("VACANCY_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.max_connections = n;
        }
        if let Some(secs) = std::env::var("VACANCY_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.acquire_timeout = Duration::from_secs(secs);
        }
        Some(cfg)
    }
}
