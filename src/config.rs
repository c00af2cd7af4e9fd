use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Where records are persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind_address: String,
    pub store_backend: StoreBackend,
    pub musicoin_api_url: String,
    pub musicoin_client_id: String,
    pub musicoin_api_timeout_secs: u64,
    pub reconcile_interval_secs: u64,
    /// Defaults to half the interval
    pub reconcile_offset_secs: Option<u64>,
    pub reconcile_concurrency: usize,
    /// Musicoins paid to an inviter when the invitee's profile is created
    pub invite_reward: Decimal,
}

impl Config {
    /// Defaults overridden by environment variables (`BIND_ADDRESS`, ...)
    pub fn from_env() -> AppResult<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source<S>(source: S) -> AppResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Config = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("store_backend", "postgres")?
            .set_default("musicoin_api_url", "http://localhost:3000")?
            .set_default("musicoin_client_id", "")?
            .set_default("musicoin_api_timeout_secs", 10_i64)?
            .set_default("reconcile_interval_secs", 60_i64)?
            .set_default("reconcile_concurrency", 8_i64)?
            .set_default("invite_reward", "10")?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.reconcile_interval_secs == 0 {
            return Err(AppError::Config("RECONCILE_INTERVAL_SECS must be positive".into()));
        }
        if self.reconcile_concurrency == 0 {
            return Err(AppError::Config("RECONCILE_CONCURRENCY must be positive".into()));
        }
        if self.store_backend == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(AppError::Config(
                "DATABASE_URL must be set when STORE_BACKEND=postgres".into(),
            ));
        }
        if self.invite_reward.is_sign_negative() {
            return Err(AppError::Config("INVITE_REWARD must not be negative".into()));
        }
        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn reconcile_offset(&self) -> Option<Duration> {
        self.reconcile_offset_secs.map(Duration::from_secs)
    }

    pub fn musicoin_api_timeout(&self) -> Duration {
        Duration::from_secs(self.musicoin_api_timeout_secs)
    }
}
