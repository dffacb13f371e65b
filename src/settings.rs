use crate::prelude::*;

use crate::base::session::{MAX_GENERATED_CODE_LEN, MIN_SESSION_CODE_LEN};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CARRIER_PIGEON";

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseConnectionSpec {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SurrealDBConnectionSpec {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Which transfer store backs the relay. Exactly one is active per process.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreSpec {
    Postgres(DatabaseConnectionSpec),
    #[serde(rename = "surrealdb")]
    SurrealDB(SurrealDBConnectionSpec),
    #[default]
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
pub struct S3BlobSpec {
    pub bucket: String,
    pub prefix: Option<String>,
    /// Custom endpoint for S3-compatible services; enables path-style addressing.
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobSpec {
    Local { root: PathBuf },
    S3(S3BlobSpec),
    #[default]
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSpec,
    #[serde(default)]
    pub blobs: BlobSpec,
    #[serde(default = "default_session_code_length")]
    pub session_code_length: usize,
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Base URL share links point at, e.g. `https://pigeon.example/receive`.
    #[serde(default)]
    pub share_base_url: Option<String>,
    #[serde(default = "default_slow_call_warn_threshold_secs")]
    pub slow_call_warn_threshold_secs: u64,
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSpec::default(),
            blobs: BlobSpec::default(),
            session_code_length: default_session_code_length(),
            upload_concurrency: default_upload_concurrency(),
            device_name: default_device_name(),
            share_base_url: None,
            slow_call_warn_threshold_secs: default_slow_call_warn_threshold_secs(),
            expiry_hours: default_expiry_hours(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then `CARRIER_PIGEON__*`
    /// environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        debug!(?settings.store, ?settings.blobs, "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SESSION_CODE_LEN..=MAX_GENERATED_CODE_LEN).contains(&self.session_code_length) {
            return Err(Error::Config(format!(
                "session_code_length must be between {MIN_SESSION_CODE_LEN} and {MAX_GENERATED_CODE_LEN}, got {}",
                self.session_code_length
            )));
        }
        if self.upload_concurrency == 0 {
            return Err(Error::Config("upload_concurrency must be at least 1".to_string()));
        }
        if self.device_name.trim().is_empty() {
            return Err(Error::Config("device_name must not be empty".to_string()));
        }
        if self.expiry_hours == 0 {
            return Err(Error::Config("expiry_hours must be at least 1".to_string()));
        }
        if let StoreSpec::Postgres(spec) = &self.store
            && spec.max_connections == 0
        {
            return Err(Error::Config("store.max_connections must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn slow_call_warn_threshold(&self) -> Duration {
        Duration::from_secs(self.slow_call_warn_threshold_secs)
    }

    pub fn expiry_window(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(i64::from(self.expiry_hours))
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_code_length() -> usize {
    crate::base::session::DEFAULT_SESSION_CODE_LEN
}

fn default_upload_concurrency() -> usize {
    1
}

fn default_device_name() -> String {
    std::env::consts::OS.to_string()
}

fn default_slow_call_warn_threshold_secs() -> u64 {
    10
}

fn default_expiry_hours() -> u32 {
    24
}
