//! Configuration for the bill-sync job.
//!
//! Credentials have no defaults anywhere: a sweep with a missing key or
//! account identifier fails here, before anything is fetched.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_OCTOPUS_API_URL: &str = "https://api.octopus.energy/v1/graphql/";
pub const DEFAULT_SPLITWISE_API_URL: &str = "https://secure.splitwise.com/api/v3.0";

/// Upper bound for `SYNC_LOOKBACK_DAYS`.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone)]
pub struct BillSyncConfig {
    pub common: core_config::Config,
    pub octopus: OctopusConfig,
    pub splitwise: SplitwiseConfig,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone)]
pub struct OctopusConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub account_number: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SplitwiseConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub group_id: i64,
    pub currency_code: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Namespace for archive keys.
    pub source: String,
    pub lookback_days: u32,
    pub max_bills: u32,
}

impl BillSyncConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars {
            lookup,
            is_prod: common.is_prod(),
        };

        let request_timeout = Duration::from_secs(vars.parsed("HTTP_TIMEOUT_SECS", 30)?);

        let lookback_days = vars.parsed("SYNC_LOOKBACK_DAYS", 7)?;
        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SYNC_LOOKBACK_DAYS must be at most {}, got {}",
                MAX_LOOKBACK_DAYS,
                lookback_days
            )));
        }

        let storage = StorageConfig {
            backend: vars.get("STORAGE_BACKEND", Some("local"))?.parse()?,
            local_path: vars.get("STORAGE_LOCAL_PATH", Some("storage"))?,
            s3_bucket: vars.optional("STORAGE_S3_BUCKET"),
            s3_region: vars.or_default("STORAGE_S3_REGION", "eu-west-2"),
        };
        if storage.backend == StorageBackend::S3 && storage.s3_bucket.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "STORAGE_S3_BUCKET is required when STORAGE_BACKEND is s3"
            )));
        }

        Ok(Self {
            octopus: OctopusConfig {
                api_url: vars.or_default("OCTOPUS_API_URL", DEFAULT_OCTOPUS_API_URL),
                api_key: Secret::new(vars.required("OCTOPUS_API_KEY")?),
                account_number: vars.required("OCTOPUS_ACCOUNT_NUMBER")?,
                request_timeout,
            },
            splitwise: SplitwiseConfig {
                api_url: vars.or_default("SPLITWISE_API_URL", DEFAULT_SPLITWISE_API_URL),
                api_key: Secret::new(vars.required("SPLITWISE_API_KEY")?),
                group_id: vars
                    .required("SPLITWISE_GROUP_ID")?
                    .trim()
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "SPLITWISE_GROUP_ID must be an integer: {}",
                            e
                        ))
                    })?,
                currency_code: vars.or_default("SPLITWISE_CURRENCY_CODE", "GBP"),
                request_timeout,
            },
            mongodb: MongoConfig {
                uri: Secret::new(vars.get("MONGODB_URI", Some("mongodb://localhost:27017"))?),
                database: vars.get("MONGODB_DATABASE", Some("bill_sync"))?,
                collection: vars.get("BILLS_COLLECTION", Some("octopus_bills"))?,
            },
            storage,
            sync: SyncConfig {
                source: "octopus".to_string(),
                lookback_days,
                max_bills: vars.parsed("SYNC_MAX_BILLS", 10)?,
            },
            common,
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid storage backend: {}",
                s
            ))),
        }
    }
}

struct Vars<F> {
    lookup: F,
    is_prod: bool,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Infrastructure settings: defaults apply outside prod only.
    fn get(&self, key: &str, default: Option<&str>) -> Result<String, AppError> {
        match self.optional(key) {
            Some(val) => Ok(val),
            None => {
                if self.is_prod {
                    Err(AppError::ConfigError(anyhow::anyhow!(
                        "{} is required in production but not set",
                        key
                    )))
                } else if let Some(def) = default {
                    Ok(def.to_string())
                } else {
                    Err(AppError::ConfigError(anyhow::anyhow!(
                        "{} is required but not set",
                        key
                    )))
                }
            }
        }
    }

    /// Public endpoints and business defaults: apply in every environment.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, AppError> {
        self.optional(key).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
        })
    }

    /// Tunables: fall back to the default in every environment.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
            }),
            None => Ok(default),
        }
    }
}
