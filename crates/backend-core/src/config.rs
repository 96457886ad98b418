//! Default account and region for a simulation run.
//!
//! `MOCK_ACCOUNT_ID` and `MOCK_REGION` override the defaults when loaded with
//! [`MockConfig::from_env`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";
pub const DEFAULT_REGION: &str = "us-east-1";

pub const ACCOUNT_ID_VAR: &str = "MOCK_ACCOUNT_ID";
pub const REGION_VAR: &str = "MOCK_REGION";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("account id must be 12 digits, got '{0}'")]
    InvalidAccountId(String),
    #[error("region '{0}' is not a valid region name")]
    InvalidRegion(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub account_id: String,
    pub region: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl MockConfig {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            account_id: account_id.into(),
            region: region.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(account_id) = lookup(ACCOUNT_ID_VAR).filter(|v| !v.trim().is_empty()) {
            config.account_id = account_id.trim().to_string();
        }
        if let Some(region) = lookup(REGION_VAR).filter(|v| !v.trim().is_empty()) {
            config.region = region.trim().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.len() != 12 || !self.account_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidAccountId(self.account_id.clone()));
        }
        if !is_region_name(&self.region) {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }
        Ok(())
    }
}

/// Accepts names shaped like `us-east-1` or `us-gov-west-1`.
fn is_region_name(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    let Some((last, head)) = parts.split_last() else {
        return false;
    };
    parts.len() >= 3
        && !last.is_empty()
        && last.bytes().all(|b| b.is_ascii_digit())
        && head
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase()))
}
