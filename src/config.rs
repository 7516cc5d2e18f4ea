//! Startup configuration.
//!
//! The master key comes from the environment as a 64-character hex string.
//! A missing or malformed key is a `Configuration` error and the process
//! must not start.

use std::env;

use crate::error::{NotevaultError, Result};
use crate::keys::MasterKey;

/// Environment variable holding the hex-encoded master key.
pub const MASTER_KEY_ENV: &str = "MASTER_ENCRYPTION_KEY";

/// Environment variable overriding the user-key store namespace.
pub const KEY_NAMESPACE_ENV: &str = "NOTEVAULT_KEY_NAMESPACE";

/// Prefix isolating wrapped user keys from other data in a shared store.
pub const DEFAULT_KEY_NAMESPACE: &str = "userkeys:";

/// Everything the vault needs at startup.
#[derive(Debug)]
pub struct Config {
    pub master_key: MasterKey,
    pub key_namespace: String,
}

impl Config {
    pub fn new(master_key: MasterKey) -> Self {
        Self {
            master_key,
            key_namespace: DEFAULT_KEY_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.key_namespace = namespace.into();
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup, so tests don't have
    /// to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hex_key = lookup(MASTER_KEY_ENV).ok_or_else(|| {
            NotevaultError::Configuration(format!("{} is not set", MASTER_KEY_ENV))
        })?;
        let master_key = MasterKey::from_hex(&hex_key)?;

        let key_namespace = match lookup(KEY_NAMESPACE_ENV) {
            Some(ns) if !ns.is_empty() => ns,
            _ => DEFAULT_KEY_NAMESPACE.to_string(),
        };

        tracing::info!(namespace = %key_namespace, "configuration loaded");
        Ok(Self {
            master_key,
            key_namespace,
        })
    }
}
