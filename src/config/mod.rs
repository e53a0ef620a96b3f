// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod profiles;

pub use profiles::{ProfileLimits, ProfileSettings, ProfileTable, ScanProfile, TesterSelection};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::response_cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::types::ScanConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Process-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub scanner: ScanConfig,
    pub cache: CacheSettings,
    /// Profile used when the caller names none
    pub profile: ScanProfile,
    pub limits: ProfileLimits,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `LONKERO_*` variables read through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(concurrency) = lookup("LONKERO_MAX_CONCURRENCY") {
            config.limits.max_concurrency = Some(
                concurrency
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid LONKERO_MAX_CONCURRENCY value"))?,
            );
        }

        if let Some(timeout) = lookup("LONKERO_TIMEOUT_SECS") {
            config.limits.timeout_secs = Some(
                timeout
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid LONKERO_TIMEOUT_SECS value"))?,
            );
        }

        if let Some(user_agent) = lookup("LONKERO_USER_AGENT") {
            config.scanner.user_agent = user_agent;
        }

        if let Some(proxy) = lookup("LONKERO_PROXY") {
            config.scanner.proxy = Some(proxy);
        }

        if let Some(interval) = lookup("LONKERO_RATE_LIMIT_MS") {
            config.scanner.rate_limit_interval_ms = interval
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid LONKERO_RATE_LIMIT_MS value"))?;
        }

        if let Some(size) = lookup("LONKERO_CACHE_SIZE") {
            config.cache.max_entries = size
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid LONKERO_CACHE_SIZE value"))?;
        }

        if let Some(ttl) = lookup("LONKERO_CACHE_TTL_SECS") {
            config.cache.ttl_secs = ttl
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid LONKERO_CACHE_TTL_SECS value"))?;
        }

        if let Some(profile) = lookup("LONKERO_PROFILE") {
            config.profile = profile.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.profile, ScanProfile::Balanced);
        assert_eq!(config.scanner.max_concurrency, 50);
        assert_eq!(config.limits, ProfileLimits::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("LONKERO_MAX_CONCURRENCY", "8"),
            ("LONKERO_CACHE_TTL_SECS", "60"),
            ("LONKERO_PROFILE", "deep"),
            ("LONKERO_PROXY", "http://127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.limits.max_concurrency, Some(8));
        assert_eq!(config.limits.timeout_secs, None);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.profile, ScanProfile::Intense);
        assert_eq!(config.scanner.proxy.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("LONKERO_TIMEOUT_SECS", "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LONKERO_PROFILE", "turbo")])).is_err());
    }
}
