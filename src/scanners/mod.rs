// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Security Scanner Engine
 * Main scan orchestration and coordination
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{AppConfig, CacheSettings, ProfileTable, ScanProfile};
use crate::crawler::{SiteMap, SiteMapper};
use crate::discovery::{DiscoveryConfig, SubdomainDiscovery};
use crate::errors::{ScannerError, ScannerResult};
use crate::event_bus::{EventBus, EventKind, ScanEvent};
use crate::http_client::{HttpClient, RequestStats, StatsSnapshot};
use crate::registry::TesterRegistry;
use crate::response_cache::ResponseCache;
use crate::types::{Finding, ScanConfig};

pub mod header_security;
pub mod nosql_injection;
pub mod open_redirect;
pub mod reflected_xss;
pub mod sql_injection;
pub mod traits;

pub use traits::{TestContext, Tester};

/// Why a tester did not finish cleanly
#[derive(Debug, Clone, Serialize)]
pub struct TesterFailure {
    pub tester: String,
    pub message: String,
}

/// Aggregate result of one scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub target: String,
    pub profile: ScanProfile,
    pub started_at: String,
    pub findings: Vec<Finding>,
    pub site_map: SiteMap,
    pub statistics: StatsSnapshot,
    pub tester_errors: Vec<TesterFailure>,
    pub duration_ms: u64,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Scan orchestrator.
///
/// The response cache and request counters outlive individual scans; every
/// scan gets a fresh client built from its profile over the shared cache.
/// One scan at a time per engine.
pub struct ScanEngine {
    base: ScanConfig,
    profiles: ProfileTable,
    registry: Arc<TesterRegistry>,
    bus: Arc<EventBus>,
    cache: Arc<ResponseCache>,
    stats: Arc<RequestStats>,
    cancel: Mutex<CancellationToken>,
    findings: Arc<Mutex<Vec<Finding>>>,
}

impl ScanEngine {
    pub fn new(config: ScanConfig, cache: CacheSettings) -> Self {
        let bus = Arc::new(EventBus::new());
        let findings: Arc<Mutex<Vec<Finding>>> = Arc::new(Mutex::new(Vec::new()));

        let collector = Arc::clone(&findings);
        bus.subscribe(EventKind::VulnerabilityFound, move |event| {
            if let ScanEvent::VulnerabilityFound(finding) = event {
                collector.lock().push(finding.clone());
            }
            Ok(())
        });

        info!(
            "[SUCCESS] Response cache enabled: capacity={}, ttl={}s",
            cache.max_entries, cache.ttl_secs
        );

        Self {
            base: config,
            profiles: ProfileTable::new(),
            registry: Arc::new(TesterRegistry::discover()),
            bus,
            cache: Arc::new(ResponseCache::new(cache.max_entries, cache.ttl())),
            stats: Arc::new(RequestStats::default()),
            cancel: Mutex::new(CancellationToken::new()),
            findings,
        }
    }

    /// Engine over env-derived settings; operator limits are applied to
    /// every profile and rejected if out of range
    pub fn from_app_config(config: &AppConfig) -> ScannerResult<Self> {
        let profiles = ProfileTable::new().with_limits(&config.limits)?;
        Ok(Self::new(config.scanner.clone(), config.cache.clone()).with_profiles(profiles))
    }

    pub fn with_registry(mut self, registry: TesterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_profiles(mut self, profiles: ProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    /// Subscribe here to observe scans
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn registry(&self) -> &TesterRegistry {
        &self.registry
    }

    /// Abort the scan in progress
    pub fn cancel(&self) {
        info!("Scan cancellation requested");
        self.cancel.lock().cancel();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Run every tester the profile allows, then map the site.
    ///
    /// Invalid profile names, credentials and targets fail here before any
    /// request is sent. Once the scan has started it always ends with a
    /// `ScanComplete` event; tester failures only show up as `Error` events
    /// and in `tester_errors`.
    pub async fn scan(&self, target: &str, profile_name: &str) -> Result<ScanReport> {
        let (profile, settings) = self.profiles.resolve(profile_name)?;
        let target = validate_target(target)?;
        let config = settings.apply(&self.base);
        config.auth()?;

        let client = Arc::new(
            HttpClient::from_config(&config)?
                .with_cache(Arc::clone(&self.cache))
                .with_stats(Arc::clone(&self.stats)),
        );
        let config = Arc::new(config);
        let cancel = self.fresh_token();
        let grace = config.timeout();

        let scan_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().to_rfc3339();
        let start_time = Instant::now();
        self.findings.lock().clear();

        info!("[Engine] Scan {} of {} with profile {}", scan_id, target, profile);
        self.bus
            .publish(ScanEvent::ScanStart {
                target: target.clone(),
                profile: profile.to_string(),
            })
            .await;

        let testers = self.registry.select(|name| settings.testers.allows(name));
        info!("[Engine] Running {} testers", testers.len());
        self.bus
            .publish(ScanEvent::progress(format!("Running {} testers", testers.len()), Some(0)))
            .await;

        let tasks: Vec<(String, JoinHandle<Result<()>>)> = testers
            .into_iter()
            .map(|tester| {
                let name = tester.name().to_string();
                let ctx = TestContext::new(&target, Arc::clone(&client), Arc::clone(&self.bus), Arc::clone(&config))
                    .with_cancellation(cancel.clone());
                let handle = tokio::spawn(async move { tester.run(&ctx).await });
                (name, handle)
            })
            .collect();

        let outcomes = futures::future::join_all(
            tasks
                .into_iter()
                .map(|(name, handle)| await_tester(name, handle, cancel.clone(), grace)),
        )
        .await;

        let mut tester_errors = Vec::new();
        for failure in outcomes.into_iter().flatten() {
            error!("[Engine] Tester {} failed: {}", failure.tester, failure.message);
            self.bus
                .publish(ScanEvent::error(failure.tester.clone(), failure.message.clone()))
                .await;
            tester_errors.push(failure);
        }

        let mut site_map = if cancel.is_cancelled() {
            let mut map = SiteMap::new(&target);
            map.cancelled = true;
            map
        } else {
            self.bus
                .publish(ScanEvent::progress("Mapping web architecture...", Some(50)))
                .await;
            self.map_site(&target, &client, &config, &cancel, grace).await
        };

        let findings = std::mem::take(&mut *self.findings.lock());
        site_map.add_vulnerabilities(findings.iter().cloned());

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let cancelled = cancel.is_cancelled();

        self.bus
            .publish(ScanEvent::ScanComplete {
                target: target.clone(),
                findings: findings.len(),
                duration_ms,
            })
            .await;

        info!(
            "[SUCCESS] [Engine] Scan of {} finished in {}ms: {} findings, {} tester errors",
            target,
            duration_ms,
            findings.len(),
            tester_errors.len()
        );

        Ok(ScanReport {
            scan_id,
            target,
            profile,
            started_at,
            findings,
            site_map,
            statistics: self.stats.snapshot(),
            tester_errors,
            duration_ms,
            cancelled,
        })
    }

    async fn map_site(
        &self,
        target: &str,
        client: &Arc<HttpClient>,
        config: &ScanConfig,
        cancel: &CancellationToken,
        grace: Duration,
    ) -> SiteMap {
        let discovery = config.discover_subdomains.then(|| {
            SubdomainDiscovery::new(DiscoveryConfig {
                timeout: config.timeout(),
                ..Default::default()
            })
        });
        let mapper = SiteMapper::new(Arc::clone(client), Arc::clone(&self.bus), config.max_depth, config.max_pages)
            .with_discovery(discovery);

        let mapping = mapper.map_website(target, cancel);
        tokio::pin!(mapping);

        let outcome = tokio::select! {
            result = &mut mapping => Some(result),
            _ = cancel.cancelled() => tokio::time::timeout(grace, &mut mapping).await.ok(),
        };

        match outcome {
            Some(Ok(map)) => map,
            Some(Err(e)) => {
                error!("[Engine] Site mapping failed: {:#}", e);
                self.bus.publish(ScanEvent::error("SiteMapper", format!("{:#}", e))).await;
                SiteMap::new(target)
            }
            None => {
                warn!("[Engine] Site mapper ignored cancellation, abandoning it");
                let mut map = SiteMap::new(target);
                map.cancelled = true;
                map
            }
        }
    }

    fn fresh_token(&self) -> CancellationToken {
        let mut guard = self.cancel.lock();
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
        guard.clone()
    }
}

/// Wait for one tester. After cancellation it gets `grace` to wind down;
/// past that it is detached, not killed.
async fn await_tester(
    name: String,
    mut handle: JoinHandle<Result<()>>,
    cancel: CancellationToken,
    grace: Duration,
) -> Option<TesterFailure> {
    let joined = tokio::select! {
        joined = &mut handle => Some(joined),
        _ = cancel.cancelled() => tokio::time::timeout(grace, &mut handle).await.ok(),
    };

    let message = match joined {
        Some(Ok(Ok(()))) => {
            debug!("[Engine] Tester {} finished", name);
            return None;
        }
        Some(Ok(Err(e))) => format!("{:#}", e),
        Some(Err(join_error)) if join_error.is_panic() => "tester panicked".to_string(),
        Some(Err(join_error)) => join_error.to_string(),
        None => "did not stop within the cancellation grace period".to_string(),
    };

    Some(TesterFailure { tester: name, message })
}

/// Absolute http(s) URL with a host
fn validate_target(target: &str) -> Result<String, ScannerError> {
    let invalid = |reason: &str| ScannerError::InvalidTarget {
        url: target.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(target.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https targets are supported"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target() {
        assert_eq!(validate_target("https://example.com").unwrap(), "https://example.com/");
        assert!(matches!(
            validate_target("ftp://example.com"),
            Err(ScannerError::InvalidTarget { .. })
        ));
        assert!(validate_target("example.com").is_err());
    }

    #[tokio::test]
    async fn test_invalid_profile_is_fatal() {
        let engine = ScanEngine::new(ScanConfig::default(), CacheSettings::default());
        let err = engine.scan("https://example.com", "turbo").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScannerError>(),
            Some(ScannerError::InvalidProfile(_))
        ));
        assert_eq!(engine.stats().total_requests, 0);
    }

    #[tokio::test]
    async fn test_conflicting_auth_is_fatal() {
        let config = ScanConfig {
            auth_token: Some("abc".to_string()),
            auth_basic: Some("user:pass".to_string()),
            ..Default::default()
        };
        let engine = ScanEngine::new(config, CacheSettings::default());
        let err = engine.scan("https://example.com", "quick").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScannerError>(),
            Some(ScannerError::Configuration(_))
        ));
        assert_eq!(engine.stats().total_requests, 0);
    }

    #[test]
    fn test_app_config_limits_reach_profiles() {
        use crate::config::ProfileLimits;

        let config = AppConfig {
            limits: ProfileLimits {
                max_concurrency: Some(4),
                timeout_secs: Some(20),
            },
            ..Default::default()
        };
        let engine = ScanEngine::from_app_config(&config).unwrap();
        let applied = engine.profiles.get(ScanProfile::Intense).apply(&engine.base);
        assert_eq!(applied.max_concurrency, 4);
        assert_eq!(applied.timeout_secs, 20);

        let invalid = AppConfig {
            limits: ProfileLimits {
                max_concurrency: Some(0),
                timeout_secs: None,
            },
            ..Default::default()
        };
        assert!(matches!(
            ScanEngine::from_app_config(&invalid),
            Err(ScannerError::Validation(_))
        ));
    }
}
