// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Executor
 * Pooled HTTP client behind the response cache and rate governor
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::{Client, Method};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::{NetworkError, ScannerError};
use crate::rate_limiter::{RateGovernor, RateGovernorConfig};
use crate::response_cache::{CacheEntry, ResponseCache};
use crate::types::{AuthConfig, HeaderMap, ScanConfig};

/// Maximum response body size (10MB) to prevent memory exhaustion
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Connection pool settings
const DEFAULT_POOL_IDLE_PER_HOST: usize = 32;
const DEFAULT_POOL_MAX_IDLE_TIMEOUT: u64 = 90;
const MAX_REDIRECTS: usize = 10;

/// Per-request knobs
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    /// Query parameters for GET, form fields otherwise
    pub params: Vec<(String, String)>,
    /// Raw body; takes precedence over `params` for non-GET methods
    pub body: Option<String>,
    /// Overrides the config-wide redirect policy
    pub follow_redirects: Option<bool>,
}

impl RequestOptions {
    pub fn with_params<K: Into<String>, V: Into<String>>(params: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            params: params.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Normalized outcome of one HTTP call.
///
/// `status_code == 0` means the request never produced a response; `error`
/// then carries the transport failure. Such a result is inconclusive: it says
/// nothing about whether a vulnerability is present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResult {
    pub method: String,
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub duration_ms: u64,
    pub from_cache: bool,
    pub error: Option<String>,
}

impl RequestResult {
    fn failed(method: &Method, url: &str, error: String, duration_ms: u64) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            final_url: url.to_string(),
            status_code: 0,
            headers: HeaderMap::new(),
            body: String::new(),
            duration_ms,
            from_cache: false,
            error: Some(error),
        }
    }

    fn from_cache(method: &Method, url: &str, entry: CacheEntry) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            final_url: entry.final_url,
            status_code: entry.status_code,
            headers: entry.headers,
            body: entry.body,
            duration_ms: 0,
            from_cache: true,
            error: None,
        }
    }

    /// No response was received
    pub fn is_inconclusive(&self) -> bool {
        self.status_code == 0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.body.contains(pattern)
    }

    /// Header lookup, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Executor counters, shared by every clone of a client
#[derive(Debug, Default)]
pub struct RequestStats {
    total_requests: AtomicU64,
    cached_responses: AtomicU64,
    failed_requests: AtomicU64,
    total_time_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Requests that went out on the network
    pub total_requests: u64,
    pub cached_responses: u64,
    pub failed_requests: u64,
    pub total_time_ms: u64,
    pub avg_response_time_ms: f64,
    pub cache_hit_rate: f64,
}

impl RequestStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cached_responses = self.cached_responses.load(Ordering::Relaxed);
        let failed_requests = self.failed_requests.load(Ordering::Relaxed);
        let total_time_ms = self.total_time_ms.load(Ordering::Relaxed);

        let lookups = total_requests + cached_responses;
        StatsSnapshot {
            total_requests,
            cached_responses,
            failed_requests,
            total_time_ms,
            avg_response_time_ms: if total_requests > 0 {
                total_time_ms as f64 / total_requests as f64
            } else {
                0.0
            },
            cache_hit_rate: if lookups > 0 {
                cached_responses as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.cached_responses.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.total_time_ms.store(0, Ordering::Relaxed);
    }
}

/// Request executor.
///
/// Retry policy: none. A timeout or transport error yields an inconclusive
/// `RequestResult` immediately and counts as a failed request; callers decide
/// whether to issue the request again.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    /// Same pool settings, redirects disabled
    no_redirect_client: Arc<Client>,
    follow_redirects: bool,
    timeout: Duration,
    governor: Arc<RateGovernor>,
    cache: Option<Arc<ResponseCache>>,
    stats: Arc<RequestStats>,
    max_body_size: usize,
}

impl HttpClient {
    /// Build an executor from a scan config, applying session auth once
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let auth = config.auth()?;
        let default_headers = Self::session_headers(config, auth.as_ref())?;

        let client = Self::build_client(config, default_headers.clone(), reqwest::redirect::Policy::limited(MAX_REDIRECTS))?;
        let no_redirect_client = Self::build_client(config, default_headers, reqwest::redirect::Policy::none())?;

        let governor = RateGovernor::new(RateGovernorConfig {
            max_concurrency: config.max_concurrency,
            min_interval: config.rate_limit_interval(),
        });

        if let Some(auth) = &auth {
            debug!("[HttpClient] Session authentication configured: {}", auth.kind());
        }

        Ok(Self {
            client: Arc::new(client),
            no_redirect_client: Arc::new(no_redirect_client),
            follow_redirects: config.follow_redirects,
            timeout: config.timeout(),
            governor: Arc::new(governor),
            cache: None,
            stats: Arc::new(RequestStats::default()),
            max_body_size: MAX_BODY_SIZE,
        })
    }

    fn build_client(
        config: &ScanConfig,
        default_headers: reqwest::header::HeaderMap,
        redirect: reqwest::redirect::Policy,
    ) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .redirect(redirect)
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers)
            .pool_max_idle_per_host(DEFAULT_POOL_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_MAX_IDLE_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                ScannerError::from(NetworkError::ProxyError {
                    reason: format!("invalid proxy URL {}: {}", proxy, e),
                })
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| ScannerError::from(NetworkError::ClientBuild(e.to_string())).into())
    }

    fn session_headers(config: &ScanConfig, auth: Option<&AuthConfig>) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            headers.insert(name, value);
        }

        match auth {
            Some(AuthConfig::Basic { username, password }) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
                    .context("Invalid basic credentials")?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Some(AuthConfig::Bearer(token)) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Invalid bearer token")?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Some(cookies @ AuthConfig::Cookies(_)) => {
                if let Some(cookie) = cookies.cookie_header() {
                    let mut value = HeaderValue::from_str(&cookie).context("Invalid cookie value")?;
                    value.set_sensitive(true);
                    headers.insert(COOKIE, value);
                }
            }
            None => {}
        }

        Ok(headers)
    }

    /// Share a response cache (survives client rebuilds between scans)
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cap on buffered response bytes
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Share statistics counters
    pub fn with_stats(mut self, stats: Arc<RequestStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one request.
    ///
    /// GET requests consult the cache first; a hit never touches the
    /// governor or the network. Misses wait for a governor permit, then go
    /// out with the configured timeout. Only GET responses with status 200
    /// are stored, keyed separately per redirect policy.
    pub async fn execute(&self, method: Method, url: &str, options: RequestOptions) -> RequestResult {
        let is_get = method == Method::GET;
        let follow = options.follow_redirects.unwrap_or(self.follow_redirects);
        let cache_key = match (&self.cache, is_get) {
            (Some(_), true) => Some(ResponseCache::key_for(method.as_str(), url, &options.params, follow)),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(entry) = cache.get(key) {
                self.stats.cached_responses.fetch_add(1, Ordering::Relaxed);
                debug!("[HttpClient] Cache hit: {} {}", method, url);
                return RequestResult::from_cache(&method, url, entry);
            }
        }

        let permit = match self.governor.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
                return RequestResult::failed(&method, url, e.to_string(), 0);
            }
        };

        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let outcome = self.dispatch(&method, url, &options).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        drop(permit);

        self.stats.total_time_ms.fetch_add(duration_ms, Ordering::Relaxed);

        match outcome {
            Ok((status_code, final_url, headers, body)) => {
                if let (Some(cache), Some(key), 200) = (&self.cache, cache_key, status_code) {
                    cache.put(
                        key,
                        CacheEntry {
                            status_code,
                            body: body.clone(),
                            headers: headers.clone(),
                            final_url: final_url.clone(),
                            cached_at: std::time::Instant::now(),
                        },
                    );
                }

                RequestResult {
                    method: method.to_string(),
                    url: url.to_string(),
                    final_url,
                    status_code,
                    headers,
                    body,
                    duration_ms,
                    from_cache: false,
                    error: None,
                }
            }
            Err(e) => {
                self.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
                warn!("[HttpClient] {} {} failed: {:#}", method, url, e);
                RequestResult::failed(&method, url, format!("{:#}", e), duration_ms)
            }
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<(u16, String, HeaderMap, String)> {
        let follow = options.follow_redirects.unwrap_or(self.follow_redirects);
        let client = if follow { &self.client } else { &self.no_redirect_client };

        let mut request = client.request(method.clone(), url);

        if *method == Method::GET || *method == Method::HEAD {
            if !options.params.is_empty() {
                request = request.query(&options.params);
            }
        } else if let Some(body) = &options.body {
            request = request.body(body.clone());
        } else if !options.params.is_empty() {
            request = request.form(&options.params);
        }

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request
            .send()
            .await
            .with_context(|| format!("{} {}", method, url))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        let headers = {
            let headers = response.headers();
            let mut map = HeaderMap::with_capacity(headers.len());
            for (k, v) in headers.iter() {
                if let Ok(value_str) = v.to_str() {
                    map.entry(k.as_str().to_string())
                        .and_modify(|existing: &mut String| {
                            existing.push_str(", ");
                            existing.push_str(value_str);
                        })
                        .or_insert_with(|| value_str.to_string());
                }
            }
            map
        };

        // Stop reading at the cap; the rest of the body is never buffered
        let mut body_bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Reading body of {}", url))?
        {
            let remaining = self.max_body_size.saturating_sub(body_bytes.len());
            if chunk.len() >= remaining {
                body_bytes.extend_from_slice(&chunk[..remaining]);
                debug!("[HttpClient] Body of {} truncated at {} bytes", url, self.max_body_size);
                break;
            }
            body_bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&body_bytes).into_owned();

        Ok((status_code, final_url, headers, body))
    }

    pub async fn get(&self, url: &str) -> RequestResult {
        self.execute(Method::GET, url, RequestOptions::default()).await
    }

    pub async fn get_with_params(&self, url: &str, params: Vec<(String, String)>) -> RequestResult {
        self.execute(
            Method::GET,
            url,
            RequestOptions {
                params,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn post_form(&self, url: &str, params: Vec<(String, String)>) -> RequestResult {
        self.execute(
            Method::POST,
            url,
            RequestOptions {
                params,
                ..Default::default()
            },
        )
        .await
    }
}
