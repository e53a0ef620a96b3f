// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::errors::{ScannerError, ScannerResult};

/// Default browser User-Agent sent by the executor
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Immutable per-scan configuration snapshot.
///
/// Applying a profile produces a new value; nothing mutates a config that a
/// running scan already holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub proxy: Option<String>,

    /// Minimum spacing between dispatch starts, milliseconds
    #[serde(default)]
    pub rate_limit_interval_ms: u64,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    #[serde(default = "default_true")]
    pub discover_subdomains: bool,

    /// "username:password"
    #[serde(default)]
    pub auth_basic: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// "name=value; other=value"
    #[serde(default)]
    pub auth_cookie: Option<String>,
}

fn default_max_concurrency() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pages() -> usize {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            proxy: None,
            rate_limit_interval_ms: 0,
            extra_headers: BTreeMap::new(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            follow_redirects: true,
            discover_subdomains: true,
            auth_basic: None,
            auth_token: None,
            auth_cookie: None,
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.rate_limit_interval_ms)
    }

    /// Parse the configured credentials. At most one scheme may be set.
    pub fn auth(&self) -> ScannerResult<Option<AuthConfig>> {
        let configured = [
            self.auth_basic.is_some(),
            self.auth_token.is_some(),
            self.auth_cookie.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if configured > 1 {
            return Err(ScannerError::Configuration(
                "only one of auth_basic, auth_token, auth_cookie may be set".to_string(),
            ));
        }

        if let Some(basic) = &self.auth_basic {
            let (username, password) = basic.split_once(':').ok_or_else(|| ScannerError::InvalidAuth {
                kind: "basic",
                reason: "expected 'username:password'".to_string(),
            })?;
            if username.is_empty() {
                return Err(ScannerError::InvalidAuth {
                    kind: "basic",
                    reason: "username is empty".to_string(),
                });
            }
            return Ok(Some(AuthConfig::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }));
        }

        if let Some(token) = &self.auth_token {
            let token = token.trim();
            if token.is_empty() || token.contains(char::is_whitespace) {
                return Err(ScannerError::InvalidAuth {
                    kind: "bearer",
                    reason: "token must be a single non-empty word".to_string(),
                });
            }
            return Ok(Some(AuthConfig::Bearer(token.to_string())));
        }

        if let Some(raw) = &self.auth_cookie {
            let mut cookies = BTreeMap::new();
            for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').ok_or_else(|| ScannerError::InvalidAuth {
                    kind: "cookie",
                    reason: format!("'{}' is not a name=value pair", pair),
                })?;
                let name = name.trim();
                if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ',') {
                    return Err(ScannerError::InvalidAuth {
                        kind: "cookie",
                        reason: format!("invalid cookie name '{}'", name),
                    });
                }
                cookies.insert(name.to_string(), value.trim().to_string());
            }
            if cookies.is_empty() {
                return Err(ScannerError::InvalidAuth {
                    kind: "cookie",
                    reason: "no cookies given".to_string(),
                });
            }
            return Ok(Some(AuthConfig::Cookies(cookies)));
        }

        Ok(None)
    }
}

/// Session-scoped credentials
#[derive(Debug, Clone, PartialEq)]
pub enum AuthConfig {
    Basic { username: String, password: String },
    Bearer(String),
    Cookies(BTreeMap<String, String>),
}

impl AuthConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer(_) => "bearer",
            AuthConfig::Cookies(_) => "cookie",
        }
    }

    /// Value of the Cookie header for cookie auth
    pub fn cookie_header(&self) -> Option<String> {
        match self {
            AuthConfig::Cookies(cookies) => Some(
                cookies
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        }
    }
}

/// A confirmed or heuristically flagged vulnerability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub tester_name: String,
    #[serde(rename = "type")]
    pub vuln_type: String,
    pub url: String,
    pub method: String,
    pub payload: String,
    pub parameter: Option<String>,
    pub severity: Severity,
    pub confidence: Confidence,
    pub evidence: Option<String>,
    pub description: String,
    pub cwe: String,
    pub discovered_at: String,
}

impl Finding {
    pub fn new(
        tester_name: &str,
        vuln_type: &str,
        url: &str,
        method: &str,
        payload: &str,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("{}_{}", tester_name.to_lowercase(), uuid::Uuid::new_v4().simple()),
            tester_name: tester_name.to_string(),
            vuln_type: vuln_type.to_string(),
            url: url.to_string(),
            method: method.to_string(),
            payload: payload.to_string(),
            parameter: None,
            severity,
            confidence: Confidence::Medium,
            evidence: None,
            description: String::new(),
            cwe: String::new(),
            discovered_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_parameter(mut self, parameter: &str) -> Self {
        self.parameter = Some(parameter.to_string());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cwe(mut self, cwe: &str) -> Self {
        self.cwe = cwe.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "HIGH"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::Low => write!(f, "LOW"),
        }
    }
}

/// Technology fingerprint: category -> technology names
pub type TechnologyReport = BTreeMap<String, Vec<String>>;

/// Lower-cased response headers
pub type HeaderMap = HashMap<String, String>;
