// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Subdomain Discovery Module
 * DNS candidates, TLS certificate SANs and CSP origins
 *
 * © 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use x509_parser::extensions::GeneralName;

use crate::errors::NetworkError;

/// Candidate names tried against DNS
pub const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "ftp", "admin", "blog", "dev", "staging", "test", "api", "cdn", "shop",
    "store", "portal", "support", "help", "docs", "forum", "community", "web", "secure", "vpn",
    "remote", "cloud", "app", "mobile", "dashboard",
];

static CSP_ORIGIN_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https?://([a-zA-Z0-9.-]+)").ok());

/// Subdomain discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub use_dns: bool,
    pub use_tls_certificate: bool,
    pub use_csp: bool,
    pub wordlist: Vec<String>,
    pub concurrency: usize,
    /// Per-technique budget
    pub timeout: Duration,
    pub tls_port: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            use_dns: true,
            use_tls_certificate: true,
            use_csp: true,
            wordlist: COMMON_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            concurrency: 10,
            timeout: Duration::from_secs(30),
            tls_port: 443,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Dns,
    TlsCertificate,
    Csp,
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoverySource::Dns => write!(f, "dns"),
            DiscoverySource::TlsCertificate => write!(f, "tls_certificate"),
            DiscoverySource::Csp => write!(f, "csp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredSubdomain {
    pub name: String,
    /// Every technique that produced this name
    pub sources: Vec<DiscoverySource>,
    pub ip_addresses: Vec<String>,
}

/// Union of all techniques, one entry per name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdomainReport {
    pub subdomains: BTreeMap<String, DiscoveredSubdomain>,
    pub failures: Vec<(DiscoverySource, String)>,
}

impl SubdomainReport {
    /// Returns true if `name` was new
    fn add(&mut self, name: String, source: DiscoverySource, ips: Vec<String>) -> bool {
        match self.subdomains.get_mut(&name) {
            Some(existing) => {
                if !existing.sources.contains(&source) {
                    existing.sources.push(source);
                }
                for ip in ips {
                    if !existing.ip_addresses.contains(&ip) {
                        existing.ip_addresses.push(ip);
                    }
                }
                false
            }
            None => {
                self.subdomains.insert(
                    name.clone(),
                    DiscoveredSubdomain {
                        name,
                        sources: vec![source],
                        ip_addresses: ips,
                    },
                );
                true
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.subdomains.keys().cloned().collect()
    }
}

pub struct SubdomainDiscovery {
    config: DiscoveryConfig,
}

impl Default for SubdomainDiscovery {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

impl SubdomainDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Run every enabled technique once against `base_domain`.
    ///
    /// Technique failures are recorded in the report; they never abort the
    /// other techniques.
    pub async fn discover(&self, base_domain: &str, csp_header: Option<&str>) -> SubdomainReport {
        let base_domain = base_domain.trim_end_matches('.').to_lowercase();
        let mut report = SubdomainReport::default();

        info!("[Discovery] Enumerating subdomains of {}", base_domain);

        if self.config.use_dns {
            match tokio::time::timeout(self.config.timeout, self.dns_candidates(&base_domain)).await {
                Ok(Ok(found)) => {
                    for (name, ips) in found {
                        report.add(name, DiscoverySource::Dns, ips);
                    }
                }
                Ok(Err(e)) => report.failures.push((DiscoverySource::Dns, format!("{:#}", e))),
                Err(_) => report.failures.push((DiscoverySource::Dns, "timed out".to_string())),
            }
        }

        if self.config.use_tls_certificate {
            match tokio::time::timeout(self.config.timeout, self.tls_certificate_names(&base_domain)).await {
                Ok(Ok(names)) => {
                    for name in filter_names(names, &base_domain) {
                        report.add(name, DiscoverySource::TlsCertificate, Vec::new());
                    }
                }
                Ok(Err(e)) => {
                    debug!("[Discovery] TLS inspection of {} failed: {:#}", base_domain, e);
                    report
                        .failures
                        .push((DiscoverySource::TlsCertificate, format!("{:#}", e)));
                }
                Err(_) => report
                    .failures
                    .push((DiscoverySource::TlsCertificate, "timed out".to_string())),
            }
        }

        if self.config.use_csp {
            if let Some(csp) = csp_header {
                for name in csp_origins(csp, &base_domain) {
                    report.add(name, DiscoverySource::Csp, Vec::new());
                }
            }
        }

        for (source, reason) in &report.failures {
            warn!("[Discovery] {} technique failed for {}: {}", source, base_domain, reason);
        }
        info!(
            "[SUCCESS] [Discovery] {} subdomains for {}",
            report.subdomains.len(),
            base_domain
        );

        report
    }

    /// Resolve `<candidate>.<base_domain>` for every wordlist entry
    async fn dns_candidates(&self, base_domain: &str) -> Result<Vec<(String, Vec<String>)>> {
        let resolver = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| NetworkError::DnsResolutionFailed {
                host: base_domain.to_string(),
                reason: format!("system resolver configuration: {}", e),
            })?
            .build();

        let candidates: Vec<String> = self
            .config
            .wordlist
            .iter()
            .map(|word| format!("{}.{}", word.trim_matches('.'), base_domain))
            .collect();

        debug!("[Discovery] Resolving {} candidates", candidates.len());

        let resolver = &resolver;
        let found = stream::iter(candidates)
            .map(|name| async move {
                let lookup = resolver.lookup_ip(name.as_str()).await.ok()?;
                let ips: Vec<String> = lookup.iter().map(|ip| ip.to_string()).collect();
                if ips.is_empty() {
                    None
                } else {
                    Some((name, ips))
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .filter_map(|found| async move { found })
            .collect()
            .await;

        Ok(found)
    }

    /// DNS names from the subjectAltName extension of the served certificate
    async fn tls_certificate_names(&self, host: &str) -> Result<Vec<String>> {
        let tcp = TcpStream::connect((host, self.config.tls_port))
            .await
            .with_context(|| format!("TCP connect to {}:{}", host, self.config.tls_port))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let client_config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .context("TLS protocol configuration")?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        let connector = tokio_rustls::TlsConnector::from(Arc::new(client_config));
        let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
            .with_context(|| format!("Invalid TLS server name {}", host))?;

        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| NetworkError::TlsHandshakeFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let (_, connection) = stream.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|certs| certs.first())
            .context("Server presented no certificate")?;

        let (_, certificate) = x509_parser::parse_x509_certificate(leaf.as_ref())
            .map_err(|e| anyhow::anyhow!("Certificate parse error: {}", e))?;

        let mut names = Vec::new();
        if let Ok(Some(san)) = certificate.subject_alternative_name() {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    names.push(dns.to_string());
                }
            }
        }

        debug!("[Discovery] Certificate for {} lists {} names", host, names.len());
        Ok(names)
    }
}

/// Hosts referenced by a Content-Security-Policy value that belong to `base_domain`
pub fn csp_origins(csp: &str, base_domain: &str) -> Vec<String> {
    let Some(regex) = CSP_ORIGIN_REGEX.as_ref() else {
        return Vec::new();
    };

    let hosts = regex
        .captures_iter(csp)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    filter_names(hosts, base_domain)
}

/// Normalize and keep proper subdomains of `base_domain`, deduplicated
pub fn filter_names(names: Vec<String>, base_domain: &str) -> Vec<String> {
    let suffix = format!(".{}", base_domain);
    let mut kept: Vec<String> = names
        .into_iter()
        .map(|n| {
            n.trim()
                .trim_start_matches("*.")
                .trim_end_matches('.')
                .to_lowercase()
        })
        .filter(|n| n.ends_with(&suffix))
        .collect();
    kept.sort();
    kept.dedup();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_origins() {
        let csp = "default-src 'self'; script-src https://cdn.example.com https://cdn.example.com \
                   http://static.example.com https://www.google-analytics.com; img-src https://example.com";
        assert_eq!(
            csp_origins(csp, "example.com"),
            vec!["cdn.example.com", "static.example.com"]
        );
    }

    #[test]
    fn test_filter_names() {
        let names = vec![
            "*.example.com".to_string(),
            "API.example.com.".to_string(),
            "api.example.com".to_string(),
            "example.com".to_string(),
            "notexample.com".to_string(),
            "evil-example.com".to_string(),
        ];
        // "*.example.com" collapses to the base domain and is dropped
        assert_eq!(filter_names(names, "example.com"), vec!["api.example.com"]);
    }

    #[test]
    fn test_report_deduplicates_across_sources() {
        let mut report = SubdomainReport::default();
        assert!(report.add("api.example.com".into(), DiscoverySource::Dns, vec!["1.2.3.4".into()]));
        assert!(!report.add("api.example.com".into(), DiscoverySource::Csp, vec![]));
        assert!(!report.add("api.example.com".into(), DiscoverySource::Dns, vec!["1.2.3.4".into()]));

        let entry = &report.subdomains["api.example.com"];
        assert_eq!(entry.sources, vec![DiscoverySource::Dns, DiscoverySource::Csp]);
        assert_eq!(entry.ip_addresses, vec!["1.2.3.4"]);
    }

    #[tokio::test]
    async fn test_csp_only_discovery() {
        let discovery = SubdomainDiscovery::new(DiscoveryConfig {
            use_dns: false,
            use_tls_certificate: false,
            ..Default::default()
        });
        let report = discovery
            .discover("example.com", Some("connect-src https://api.example.com"))
            .await;
        assert_eq!(report.names(), vec!["api.example.com"]);
        assert!(report.failures.is_empty());
    }
}
