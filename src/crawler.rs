// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Site Mapper
 * Bounded recursive crawl: pages, forms, links, subdomains, technologies
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::discovery::{DiscoveredSubdomain, DiscoveryConfig, DiscoverySource, SubdomainDiscovery};
use crate::errors::ScannerError;
use crate::event_bus::{EventBus, LogLevel, ScanEvent};
use crate::framework_detector::{SignatureDetector, TechnologyDetector};
use crate::http_client::HttpClient;
use crate::types::{Finding, TechnologyReport};

/// Link text is truncated to this many characters
pub const MAX_LINK_TEXT: usize = 50;

/// Discovered form on a webpage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredForm {
    /// Page the form was found on
    pub page: String,
    /// Absolute submission URL
    pub action: String,
    /// Upper-case HTTP method
    pub method: String,
    pub inputs: Vec<FormInput>,
}

impl DiscoveredForm {
    /// Hash over action, method and sorted input names, for deduplication
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.action.hash(&mut hasher);
        self.method.hash(&mut hasher);

        let mut names: Vec<_> = self.inputs.iter().map(|i| &i.name).collect();
        names.sort();
        for name in names {
            name.hash(&mut hasher);
        }

        hasher.finish()
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|i| i.name.as_str()).collect()
    }
}

/// Form input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    pub input_type: String,
    /// Pre-filled value, if the markup carries one
    pub value: Option<String>,
}

/// Same-site link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub from: String,
    pub to: String,
    pub text: String,
}

/// Link leaving the target host and its subdomains; recorded, never fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub from: String,
    pub to: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStructure {
    pub paths: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

/// Everything the crawl learned about the site's shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteStructure {
    pub domains: BTreeMap<String, DomainStructure>,
    pub links: Vec<LinkRecord>,
    pub external_links: Vec<ExternalLink>,
    pub forms: Vec<DiscoveredForm>,
}

impl SiteStructure {
    /// File if the last path segment contains a dot, otherwise a path.
    /// The root path is not recorded.
    pub fn record_url(&mut self, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };
        let entry = self.domains.entry(host.to_string()).or_default();

        let path = url.path();
        if path.is_empty() || path == "/" {
            return;
        }

        let last_segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        if last_segment.contains('.') {
            entry.files.insert(path.to_string());
        } else {
            entry.paths.insert(path.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub url: String,
    pub depth: usize,
    pub status_code: u16,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    WordPress,
    Joomla,
    AdminInterface,
    ApiEndpoint,
}

/// Heuristic read off the discovered paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralInsight {
    pub domain: String,
    pub kind: InsightKind,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStatistics {
    pub total_urls: usize,
    pub total_subdomains: usize,
    pub total_domains: usize,
    pub total_forms: usize,
    pub total_internal_links: usize,
    pub total_external_links: usize,
    pub total_technologies: usize,
    pub total_vulnerabilities: usize,
}

/// Structural report of one crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteMap {
    pub target: String,
    pub structure: SiteStructure,
    /// Fragment-stripped URLs in fetch order
    pub visited: Vec<String>,
    pub subdomains: BTreeMap<String, DiscoveredSubdomain>,
    /// Detector output per host, merged across pages
    pub technologies: BTreeMap<String, TechnologyReport>,
    pub failures: Vec<CrawlFailure>,
    pub discovery_failures: Vec<(DiscoverySource, String)>,
    pub vulnerabilities: Vec<Finding>,
    pub insights: Vec<StructuralInsight>,
    pub statistics: MapStatistics,
    /// True when the crawl stopped on cancellation
    pub cancelled: bool,
}

impl SiteMap {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Default::default()
        }
    }

    /// Attach tester findings and refresh the statistics
    pub fn add_vulnerabilities(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.vulnerabilities.extend(findings);
        self.refresh_statistics();
    }

    pub fn refresh_statistics(&mut self) {
        self.statistics = MapStatistics {
            total_urls: self.visited.len(),
            total_subdomains: self.subdomains.len(),
            total_domains: self.structure.domains.len(),
            total_forms: self.structure.forms.len(),
            total_internal_links: self.structure.links.len(),
            total_external_links: self.structure.external_links.len(),
            total_technologies: self
                .technologies
                .values()
                .flat_map(|report| report.values())
                .map(|names| names.len())
                .sum(),
            total_vulnerabilities: self.vulnerabilities.len(),
        };
    }

    /// Derive insights from the recorded paths
    pub fn analyze_structure(&mut self) {
        let mut insights = Vec::new();

        for (domain, data) in &self.structure.domains {
            let all: Vec<&String> = data.paths.iter().chain(data.files.iter()).collect();
            let mut push = |kind: InsightKind, evidence: &str| {
                insights.push(StructuralInsight {
                    domain: domain.clone(),
                    kind,
                    evidence: evidence.to_string(),
                });
            };

            if let Some(p) = all.iter().find(|p| p.contains("/wp-content") || p.contains("/wp-admin")) {
                push(InsightKind::WordPress, p);
            }
            if let Some(p) = all.iter().find(|p| p.contains("/administrator")) {
                push(InsightKind::Joomla, p);
            }
            if let Some(p) = all.iter().find(|p| {
                p.split('/').any(|seg| seg.eq_ignore_ascii_case("admin") || seg.eq_ignore_ascii_case("wp-admin"))
            }) {
                push(InsightKind::AdminInterface, p);
            }
            for p in all.iter().filter(|p| is_api_path(p)) {
                push(InsightKind::ApiEndpoint, p);
            }
        }

        self.insights = insights;
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize site map")
    }
}

fn is_api_path(path: &str) -> bool {
    path.split('/')
        .any(|seg| matches!(seg.to_ascii_lowercase().as_str(), "api" | "graphql" | "rest"))
}

/// URL without its fragment; fragments never name a distinct resource
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Crawl scope for a target host: the host without a leading `www.`.
/// IP hosts are returned as-is.
pub fn site_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }
    match host.strip_prefix("www.") {
        Some(rest) if rest.contains('.') => rest.to_string(),
        _ => host,
    }
}

/// `host` is `site` itself or one of its subdomains
pub fn in_scope(host: &str, site: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    host == site || host.strip_suffix(site).map_or(false, |prefix| prefix.ends_with('.'))
}

/// Forms in `html`, with actions resolved against `page_url`
pub fn parse_forms(html: &str, page_url: &str) -> Vec<DiscoveredForm> {
    let document = Html::parse_document(html);
    extract_forms(&document, page_url)
}

pub fn extract_forms(document: &Html, page_url: &str) -> Vec<DiscoveredForm> {
    let (Ok(form_selector), Ok(input_selector)) = (
        Selector::parse("form"),
        Selector::parse("input, textarea, select"),
    ) else {
        return Vec::new();
    };
    let Ok(option_selector) = Selector::parse("option") else {
        return Vec::new();
    };

    let page = normalize_url(page_url).unwrap_or_else(|| page_url.to_string());
    let mut forms = Vec::new();

    for form in document.select(&form_selector) {
        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => resolve_url(&page, action).unwrap_or_else(|| page.clone()),
            _ => page.clone(),
        };
        let method = form
            .value()
            .attr("method")
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());

        let inputs = form
            .select(&input_selector)
            .filter_map(|element| form_input(element, &option_selector))
            .collect();

        forms.push(DiscoveredForm {
            page: page.clone(),
            action,
            method,
            inputs,
        });
    }

    forms
}

fn form_input(element: ElementRef<'_>, option_selector: &Selector) -> Option<FormInput> {
    let name = element.value().attr("name")?.trim();
    if name.is_empty() {
        return None;
    }

    let tag = element.value().name();
    let (input_type, value) = match tag {
        "textarea" => {
            let text: String = element.text().collect();
            ("textarea".to_string(), Some(text).filter(|t| !t.is_empty()))
        }
        "select" => {
            let first = element
                .select(option_selector)
                .next()
                .map(|opt| {
                    opt.value()
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| opt.text().collect::<String>().trim().to_string())
                });
            ("select".to_string(), first)
        }
        _ => (
            element.value().attr("type").unwrap_or("text").to_lowercase(),
            element.value().attr("value").map(str::to_string),
        ),
    };

    Some(FormInput {
        name: name.to_string(),
        input_type,
        value,
    })
}

/// `(absolute url, link text)` for every followable anchor
pub fn extract_links(document: &Html, page_url: &str) -> Vec<(String, String)> {
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        let lower = href.to_ascii_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || ["javascript:", "mailto:", "tel:", "data:"].iter().any(|s| lower.starts_with(s))
        {
            continue;
        }

        let Some(absolute) = resolve_url(page_url, href) else {
            continue;
        };
        if seen.insert(absolute.clone()) {
            links.push((absolute, link_text(element)));
        }
    }

    links
}

fn link_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect::<Vec<_>>().join(" ");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_LINK_TEXT)
        .collect()
}

/// Absolute, fragment-free http(s) URL for `href` on `base`
fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// What one successful page contributed
struct ParsedPage {
    forms: Vec<DiscoveredForm>,
    links: Vec<(String, String)>,
}

/// Bounded depth-first crawler
pub struct SiteMapper {
    client: Arc<HttpClient>,
    bus: Arc<EventBus>,
    detector: Arc<dyn TechnologyDetector>,
    discovery: Option<SubdomainDiscovery>,
    max_depth: usize,
    max_pages: usize,
}

impl SiteMapper {
    pub fn new(client: Arc<HttpClient>, bus: Arc<EventBus>, max_depth: usize, max_pages: usize) -> Self {
        let discovery = SubdomainDiscovery::new(DiscoveryConfig {
            timeout: client.timeout(),
            ..Default::default()
        });
        Self {
            client,
            bus,
            detector: Arc::new(SignatureDetector::new()),
            discovery: Some(discovery),
            max_depth,
            max_pages: max_pages.max(1),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn TechnologyDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// `None` disables subdomain discovery
    pub fn with_discovery(mut self, discovery: Option<SubdomainDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Crawl from `start_url`.
    ///
    /// Every URL is marked visited before it is fetched, so cycles end. A
    /// failed page is recorded and the crawl moves on. Links outside the
    /// start host and its subdomains are recorded but never fetched.
    pub async fn map_website(&self, start_url: &str, cancel: &CancellationToken) -> Result<SiteMap> {
        let start = Url::parse(start_url).map_err(|e| ScannerError::InvalidTarget {
            url: start_url.to_string(),
            reason: e.to_string(),
        })?;
        let Some(host) = start.host_str().map(str::to_string) else {
            return Err(ScannerError::InvalidTarget {
                url: start_url.to_string(),
                reason: "URL has no host".to_string(),
            }
            .into());
        };
        let base_domain = site_domain(&host);

        let mut map = SiteMap::new(start_url);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_links: HashSet<(String, String)> = HashSet::new();
        let mut seen_forms: HashSet<u64> = HashSet::new();
        let mut start_csp: Option<String> = None;

        let mut to_visit: Vec<(String, usize)> = Vec::new();
        if let Some(url) = normalize_url(start_url) {
            to_visit.push((url, 0));
        }

        info!(
            "[Mapper] Mapping {} (max depth {}, max pages {})",
            start_url, self.max_depth, self.max_pages
        );

        while let Some((url, depth)) = to_visit.pop() {
            if cancel.is_cancelled() {
                warn!("[Mapper] Cancelled after {} pages", map.visited.len());
                map.cancelled = true;
                break;
            }

            if visited.len() >= self.max_pages {
                warn!("[WARNING] [Mapper] Reached max pages limit ({})", self.max_pages);
                break;
            }

            if depth > self.max_depth || visited.contains(&url) {
                continue;
            }

            visited.insert(url.clone());
            map.visited.push(url.clone());
            debug!("[Mapper] Fetching {} (depth {})", url, depth);

            let response = self.client.get(&url).await;

            if depth == 0 && start_csp.is_none() {
                start_csp = response.header("content-security-policy").map(str::to_string);
            }

            if !response.is_success() {
                let reason = response
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("HTTP {}", response.status_code));
                debug!("[Mapper] {} failed: {}", url, reason);
                self.bus
                    .publish(ScanEvent::log(LogLevel::Debug, format!("Mapper: {} failed: {}", url, reason)))
                    .await;
                map.failures.push(CrawlFailure {
                    url,
                    depth,
                    status_code: response.status_code,
                    reason,
                });
                continue;
            }

            if let Ok(parsed) = Url::parse(&url) {
                map.structure.record_url(&parsed);
            }

            let report = self.detector.detect(&response);
            if !report.is_empty() {
                let host_entry = map.technologies.entry(host_of(&url)).or_default();
                for (category, names) in report {
                    let known = host_entry.entry(category).or_default();
                    for name in names {
                        if !known.contains(&name) {
                            known.push(name);
                        }
                    }
                }
            }

            // Html is not Send; keep it out of any await
            let page = {
                let document = Html::parse_document(&response.body);
                let base = if response.final_url.is_empty() { &url } else { &response.final_url };
                ParsedPage {
                    forms: extract_forms(&document, base),
                    links: extract_links(&document, base),
                }
            };

            for form in page.forms {
                if seen_forms.insert(form.signature()) {
                    map.structure.forms.push(form);
                }
            }

            let mut children = Vec::new();
            for (link, text) in page.links {
                if !seen_links.insert((url.clone(), link.clone())) {
                    continue;
                }
                let link_host = host_of(&link);
                if in_scope(&link_host, &base_domain) {
                    map.structure.links.push(LinkRecord {
                        from: url.clone(),
                        to: link.clone(),
                        text,
                    });
                    if !visited.contains(&link) {
                        children.push((link, depth + 1));
                    }
                } else {
                    map.structure.external_links.push(ExternalLink {
                        from: url.clone(),
                        to: link,
                        domain: link_host,
                    });
                }
            }
            // Reverse so the stack pops children in document order
            to_visit.extend(children.into_iter().rev());

            let percent = ((map.visited.len() * 100) / self.max_pages).min(100) as u8;
            self.bus
                .publish(ScanEvent::progress(format!("Mapped {}", url), Some(percent)))
                .await;
        }

        if !cancel.is_cancelled() {
            self.discover_subdomains(&host, &base_domain, start_csp.as_deref(), &mut map)
                .await;
        }

        map.analyze_structure();
        map.refresh_statistics();

        info!(
            "[SUCCESS] [Mapper] {} pages, {} forms, {} internal / {} external links, {} failures",
            map.visited.len(),
            map.structure.forms.len(),
            map.structure.links.len(),
            map.structure.external_links.len(),
            map.failures.len()
        );

        Ok(map)
    }

    async fn discover_subdomains(&self, host: &str, base_domain: &str, csp: Option<&str>, map: &mut SiteMap) {
        let Some(discovery) = &self.discovery else {
            debug!("[Mapper] Subdomain discovery disabled");
            return;
        };
        if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
            debug!("[Mapper] {} is an IP address, skipping subdomain discovery", host);
            return;
        }

        let report = discovery.discover(base_domain, csp).await;
        for name in report.subdomains.keys() {
            self.bus
                .publish(ScanEvent::log(LogLevel::Info, format!("Subdomain discovered: {}", name)))
                .await;
        }
        map.subdomains = report.subdomains;
        map.discovery_failures = report.failures;
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
          <a href="/about#team">About   our
             team</a>
          <a href="/about">About again</a>
          <a href="#top">Top</a>
          <a href="javascript:void(0)">JS</a>
          <a href="mailto:x@example.com">Mail</a>
          <a href="https://cdn.other.org/lib.js">A very long link text that goes well beyond the fifty character cap</a>
          <form action="/search" method="get">
            <input type="text" name="q">
            <input type="submit" value="Go">
          </form>
          <form method="post">
            <input type="hidden" name="csrf" value="abc">
            <textarea name="comment">hi</textarea>
            <select name="color"><option value="red">Red</option><option>Blue</option></select>
          </form>
        </body></html>
    "##;

    #[test]
    fn test_parse_forms() {
        let forms = parse_forms(PAGE, "https://example.com/blog/post#c");
        assert_eq!(forms.len(), 2);

        assert_eq!(forms[0].action, "https://example.com/search");
        assert_eq!(forms[0].method, "GET");
        assert_eq!(forms[0].input_names(), vec!["q"]);
        assert_eq!(forms[0].page, "https://example.com/blog/post");

        // No action submits back to the page
        assert_eq!(forms[1].action, "https://example.com/blog/post");
        assert_eq!(forms[1].method, "POST");
        assert_eq!(forms[1].input_names(), vec!["csrf", "comment", "color"]);
        assert_eq!(forms[1].inputs[0].value.as_deref(), Some("abc"));
        assert_eq!(forms[1].inputs[1].input_type, "textarea");
        assert_eq!(forms[1].inputs[2].value.as_deref(), Some("red"));
    }

    #[test]
    fn test_extract_links() {
        let document = Html::parse_document(PAGE);
        let links = extract_links(&document, "https://example.com/");
        let urls: Vec<&str> = links.iter().map(|(u, _)| u.as_str()).collect();

        assert_eq!(urls, vec!["https://example.com/about", "https://cdn.other.org/lib.js"]);
        assert_eq!(links[0].1, "About our team");
        assert_eq!(links[1].1.chars().count(), MAX_LINK_TEXT);
    }

    #[test]
    fn test_form_signature_ignores_input_order() {
        let input = |name: &str| FormInput {
            name: name.to_string(),
            input_type: "text".to_string(),
            value: None,
        };
        let a = DiscoveredForm {
            page: "https://example.com/a".into(),
            action: "https://example.com/login".into(),
            method: "POST".into(),
            inputs: vec![input("user"), input("pass")],
        };
        let mut b = a.clone();
        b.page = "https://example.com/b".into();
        b.inputs.reverse();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_site_domain() {
        assert_eq!(site_domain("www.example.com"), "example.com");
        assert_eq!(site_domain("shop.example.co.uk"), "shop.example.co.uk");
        assert_eq!(site_domain("www.com"), "www.com");
        assert_eq!(site_domain("localhost"), "localhost");
        assert_eq!(site_domain("127.0.0.1"), "127.0.0.1");
    }

    #[test]
    fn test_scope_does_not_cross_public_suffixes() {
        let site = site_domain("shop.example.co.uk");
        assert!(in_scope("shop.example.co.uk", &site));
        assert!(in_scope("api.shop.example.co.uk", &site));
        assert!(!in_scope("attacker.co.uk", &site));
        assert!(!in_scope("example.co.uk", &site));
        assert!(!in_scope("evilshop.example.co.uk", &site));

        let site = site_domain("www.example.com");
        assert!(in_scope("example.com", &site));
        assert!(in_scope("blog.example.com", &site));
        assert!(!in_scope("notexample.com", &site));
    }

    #[test]
    fn test_normalize_url_strips_fragment() {
        assert_eq!(
            normalize_url("https://example.com/a?b=1#frag").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn test_structure_files_and_paths() {
        let mut structure = SiteStructure::default();
        for url in [
            "https://example.com/",
            "https://example.com/docs/",
            "https://example.com/docs/guide.pdf",
            "https://api.example.com/v1/users",
        ] {
            structure.record_url(&Url::parse(url).unwrap());
        }

        let main = &structure.domains["example.com"];
        assert!(main.paths.contains("/docs/"));
        assert!(main.files.contains("/docs/guide.pdf"));
        assert_eq!(main.paths.len(), 1);
        assert!(structure.domains["api.example.com"].paths.contains("/v1/users"));
    }

    #[test]
    fn test_insights_and_statistics() {
        let mut map = SiteMap::new("https://example.com/");
        for url in [
            "https://example.com/wp-content/themes/x/style.css",
            "https://example.com/wp-admin/",
            "https://example.com/api/v1/users",
        ] {
            map.structure.record_url(&Url::parse(url).unwrap());
            map.visited.push(url.to_string());
        }
        map.analyze_structure();

        let kinds: BTreeSet<InsightKind> = map.insights.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&InsightKind::WordPress));
        assert!(kinds.contains(&InsightKind::AdminInterface));
        assert!(kinds.contains(&InsightKind::ApiEndpoint));
        assert!(!kinds.contains(&InsightKind::Joomla));

        map.add_vulnerabilities(vec![Finding::new(
            "T",
            "Test",
            "https://example.com/",
            "GET",
            "",
            crate::types::Severity::Low,
        )]);
        assert_eq!(map.statistics.total_urls, 3);
        assert_eq!(map.statistics.total_domains, 1);
        assert_eq!(map.statistics.total_vulnerabilities, 1);

        let json = map.to_json().unwrap();
        assert!(json.contains("\"total_vulnerabilities\": 1"));
    }
}
