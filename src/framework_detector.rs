// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Technology Detection
 * Fingerprints server, CDN, CMS and framework from a single response
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};

use crate::http_client::RequestResult;
use crate::types::TechnologyReport;

/// Technology fingerprinting seam.
///
/// The site mapper embeds whatever an implementation returns verbatim in its
/// report and performs no interpretation of it.
pub trait TechnologyDetector: Send + Sync {
    /// `{category -> [technology names]}` for one response
    fn detect(&self, response: &RequestResult) -> TechnologyReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TechCategory {
    Server,
    Cdn,
    CloudProvider,
    Cms,
    Framework,
    Language,
    JavaScript,
    Analytics,
}

impl TechCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TechCategory::Server => "Web Servers",
            TechCategory::Cdn => "CDN",
            TechCategory::CloudProvider => "Cloud Providers",
            TechCategory::Cms => "CMS",
            TechCategory::Framework => "Frameworks",
            TechCategory::Language => "Programming Languages",
            TechCategory::JavaScript => "JavaScript Libraries",
            TechCategory::Analytics => "Analytics",
        }
    }
}

const SERVER_PATTERNS: &[(&str, &str, TechCategory)] = &[
    ("nginx", "Nginx", TechCategory::Server),
    ("apache", "Apache", TechCategory::Server),
    ("cloudflare", "Cloudflare", TechCategory::Cdn),
    ("microsoft-iis", "Microsoft IIS", TechCategory::Server),
    ("litespeed", "LiteSpeed", TechCategory::Server),
    ("caddy", "Caddy", TechCategory::Server),
    ("openresty", "OpenResty", TechCategory::Server),
    ("gunicorn", "Gunicorn", TechCategory::Server),
];

const HEADER_MARKERS: &[(&str, &str, TechCategory)] = &[
    ("cf-ray", "Cloudflare", TechCategory::Cdn),
    ("x-amz-cf-id", "Amazon CloudFront", TechCategory::Cdn),
    ("x-fastly-request-id", "Fastly", TechCategory::Cdn),
    ("x-akamai-transformed", "Akamai", TechCategory::Cdn),
    ("x-vercel-id", "Vercel", TechCategory::CloudProvider),
    ("x-nf-request-id", "Netlify", TechCategory::CloudProvider),
    ("x-drupal-cache", "Drupal", TechCategory::Cms),
    ("x-aspnet-version", "ASP.NET", TechCategory::Framework),
];

const POWERED_BY_PATTERNS: &[(&str, &str, TechCategory)] = &[
    ("php", "PHP", TechCategory::Language),
    ("asp.net", "ASP.NET", TechCategory::Framework),
    ("express", "Express", TechCategory::Framework),
    ("next.js", "Next.js", TechCategory::Framework),
    ("servlet", "Java Servlet", TechCategory::Language),
];

const COOKIE_PATTERNS: &[(&str, &str, TechCategory)] = &[
    ("phpsessid", "PHP", TechCategory::Language),
    ("jsessionid", "Java", TechCategory::Language),
    ("asp.net_sessionid", "ASP.NET", TechCategory::Framework),
    ("laravel_session", "Laravel", TechCategory::Framework),
    ("csrftoken", "Django", TechCategory::Framework),
    ("wordpress_", "WordPress", TechCategory::Cms),
];

const GENERATOR_PATTERNS: &[(&str, &str, TechCategory)] = &[
    ("wordpress", "WordPress", TechCategory::Cms),
    ("drupal", "Drupal", TechCategory::Cms),
    ("joomla", "Joomla", TechCategory::Cms),
    ("ghost", "Ghost", TechCategory::Cms),
    ("hugo", "Hugo", TechCategory::Framework),
    ("gatsby", "Gatsby", TechCategory::Framework),
];

const BODY_MARKERS: &[(&str, &str, TechCategory)] = &[
    ("/wp-content/", "WordPress", TechCategory::Cms),
    ("/wp-includes/", "WordPress", TechCategory::Cms),
    ("__next_data__", "Next.js", TechCategory::Framework),
    ("data-reactroot", "React", TechCategory::JavaScript),
    ("ng-version", "Angular", TechCategory::JavaScript),
    ("jquery", "jQuery", TechCategory::JavaScript),
    ("googletagmanager.com", "Google Tag Manager", TechCategory::Analytics),
    ("google-analytics.com", "Google Analytics", TechCategory::Analytics),
];

/// Header, cookie, meta-tag and body signature matcher
#[derive(Debug, Default, Clone)]
pub struct SignatureDetector;

impl SignatureDetector {
    pub fn new() -> Self {
        Self
    }
}

impl TechnologyDetector for SignatureDetector {
    fn detect(&self, response: &RequestResult) -> TechnologyReport {
        let mut found: BTreeMap<TechCategory, BTreeSet<&'static str>> = BTreeMap::new();
        let mut add = |category: TechCategory, name: &'static str| {
            found.entry(category).or_default().insert(name);
        };

        if let Some(server) = response.header("server") {
            let server = server.to_lowercase();
            for (pattern, name, category) in SERVER_PATTERNS {
                if server.contains(pattern) {
                    add(*category, name);
                }
            }
        }

        for (header, name, category) in HEADER_MARKERS {
            if response.header(header).is_some() {
                add(*category, name);
            }
        }

        if let Some(powered_by) = response.header("x-powered-by") {
            let powered_by = powered_by.to_lowercase();
            for (pattern, name, category) in POWERED_BY_PATTERNS {
                if powered_by.contains(pattern) {
                    add(*category, name);
                }
            }
        }

        if let Some(cookies) = response.header("set-cookie") {
            let cookies = cookies.to_lowercase();
            for (pattern, name, category) in COOKIE_PATTERNS {
                if cookies.contains(pattern) {
                    add(*category, name);
                }
            }
        }

        if !response.body.is_empty() {
            let body = response.body.to_lowercase();
            for (marker, name, category) in BODY_MARKERS {
                if body.contains(marker) {
                    add(*category, name);
                }
            }

            let document = Html::parse_document(&response.body);
            if let Ok(selector) = Selector::parse("meta[name='generator']") {
                for element in document.select(&selector) {
                    if let Some(content) = element.value().attr("content") {
                        let content = content.to_lowercase();
                        for (pattern, name, category) in GENERATOR_PATTERNS {
                            if content.contains(pattern) {
                                add(*category, name);
                            }
                        }
                    }
                }
            }
        }

        found
            .into_iter()
            .map(|(category, names)| {
                (
                    category.label().to_string(),
                    names.into_iter().map(str::to_string).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeaderMap;

    fn response(headers: &[(&str, &str)], body: &str) -> RequestResult {
        let headers: HeaderMap = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RequestResult {
            method: "GET".to_string(),
            url: "https://example.com/".to_string(),
            final_url: "https://example.com/".to_string(),
            status_code: 200,
            headers,
            body: body.to_string(),
            duration_ms: 3,
            from_cache: false,
            error: None,
        }
    }

    #[test]
    fn test_server_header() {
        let report = SignatureDetector::new().detect(&response(&[("server", "nginx/1.25.3")], ""));
        assert_eq!(report.get("Web Servers"), Some(&vec!["Nginx".to_string()]));
    }

    #[test]
    fn test_multiple_sources_are_merged_and_sorted() {
        let body = r#"<html><head><meta name="generator" content="WordPress 6.4"></head>
            <body><script src="/wp-content/themes/x/jquery.js"></script></body></html>"#;
        let report = SignatureDetector::new().detect(&response(
            &[("x-powered-by", "PHP/8.2"), ("cf-ray", "abc")],
            body,
        ));

        assert_eq!(report.get("CMS"), Some(&vec!["WordPress".to_string()]));
        assert_eq!(report.get("Programming Languages"), Some(&vec!["PHP".to_string()]));
        assert_eq!(report.get("CDN"), Some(&vec!["Cloudflare".to_string()]));
        assert_eq!(report.get("JavaScript Libraries"), Some(&vec!["jQuery".to_string()]));
    }

    #[test]
    fn test_nothing_detected() {
        let report = SignatureDetector::new().detect(&response(&[], "<p>plain</p>"));
        assert!(report.is_empty());
    }
}
