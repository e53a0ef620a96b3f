// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Security Header Tester
 * Passive check of response hardening headers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::profiles::HEADER_SECURITY_TESTER;
use crate::event_bus::{LogLevel, ScanEvent};
use crate::http_client::RequestResult;
use crate::scanners::traits::{TestContext, Tester};
use crate::types::{Confidence, Finding, Severity};

pub struct HeaderSecurityTester {
    version_regex: Regex,
}

pub fn create() -> Result<Arc<dyn Tester>> {
    Ok(Arc::new(HeaderSecurityTester::new()?))
}

impl HeaderSecurityTester {
    pub fn new() -> Result<Self> {
        Ok(Self {
            version_regex: Regex::new(r"\d+\.\d+")?,
        })
    }

    /// Findings for one response; pure so it can be tested without a server
    pub fn analyze(&self, target: &str, response: &RequestResult) -> Vec<Finding> {
        let mut findings = Vec::new();
        let is_https = response.final_url.starts_with("https://");
        let csp = response.header("content-security-policy");

        if csp.is_none() {
            findings.push(self.finding(
                target,
                "Missing Content-Security-Policy",
                "content-security-policy",
                Severity::Medium,
                "CWE-693",
                "No Content-Security-Policy header; injected scripts run unrestricted.",
            ));
        }

        let frame_ancestors = csp.map_or(false, |v| v.to_lowercase().contains("frame-ancestors"));
        if response.header("x-frame-options").is_none() && !frame_ancestors {
            findings.push(self.finding(
                target,
                "Clickjacking Protection Missing",
                "x-frame-options",
                Severity::Medium,
                "CWE-1021",
                "Neither X-Frame-Options nor CSP frame-ancestors is set; the page can be framed.",
            ));
        }

        let nosniff = response
            .header("x-content-type-options")
            .map_or(false, |v| v.eq_ignore_ascii_case("nosniff"));
        if !nosniff {
            findings.push(self.finding(
                target,
                "Missing X-Content-Type-Options",
                "x-content-type-options",
                Severity::Low,
                "CWE-693",
                "X-Content-Type-Options: nosniff is not set; browsers may MIME-sniff responses.",
            ));
        }

        if is_https && response.header("strict-transport-security").is_none() {
            findings.push(self.finding(
                target,
                "Missing Strict-Transport-Security",
                "strict-transport-security",
                Severity::Medium,
                "CWE-319",
                "HTTPS response without HSTS; first visits can be downgraded.",
            ));
        }

        for header in ["server", "x-powered-by"] {
            if let Some(value) = response.header(header) {
                if self.version_regex.is_match(value) {
                    findings.push(
                        self.finding(
                            target,
                            "Version Disclosure",
                            header,
                            Severity::Info,
                            "CWE-200",
                            "A response header reveals exact software versions.",
                        )
                        .with_evidence(format!("{}: {}", header, value)),
                    );
                }
            }
        }

        findings
    }

    fn finding(
        &self,
        target: &str,
        vuln_type: &str,
        header: &str,
        severity: Severity,
        cwe: &str,
        description: &str,
    ) -> Finding {
        Finding::new(HEADER_SECURITY_TESTER, vuln_type, target, "GET", "", severity)
            .with_parameter(header)
            .with_cwe(cwe)
            .with_confidence(Confidence::High)
            .with_description(description)
    }
}

#[async_trait]
impl Tester for HeaderSecurityTester {
    fn name(&self) -> &str {
        HEADER_SECURITY_TESTER
    }

    fn description(&self) -> &str {
        "Checks response hardening headers"
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        let response = ctx.client.get(&ctx.target).await;

        if response.is_inconclusive() {
            warn!("[{}] Target unreachable: {:?}", HEADER_SECURITY_TESTER, response.error);
            ctx.bus
                .publish(ScanEvent::log(
                    LogLevel::Warning,
                    format!("{}: no response from {}, headers not checked", HEADER_SECURITY_TESTER, ctx.target),
                ))
                .await;
            return Ok(());
        }

        let findings = self.analyze(&ctx.target, &response);
        debug!("[{}] {} header issues", HEADER_SECURITY_TESTER, findings.len());

        for finding in findings {
            ctx.report(finding).await;
        }

        info!("[SUCCESS] [{}] Completed for {}", HEADER_SECURITY_TESTER, ctx.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeaderMap;

    fn response(url: &str, headers: &[(&str, &str)]) -> RequestResult {
        let headers: HeaderMap = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RequestResult {
            method: "GET".to_string(),
            url: url.to_string(),
            final_url: url.to_string(),
            status_code: 200,
            headers,
            body: String::new(),
            duration_ms: 1,
            from_cache: false,
            error: None,
        }
    }

    #[test]
    fn test_hardened_response_has_no_findings() {
        let tester = HeaderSecurityTester::new().unwrap();
        let findings = tester.analyze(
            "https://example.com/",
            &response(
                "https://example.com/",
                &[
                    ("content-security-policy", "default-src 'self'; frame-ancestors 'none'"),
                    ("x-content-type-options", "nosniff"),
                    ("strict-transport-security", "max-age=31536000"),
                    ("server", "nginx"),
                ],
            ),
        );
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_bare_response() {
        let tester = HeaderSecurityTester::new().unwrap();
        let findings = tester.analyze(
            "https://example.com/",
            &response("https://example.com/", &[("server", "Apache/2.4.41")]),
        );
        let types: Vec<&str> = findings.iter().map(|f| f.vuln_type.as_str()).collect();
        assert!(types.contains(&"Missing Content-Security-Policy"));
        assert!(types.contains(&"Clickjacking Protection Missing"));
        assert!(types.contains(&"Missing X-Content-Type-Options"));
        assert!(types.contains(&"Missing Strict-Transport-Security"));
        assert!(types.contains(&"Version Disclosure"));
        assert!(findings.iter().all(|f| f.tester_name == HEADER_SECURITY_TESTER));
    }

    #[test]
    fn test_hsts_not_expected_over_http() {
        let tester = HeaderSecurityTester::new().unwrap();
        let findings = tester.analyze("http://example.com/", &response("http://example.com/", &[]));
        assert!(findings.iter().all(|f| f.vuln_type != "Missing Strict-Transport-Security"));
    }
}
