// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Open Redirect Tester
 * Points redirect-style parameters at a foreign host and inspects the raw 3xx
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::config::profiles::OPEN_REDIRECT_TESTER;
use crate::crawler::DiscoveredForm;
use crate::http_client::RequestOptions;
use crate::scanners::traits::{injection_targets, TestContext, Tester};
use crate::types::{Confidence, Finding, Severity};

/// Host no target legitimately redirects to
pub const REDIRECT_CANARY_HOST: &str = "lonkero-redirect.example";

/// Parameter names that commonly carry a post-action destination
const REDIRECT_PARAMS: &[&str] = &[
    "url", "redirect", "redirect_to", "redirecturl", "redirect_uri", "return", "returnurl",
    "return_url", "returnto", "goto", "next", "target", "link", "redir", "dest", "destination",
    "continue",
];

const MAX_PARALLEL_REQUESTS: usize = 4;

pub struct OpenRedirectTester {
    payloads: Vec<String>,
}

pub fn create() -> Result<Arc<dyn Tester>> {
    Ok(Arc::new(OpenRedirectTester::new()))
}

impl Default for OpenRedirectTester {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameter name looks like it controls a redirect
pub fn is_redirect_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    REDIRECT_PARAMS.contains(&name.as_str())
}

/// `location`, resolved against `request_url`, lands on the canary host
pub fn redirects_to_canary(request_url: &str, location: &str) -> bool {
    let resolved = match Url::parse(request_url) {
        Ok(base) => base.join(location.trim()),
        Err(_) => Url::parse(location.trim()),
    };
    resolved
        .ok()
        .and_then(|url| url.host_str().map(|h| h.eq_ignore_ascii_case(REDIRECT_CANARY_HOST)))
        .unwrap_or(false)
}

impl OpenRedirectTester {
    pub fn new() -> Self {
        Self {
            payloads: vec![
                format!("https://{}/", REDIRECT_CANARY_HOST),
                format!("//{}/", REDIRECT_CANARY_HOST),
                format!("/\\{}/", REDIRECT_CANARY_HOST),
            ],
        }
    }

    async fn check_field(&self, ctx: &TestContext, form: &DiscoveredForm, field: &str) -> Option<Finding> {
        for payload in &self.payloads {
            if ctx.is_cancelled() {
                return None;
            }

            // The 3xx itself is the evidence, so it must not be followed
            let options = RequestOptions {
                follow_redirects: Some(false),
                ..Default::default()
            };
            let response = ctx.submit_with(form, field, payload, options).await;
            if response.is_inconclusive() || !(300..400).contains(&response.status_code) {
                continue;
            }

            let Some(location) = response.header("location") else {
                continue;
            };
            if redirects_to_canary(&response.url, location) {
                return Some(
                    Finding::new(
                        OPEN_REDIRECT_TESTER,
                        "Open Redirect",
                        &form.action,
                        &form.method,
                        payload,
                        Severity::Medium,
                    )
                    .with_parameter(field)
                    .with_cwe("CWE-601")
                    .with_confidence(Confidence::High)
                    .with_evidence(format!("{} Location: {}", response.status_code, location))
                    .with_description(format!(
                        "Parameter '{}' sends visitors to an arbitrary external host.",
                        field
                    )),
                );
            }
        }
        None
    }
}

#[async_trait]
impl Tester for OpenRedirectTester {
    fn name(&self) -> &str {
        OPEN_REDIRECT_TESTER
    }

    fn description(&self) -> &str {
        "Open redirect via destination parameters"
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        let targets: Vec<(DiscoveredForm, String)> = injection_targets(&ctx.injection_points().await)
            .into_iter()
            .filter(|(_, field)| is_redirect_param(field))
            .collect();

        if targets.is_empty() {
            debug!("[{}] No redirect parameters on {}", OPEN_REDIRECT_TESTER, ctx.target);
            return Ok(());
        }
        info!("[{}] Testing {} parameters on {}", OPEN_REDIRECT_TESTER, targets.len(), ctx.target);

        stream::iter(targets)
            .map(|(form, field)| async move {
                if let Some(finding) = self.check_field(ctx, &form, &field).await {
                    ctx.report(finding).await;
                }
            })
            .buffer_unordered(MAX_PARALLEL_REQUESTS)
            .collect::<Vec<()>>()
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_params() {
        assert!(is_redirect_param("returnUrl"));
        assert!(is_redirect_param("next"));
        assert!(!is_redirect_param("q"));
    }

    #[test]
    fn test_canary_location_resolution() {
        let request = "https://shop.example.com/login?next=x";
        assert!(redirects_to_canary(request, "https://lonkero-redirect.example/"));
        assert!(redirects_to_canary(request, "//lonkero-redirect.example/"));
        assert!(redirects_to_canary(request, "/\\lonkero-redirect.example/"));
        assert!(!redirects_to_canary(request, "/dashboard"));
        assert!(!redirects_to_canary(request, "https://shop.example.com/?u=lonkero-redirect.example"));
    }
}
