// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Reflected XSS Tester
 * Submits markup payloads to every form input and looks for verbatim reflection
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::profiles::REFLECTED_XSS_TESTER;
use crate::crawler::DiscoveredForm;
use crate::scanners::traits::{injection_targets, TestContext, Tester};
use crate::types::{Confidence, Finding, Severity};

const XSS_PAYLOADS: &[&str] = &[
    "<script>alert(1337)</script>",
    "\"><svg/onload=alert(1337)>",
    "<img src=x onerror=alert(1337)>",
    "'\"><lonkero-xss>",
];

/// Upper bound on requests per tester in flight; the governor still applies
const MAX_PARALLEL_REQUESTS: usize = 8;

pub struct ReflectedXssTester {
    payloads: Vec<String>,
}

pub fn create() -> Result<Arc<dyn Tester>> {
    Ok(Arc::new(ReflectedXssTester::new()))
}

impl Default for ReflectedXssTester {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectedXssTester {
    pub fn new() -> Self {
        Self::with_payloads(XSS_PAYLOADS.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_payloads(payloads: Vec<String>) -> Self {
        Self { payloads }
    }

    /// First payload reflected unencoded by `field`, if any
    async fn check_field(&self, ctx: &TestContext, form: &DiscoveredForm, field: &str) -> Option<Finding> {
        for payload in &self.payloads {
            if ctx.is_cancelled() {
                return None;
            }

            let response = ctx.submit(form, field, payload).await;
            if response.is_inconclusive() {
                debug!("[{}] Inconclusive check of {} ({})", REFLECTED_XSS_TESTER, form.action, field);
                continue;
            }

            if response.is_success() && response.contains(payload) {
                return Some(
                    Finding::new(
                        REFLECTED_XSS_TESTER,
                        "Reflected Cross-Site Scripting",
                        &form.action,
                        &form.method,
                        payload,
                        Severity::High,
                    )
                    .with_parameter(field)
                    .with_cwe("CWE-79")
                    .with_confidence(Confidence::High)
                    .with_evidence(format!("Payload reflected unencoded in {} response", response.status_code))
                    .with_description(format!(
                        "Parameter '{}' is echoed into the page without output encoding.",
                        field
                    )),
                );
            }
        }
        None
    }
}

#[async_trait]
impl Tester for ReflectedXssTester {
    fn name(&self) -> &str {
        REFLECTED_XSS_TESTER
    }

    fn description(&self) -> &str {
        "Reflected XSS via form and query parameters"
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        let targets = injection_targets(&ctx.injection_points().await);
        info!("[{}] Testing {} parameters on {}", REFLECTED_XSS_TESTER, targets.len(), ctx.target);

        // Each finding goes out as soon as it is confirmed
        let outcomes: Vec<bool> = stream::iter(targets)
            .map(|(form, field)| async move {
                match self.check_field(ctx, &form, &field).await {
                    Some(finding) => {
                        ctx.report(finding).await;
                        true
                    }
                    None => false,
                }
            })
            .buffer_unordered(MAX_PARALLEL_REQUESTS)
            .collect()
            .await;

        let confirmed = outcomes.iter().filter(|reported| **reported).count();
        debug!("[{}] {} confirmed on {}", REFLECTED_XSS_TESTER, confirmed, ctx.target);

        Ok(())
    }
}
