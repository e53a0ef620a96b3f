// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - NoSQL Injection Tester
 * Operator and JavaScript payloads against document-store backends
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::profiles::NOSQL_INJECTION_TESTER;
use crate::crawler::DiscoveredForm;
use crate::scanners::traits::{injection_targets, TestContext, Tester};
use crate::types::{Confidence, Finding, Severity};

const NOSQL_PAYLOADS: &[&str] = &[
    r#"{"$gt": ""}"#,
    r#"{"$ne": null}"#,
    "' || '1'=='1",
    "';return true;var x='",
    r#"{"$where": "this.x == this.x"}"#,
];

const MAX_PARALLEL_REQUESTS: usize = 4;

/// (backend, error signature)
static NOSQL_ERROR_SIGNATURES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("MongoDB", r"(?i)\bMongo(Server)?Error\b"),
        ("MongoDB", r"(?i)unknown (top level )?operator: \$\w+"),
        ("MongoDB", r"(?i)\$where.{0,40}(SyntaxError|ReferenceError)"),
        ("MongoDB", r"(?i)BSON(Type)?Error"),
        ("Mongoose", r"(?i)CastError: Cast to \w+ failed"),
        ("Mongoose", r"(?i)\bmongoose\b"),
        ("CouchDB", r#"(?i)"error"\s*:\s*"query_parse_error""#),
    ]
    .into_iter()
    .filter_map(|(backend, pattern)| Regex::new(pattern).ok().map(|re| (backend, re)))
    .collect()
});

pub struct NoSqlInjectionTester;

pub fn create() -> Result<Arc<dyn Tester>> {
    Ok(Arc::new(NoSqlInjectionTester))
}

/// First document-store error signature in `body`, as (backend, matched text)
pub fn match_nosql_error(body: &str) -> Option<(&'static str, String)> {
    NOSQL_ERROR_SIGNATURES
        .iter()
        .find_map(|(backend, re)| re.find(body).map(|m| (*backend, m.as_str().to_string())))
}

impl NoSqlInjectionTester {
    async fn check_field(&self, ctx: &TestContext, form: &DiscoveredForm, field: &str) -> Option<Finding> {
        let baseline = ctx.submit(form, field, "1").await;
        if baseline.is_inconclusive() {
            debug!("[{}] No baseline for {} ({})", NOSQL_INJECTION_TESTER, form.action, field);
            return None;
        }
        let baseline_error = match_nosql_error(&baseline.body);

        for payload in NOSQL_PAYLOADS {
            if ctx.is_cancelled() {
                return None;
            }

            let response = ctx.submit(form, field, payload).await;
            if response.is_inconclusive() {
                continue;
            }

            let Some((backend, evidence)) = match_nosql_error(&response.body) else {
                continue;
            };
            if baseline_error.as_ref().map_or(false, |(_, e)| *e == evidence) {
                continue;
            }

            return Some(
                Finding::new(
                    NOSQL_INJECTION_TESTER,
                    "NoSQL Injection",
                    &form.action,
                    &form.method,
                    payload,
                    Severity::High,
                )
                .with_parameter(field)
                .with_cwe("CWE-943")
                .with_confidence(Confidence::Medium)
                .with_evidence(format!("{} error: {}", backend, evidence))
                .with_description(format!(
                    "Parameter '{}' is interpreted by a {} query.",
                    field, backend
                )),
            );
        }
        None
    }
}

#[async_trait]
impl Tester for NoSqlInjectionTester {
    fn name(&self) -> &str {
        NOSQL_INJECTION_TESTER
    }

    fn description(&self) -> &str {
        "Error-based NoSQL injection"
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        let targets = injection_targets(&ctx.injection_points().await);
        info!("[{}] Testing {} parameters on {}", NOSQL_INJECTION_TESTER, targets.len(), ctx.target);

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
