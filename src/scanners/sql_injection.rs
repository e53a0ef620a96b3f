// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Error-based SQL Injection Tester
 * Breaks out of quoted contexts and looks for database error signatures
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

use crate::config::profiles::SQL_INJECTION_TESTER;
use crate::crawler::DiscoveredForm;
use crate::scanners::traits::{injection_targets, TestContext, Tester};
use crate::types::{Confidence, Finding, Severity};

const SQLI_PAYLOADS: &[&str] = &["'", "\"", "')", "' OR '1'='1' -- ", "1' ORDER BY 9999-- "];

const MAX_PARALLEL_REQUESTS: usize = 4;

/// (database, error signature)
static SQL_ERROR_SIGNATURES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("MySQL", r"(?i)you have an error in your sql syntax"),
        ("MySQL", r"(?i)warning:\s*mysqli?_"),
        ("MySQL", r"(?i)mysql_fetch_(array|assoc|row)"),
        ("PostgreSQL", r"(?i)pg_query\(\)|pg_exec\(\)"),
        ("PostgreSQL", r"(?i)unterminated quoted string at or near"),
        ("PostgreSQL", r"(?i)syntax error at or near"),
        ("Microsoft SQL Server", r"(?i)unclosed quotation mark after the character string"),
        ("Microsoft SQL Server", r"(?i)microsoft (ole db provider for sql server|odbc sql server driver)"),
        ("Oracle", r"\bORA-\d{5}\b"),
        ("SQLite", r"(?i)sqlite3?\.operationalerror|sqlite_error|unrecognized token:"),
        ("Generic", r"(?i)sqlstate\[\w+\]"),
    ]
    .into_iter()
    .filter_map(|(db, pattern)| Regex::new(pattern).ok().map(|re| (db, re)))
    .collect()
});

pub struct SqlInjectionTester;

pub fn create() -> Result<Arc<dyn Tester>> {
    Ok(Arc::new(SqlInjectionTester))
}

/// First database error signature in `body`, as (database, matched text)
pub fn match_sql_error(body: &str) -> Option<(&'static str, String)> {
    SQL_ERROR_SIGNATURES
        .iter()
        .find_map(|(db, re)| re.find(body).map(|m| (*db, m.as_str().to_string())))
}

impl SqlInjectionTester {
    async fn check_field(&self, ctx: &TestContext, form: &DiscoveredForm, field: &str) -> Option<Finding> {
        let baseline = ctx.submit(form, field, "1").await;
        if baseline.is_inconclusive() {
            debug!("[{}] No baseline for {} ({})", SQL_INJECTION_TESTER, form.action, field);
            return None;
        }
        // Pages that already show a database error prove nothing about this input
        let baseline_error = match_sql_error(&baseline.body);

        for payload in SQLI_PAYLOADS {
            if ctx.is_cancelled() {
                return None;
            }

            let response = ctx.submit(form, field, payload).await;
            if response.is_inconclusive() {
                continue;
            }

            if let Some((db, evidence)) = match_sql_error(&response.body) {
                if baseline_error.as_ref().map_or(false, |(_, e)| *e == evidence) {
                    continue;
                }

                return Some(
                    Finding::new(
                        SQL_INJECTION_TESTER,
                        "SQL Injection",
                        &form.action,
                        &form.method,
                        payload,
                        Severity::Critical,
                    )
                    .with_parameter(field)
                    .with_cwe("CWE-89")
                    .with_confidence(Confidence::High)
                    .with_evidence(format!("{} error: {}", db, evidence))
                    .with_description(format!(
                        "Parameter '{}' reaches a {} query without parameterization.",
                        field, db
                    )),
                );
            }
        }
        None
    }
}

#[async_trait]
impl Tester for SqlInjectionTester {
    fn name(&self) -> &str {
        SQL_INJECTION_TESTER
    }

    fn description(&self) -> &str {
        "Error-based SQL injection"
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        let targets = injection_targets(&ctx.injection_points().await);
        info!("[{}] Testing {} parameters on {}", SQL_INJECTION_TESTER, targets.len(), ctx.target);

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
        debug!("[{}] {} confirmed on {}", SQL_INJECTION_TESTER, confirmed, ctx.target);

        Ok(())
    }
}
