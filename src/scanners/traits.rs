// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Tester Contract
 * Capability interface every vulnerability tester implements
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::crawler::{parse_forms, DiscoveredForm, FormInput};
use crate::event_bus::{EventBus, ScanEvent};
use crate::http_client::{HttpClient, RequestOptions, RequestResult};
use crate::types::{Finding, ScanConfig};

/// A pluggable vulnerability check.
///
/// Implementations are created once by the registry and reused across scans,
/// so per-scan state lives in `TestContext`, not in the tester. Every
/// confirmed finding must go out through `TestContext::report`; findings a
/// tester keeps to itself are invisible to the engine.
#[async_trait]
pub trait Tester: Send + Sync {
    /// Unique name
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Test `ctx.target`. All traffic goes through `ctx.client`, so every
    /// request is bounded by the executor timeout.
    async fn run(&self, ctx: &TestContext) -> Result<()>;
}

/// Everything a tester may touch during one scan
#[derive(Clone)]
pub struct TestContext {
    pub target: String,
    pub client: Arc<HttpClient>,
    pub bus: Arc<EventBus>,
    pub config: Arc<ScanConfig>,
    /// Forms handed over by an earlier mapping pass; empty means "find them yourself"
    pub forms: Arc<Vec<DiscoveredForm>>,
    pub cancel: CancellationToken,
}

impl TestContext {
    pub fn new(target: &str, client: Arc<HttpClient>, bus: Arc<EventBus>, config: Arc<ScanConfig>) -> Self {
        Self {
            target: target.to_string(),
            client,
            bus,
            config,
            forms: Arc::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_forms(mut self, forms: Vec<DiscoveredForm>) -> Self {
        self.forms = Arc::new(forms);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Submittable forms for the target: the provided list, or the forms
    /// found on the target page itself.
    pub async fn forms(&self) -> Vec<DiscoveredForm> {
        if !self.forms.is_empty() {
            return self.forms.as_ref().clone();
        }

        let response = self.client.get(&self.target).await;
        if !response.is_success() {
            debug!(
                "No forms from {} (status {}, error {:?})",
                self.target, response.status_code, response.error
            );
            return Vec::new();
        }

        parse_forms(&response.body, &response.final_url)
    }

    /// Forms plus the target's own query string as a GET form
    pub async fn injection_points(&self) -> Vec<DiscoveredForm> {
        let mut points = self.forms().await;
        if let Some(query_form) = query_form(&self.target) {
            points.push(query_form);
        }
        points
    }

    /// Submit `form` with `field` set to `payload`; other fields keep their
    /// default value or a benign filler.
    pub async fn submit(&self, form: &DiscoveredForm, field: &str, payload: &str) -> RequestResult {
        self.submit_with(form, field, payload, RequestOptions::default()).await
    }

    /// `submit` with explicit request options; `options.params` is replaced
    /// by the form fields.
    pub async fn submit_with(
        &self,
        form: &DiscoveredForm,
        field: &str,
        payload: &str,
        options: RequestOptions,
    ) -> RequestResult {
        let params: Vec<(String, String)> = form
            .inputs
            .iter()
            .map(|input| {
                let value = if input.name == field {
                    payload.to_string()
                } else {
                    input.value.clone().unwrap_or_else(|| filler_for(input))
                };
                (input.name.clone(), value)
            })
            .collect();

        let method = if form.method.eq_ignore_ascii_case("POST") {
            Method::POST
        } else {
            Method::GET
        };
        self.client
            .execute(method, &form.action, RequestOptions { params, ..options })
            .await
    }

    /// Publish a finding on the bus
    pub async fn report(&self, finding: Finding) {
        self.bus.publish(ScanEvent::VulnerabilityFound(finding)).await;
    }
}

/// Every (form, field) pair worth injecting into, owned so checks can run
/// concurrently without borrowing the form list
pub fn injection_targets(forms: &[DiscoveredForm]) -> Vec<(DiscoveredForm, String)> {
    forms
        .iter()
        .flat_map(|form| {
            form.inputs
                .iter()
                .filter(|input| is_injectable(input))
                .map(move |input| (form.clone(), input.name.clone()))
        })
        .collect()
}

/// Input types that never carry user data
pub fn is_injectable(input: &FormInput) -> bool {
    !matches!(
        input.input_type.to_lowercase().as_str(),
        "submit" | "button" | "reset" | "image" | "file"
    )
}

fn filler_for(input: &FormInput) -> String {
    match input.input_type.to_lowercase().as_str() {
        "email" => "test@example.com".to_string(),
        "number" | "range" => "1".to_string(),
        "url" => "https://example.com".to_string(),
        _ => "test".to_string(),
    }
}

fn query_form(target: &str) -> Option<DiscoveredForm> {
    let url = Url::parse(target).ok()?;
    let inputs: Vec<FormInput> = url
        .query_pairs()
        .map(|(name, value)| FormInput {
            name: name.into_owned(),
            input_type: "text".to_string(),
            value: Some(value.into_owned()),
        })
        .collect();

    if inputs.is_empty() {
        return None;
    }

    let mut action = url.clone();
    action.set_query(None);
    action.set_fragment(None);

    Some(DiscoveredForm {
        page: target.to_string(),
        action: action.to_string(),
        method: "GET".to_string(),
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_form() {
        let form = query_form("https://example.com/items?id=5&sort=asc#top").unwrap();
        assert_eq!(form.action, "https://example.com/items");
        assert_eq!(form.input_names(), vec!["id", "sort"]);
        assert_eq!(form.inputs[0].value.as_deref(), Some("5"));
        assert!(query_form("https://example.com/").is_none());
    }

    #[test]
    fn test_is_injectable() {
        let input = |t: &str| FormInput {
            name: "x".to_string(),
            input_type: t.to_string(),
            value: None,
        };
        assert!(is_injectable(&input("text")));
        assert!(is_injectable(&input("hidden")));
        assert!(!is_injectable(&input("SUBMIT")));
        assert!(!is_injectable(&input("file")));
    }

    #[test]
    fn test_injection_targets_skip_buttons() {
        let form = DiscoveredForm {
            page: "https://example.com/".to_string(),
            action: "https://example.com/search".to_string(),
            method: "GET".to_string(),
            inputs: vec![
                FormInput {
                    name: "q".to_string(),
                    input_type: "text".to_string(),
                    value: None,
                },
                FormInput {
                    name: "go".to_string(),
                    input_type: "submit".to_string(),
                    value: Some("Search".to_string()),
                },
            ],
        };
        let targets = injection_targets(&[form]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].1, "q");
    }
}
