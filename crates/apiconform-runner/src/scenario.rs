//! Scenario runner
//!
//! Runs the configured scenarios one at a time through
//! [`TestContext::check_endpoint`] and adds the scenario-level expectations
//! (pagination metadata, attribute filters) on top.

use apiconform_core::config::{Pagination, Scenario};
use apiconform_core::{
    CaseReport, Config, Finding, RequestSnapshot, ResponseData, RunReport, VerdictPolicy,
    classify_findings,
};
use serde_json::Value;

use crate::context::{ProbeError, TestContext};
use crate::session::Session;

pub struct ScenarioRunner<'a, S> {
    ctx: &'a TestContext<S>,
    config: &'a Config,
}

impl<'a, S: Session> ScenarioRunner<'a, S> {
    pub fn new(ctx: &'a TestContext<S>, config: &'a Config) -> Self {
        Self { ctx, config }
    }

    /// Run every scenario `filter` selects, in configuration order.
    #[must_use]
    pub fn run(&self, filter: Option<&str>) -> Vec<CaseReport> {
        self.config
            .scenarios
            .iter()
            .filter(|s| s.matches_filter(filter))
            .map(|s| self.run_one(s))
            .collect()
    }

    /// Run and judge.
    #[must_use]
    pub fn report(&self, filter: Option<&str>, policy: &VerdictPolicy) -> RunReport {
        RunReport::new(
            self.ctx.base_url(),
            self.config.local_test,
            self.run(filter),
            policy,
        )
    }

    fn run_one(&self, scenario: &Scenario) -> CaseReport {
        let params = scenario.query_params();
        let result = self.ctx.check_endpoint(
            &scenario.endpoint,
            &scenario.resource,
            scenario.expected_status,
            &params,
            &scenario.nullable_set(),
            self.config.max_elapsed(scenario),
        );

        let case = match result {
            Ok(outcome) => {
                let mut findings = outcome.findings.clone();
                if (200..300).contains(&outcome.response.status_code) {
                    if let (Some(pagination), Some(body)) = (scenario.pagination, &outcome.json) {
                        findings.extend(pagination_findings(pagination, &params, body));
                    }
                    if let Some(data) = outcome.data() {
                        findings.extend(attribute_findings(scenario, &data));
                    }
                }
                let failures = classify_findings(
                    &scenario.name,
                    &scenario.endpoint,
                    &outcome.request,
                    Some(&outcome.response),
                    &findings,
                );
                CaseReport::new(
                    &scenario.name,
                    &scenario.endpoint,
                    Some(&outcome.response),
                    failures,
                )
            }
            Err(e) => {
                let (url, finding) = match &e {
                    ProbeError::Transport { url, .. } => (url.clone(), Finding::Transport(e.to_string())),
                    ProbeError::UnknownResource(_) => (
                        format!("{}{}", self.ctx.base_url(), scenario.endpoint),
                        Finding::Assertion {
                            path: String::new(),
                            message: e.to_string(),
                        },
                    ),
                };
                let request = RequestSnapshot::get(url, &params);
                let failures =
                    classify_findings(&scenario.name, &scenario.endpoint, &request, None, &[finding]);
                CaseReport::new(&scenario.name, &scenario.endpoint, None, failures)
            }
        };

        tracing::info!(
            scenario = %scenario.name,
            failures = case.failures.len(),
            "scenario finished"
        );
        case
    }
}

/// `meta.currentPageNumber` / `meta.currentPageSize` must echo the requested
/// page, or the defaults when the request left them out.
fn pagination_findings(
    pagination: Pagination,
    params: &[(String, String)],
    body: &Value,
) -> Vec<Finding> {
    let requested = |name: &str, default: u64| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map_or_else(|| default.to_string(), |(_, v)| v.clone())
    };
    let expectations = [
        (
            "currentPageNumber",
            requested("page[number]", pagination.default_number),
        ),
        (
            "currentPageSize",
            requested("page[size]", pagination.default_size),
        ),
    ];

    let Some(meta) = body.get("meta") else {
        return vec![Finding::Assertion {
            path: "meta".to_string(),
            message: "Missing key 'meta'".to_string(),
        }];
    };

    expectations
        .into_iter()
        .filter_map(|(key, expected)| {
            let actual = meta.get(key).map(render);
            (actual.as_deref() != Some(expected.as_str())).then(|| Finding::Assertion {
                path: format!("meta.{key}"),
                message: format!(
                    "expected {expected}, got {}",
                    actual.as_deref().unwrap_or("nothing")
                ),
            })
        })
        .collect()
}

/// Every resource must carry each `attribute_equals` value (case-insensitive).
fn attribute_findings(scenario: &Scenario, data: &ResponseData<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (path, resource) in data.resources() {
        for (attribute, expected) in &scenario.attribute_equals {
            let actual = resource
                .get("attributes")
                .and_then(|a| a.get(attribute))
                .map(render);
            let matches = actual
                .as_deref()
                .is_some_and(|a| a.to_lowercase() == expected.to_lowercase());
            if !matches {
                findings.push(Finding::Assertion {
                    path: format!("{path}.attributes.{attribute}"),
                    message: format!(
                        "expected '{expected}', got {}",
                        actual.map_or_else(|| "nothing".to_string(), |a| format!("'{a}'"))
                    ),
                });
            }
        }
    }
    findings
}

/// Strings without quotes, everything else in JSON spelling.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
