//! Run report: per-scenario results plus the overall verdict
//!
//! Serialized as JSON by `--output json` and `--report`; the JSON Schema is
//! published through `apiconform schema`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{
    Failure, FailureType, ResponseSnapshot, Verdict, VerdictPolicy, VerdictStatus,
};

/// Outcome of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    /// No response arrived
    Error,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// One scenario's request, response summary and failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaseReport {
    pub scenario: String,
    pub endpoint: String,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

impl CaseReport {
    /// Status starts as `Passed`; [`RunReport::new`] settles it under the policy.
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        endpoint: impl Into<String>,
        response: Option<&ResponseSnapshot>,
        failures: Vec<Failure>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            endpoint: endpoint.into(),
            status: CaseStatus::Passed,
            status_code: response.map(|r| r.status_code),
            latency_ms: response.map(|r| r.latency_ms),
            failures,
        }
    }
}

/// Top-level report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    /// Base URL the scenarios ran against
    pub base_url: String,
    pub local_test: bool,
    pub strict: bool,
    pub verdict: Verdict,
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// Apply the policy's filter to every case and judge the run.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        local_test: bool,
        cases: Vec<CaseReport>,
        policy: &VerdictPolicy,
    ) -> Self {
        let cases: Vec<CaseReport> = cases
            .into_iter()
            .map(|mut case| {
                case.failures = policy.filter(case.failures);
                case.status = match policy.exit_code(&case.failures) {
                    0 => CaseStatus::Passed,
                    1 => CaseStatus::Failed,
                    _ => CaseStatus::Error,
                };
                case
            })
            .collect();

        let failures: Vec<Failure> = cases.iter().flat_map(|c| c.failures.clone()).collect();
        let verdict = policy.verdict(&failures, cases.len());

        Self {
            base_url: base_url.into(),
            local_test,
            strict: policy.strict,
            verdict,
            cases,
        }
    }

    /// Every failure across all cases, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.cases.iter().flat_map(|c| c.failures.iter())
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict.status == VerdictStatus::Pass
    }

    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        for case in &self.cases {
            let detail = match (case.status_code, case.latency_ms) {
                (Some(code), Some(ms)) => format!(" ({code}, {ms} ms)"),
                _ => String::new(),
            };
            lines.push(format!(
                "[{}] {} GET {}{detail}",
                case.status, case.scenario, case.endpoint
            ));
            for failure in &case.failures {
                lines.push(format!("  {failure}"));
                if failure.failure_type == FailureType::UnexpectedStatus {
                    lines.extend(exchange_lines(failure));
                }
            }
        }

        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{}: {}", self.verdict.status, self.verdict.reason));
        lines.join("\n")
    }
}

/// Request URL, parameters and response body, indented under the failure.
fn exchange_lines(failure: &Failure) -> Vec<String> {
    let mut lines = vec![format!("    {} {}", failure.request.method, failure.request.url)];
    if !failure.request.params.is_empty() {
        let params: Vec<String> = failure
            .request
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        lines.push(format!("    Params: {}", params.join(", ")));
    }
    if let Some(body) = failure.response.as_ref().and_then(|r| r.body.as_deref()) {
        lines.push("    Body:".to_string());
        lines.extend(body.lines().map(|l| format!("      {l}")));
    }
    lines
}

/// Generate JSON Schema for the report format.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
