//! Conversion: probe findings → verdict types
//!
//! Probes and validators report what they saw as [`Finding`]s. Classification
//! into failure type and severity happens here, once a finding is attributed
//! to a scenario.

use std::time::Duration;

use crate::validate::SchemaWarning;
use crate::verdict::{Failure, FailureType, RequestSnapshot, ResponseSnapshot};
use crate::violation::Violation;

/// One problem observed while exercising an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    UnexpectedStatus { expected: u16, actual: u16 },
    /// Body failed to decode; carries the decoder's message
    NotJson(String),
    SlowResponse { elapsed: Duration, limit: Duration },
    Violation(Violation),
    Warning(SchemaWarning),
    /// Scenario-level expectation (pagination, attribute filter)
    Assertion { path: String, message: String },
    /// No response; carries the transport error
    Transport(String),
}

impl Finding {
    #[must_use]
    pub const fn failure_type(&self) -> FailureType {
        match self {
            Self::UnexpectedStatus { .. } => FailureType::UnexpectedStatus,
            Self::NotJson(_) => FailureType::ResponseNotJson,
            Self::SlowResponse { .. } => FailureType::LatencyExceeded,
            Self::Violation(v) => FailureType::from_violation(v.kind),
            Self::Warning(_) => FailureType::SchemaWarning,
            Self::Assertion { .. } => FailureType::ScenarioAssertion,
            Self::Transport(_) => FailureType::TransportError,
        }
    }

    /// Field path the finding refers to, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        let path = match self {
            Self::Violation(v) => v.path.as_str(),
            Self::Warning(w) => w.path.as_str(),
            Self::Assertion { path, .. } => path.as_str(),
            _ => return None,
        };
        (!path.is_empty()).then_some(path)
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnexpectedStatus { expected, actual } => {
                format!("expected status {expected}, got {actual}")
            }
            Self::NotJson(error) => format!("body is not valid JSON: {error}"),
            Self::SlowResponse { elapsed, limit } => format!(
                "took {:.3}s, limit is {:.3}s",
                elapsed.as_secs_f64(),
                limit.as_secs_f64()
            ),
            Self::Violation(v) => format!("{}: {}", v.kind, v.message),
            Self::Warning(w) => w.message.clone(),
            Self::Assertion { message, .. } => message.clone(),
            Self::Transport(error) => error.clone(),
        }
    }
}

impl From<Violation> for Finding {
    fn from(violation: Violation) -> Self {
        Self::Violation(violation)
    }
}

impl From<SchemaWarning> for Finding {
    fn from(warning: SchemaWarning) -> Self {
        Self::Warning(warning)
    }
}

/// Convert a scenario's findings to classified failures.
///
/// Every failure carries the request (and the response when one arrived) so
/// it can be reproduced on its own.
#[must_use]
pub fn classify_findings(
    scenario: &str,
    endpoint: &str,
    request: &RequestSnapshot,
    response: Option<&ResponseSnapshot>,
    findings: &[Finding],
) -> Vec<Failure> {
    findings
        .iter()
        .enumerate()
        .map(|(idx, finding)| {
            let mut failure = Failure::new(
                finding.failure_type(),
                scenario,
                endpoint,
                request.clone(),
                finding.message(),
            )
            .with_index(idx);
            if let Some(location) = finding.location() {
                failure = failure.with_location(location);
            }
            if let Some(response) = response {
                failure = failure.with_response(response.clone());
            }
            failure
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Severity;
    use crate::violation::ViolationKind;

    fn request() -> RequestSnapshot {
        RequestSnapshot::get(
            "https://api.example.edu/v1/pets",
            &[("page[size]".to_string(), "1".to_string())],
        )
    }

    fn response() -> ResponseSnapshot {
        ResponseSnapshot {
            status_code: 200,
            body: Some("{\n  \"data\": []\n}".to_string()),
            latency_ms: 40,
        }
    }

    #[test]
    fn classify_each_finding_type() {
        let findings = [
            Finding::UnexpectedStatus {
                expected: 200,
                actual: 500,
            },
            Finding::NotJson("expected value at line 1 column 1".to_string()),
            Finding::SlowResponse {
                elapsed: Duration::from_millis(5_200),
                limit: Duration::from_secs(5),
            },
            Finding::Violation(Violation::new(
                ViolationKind::MissingQueryParam,
                "links.self",
                "query parameter 'page[size]' missing from self link",
            )),
            Finding::Warning(SchemaWarning {
                path: "data.attributes.toy".to_string(),
                message: "reference cycle through '#/definitions/Loop'".to_string(),
            }),
            Finding::Transport("connection refused".to_string()),
        ];
        let types: Vec<FailureType> = findings.iter().map(Finding::failure_type).collect();
        assert_eq!(
            types,
            vec![
                FailureType::UnexpectedStatus,
                FailureType::ResponseNotJson,
                FailureType::LatencyExceeded,
                FailureType::LinkMismatch,
                FailureType::SchemaWarning,
                FailureType::TransportError,
            ]
        );
    }

    #[test]
    fn slow_response_message() {
        let finding = Finding::SlowResponse {
            elapsed: Duration::from_millis(5_250),
            limit: Duration::from_secs(5),
        };
        insta::assert_snapshot!(finding.message(), @"took 5.250s, limit is 5.000s");
        assert_eq!(finding.location(), None);
    }

    #[test]
    fn convert_attaches_request_response_and_location() {
        let findings = [
            Finding::from(Violation::new(
                ViolationKind::TypeMismatch,
                "data[0].attributes.age",
                "expected integer, got number",
            )),
            Finding::Assertion {
                path: "meta.currentPageSize".to_string(),
                message: "expected 1, got 25".to_string(),
            },
        ];
        let failures = classify_findings("paged", "/pets", &request(), Some(&response()), &findings);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].id, "paged#0");
        assert_eq!(failures[1].id, "paged#1");
        assert_eq!(failures[0].failure_type, FailureType::SchemaViolation);
        assert_eq!(
            failures[0].location.as_deref(),
            Some("data[0].attributes.age")
        );
        assert_eq!(failures[0].message, "type mismatch: expected integer, got number");
        assert_eq!(failures[1].failure_type, FailureType::ScenarioAssertion);
        assert_eq!(failures[1].status_code(), Some(200));
        assert_eq!(failures[1].request.params, request().params);
    }

    #[test]
    fn transport_failure_has_no_response() {
        let failures = classify_findings(
            "down",
            "/pets",
            &request(),
            None,
            &[Finding::Transport("connection refused".to_string())],
        );
        assert_eq!(failures[0].severity, Severity::Critical);
        assert!(failures[0].response.is_none());
    }

    #[test]
    fn empty_findings_produce_no_failures() {
        assert!(classify_findings("ok", "/pets", &request(), None, &[]).is_empty());
    }
}
