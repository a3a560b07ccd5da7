//! Failure types and structured representation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Severity;
use crate::violation::ViolationKind;

/// Type of failure - determines default severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// Status code differs from the scenario's expected status
    UnexpectedStatus,
    /// Body is not valid JSON
    ResponseNotJson,
    /// Response took at least the configured latency bound
    LatencyExceeded,
    /// Body does not match the resource schema
    SchemaViolation,
    /// Self link does not point back at the request
    LinkMismatch,
    /// Pagination metadata or attribute expectation not met
    ScenarioAssertion,
    /// Schema reference could not be resolved; field left unchecked
    SchemaWarning,
    /// Request never completed (connection, TLS, DNS)
    TransportError,
}

impl FailureType {
    /// Default severity for this failure type
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::TransportError => Severity::Critical,
            Self::SchemaWarning => Severity::Warning,
            Self::UnexpectedStatus
            | Self::ResponseNotJson
            | Self::LatencyExceeded
            | Self::SchemaViolation
            | Self::LinkMismatch
            | Self::ScenarioAssertion => Severity::Error,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnexpectedStatus => "Unexpected status code",
            Self::ResponseNotJson => "Response body is not JSON",
            Self::LatencyExceeded => "Response time limit exceeded",
            Self::SchemaViolation => "Response does not match OpenAPI schema",
            Self::LinkMismatch => "Self link does not match request",
            Self::ScenarioAssertion => "Scenario expectation not met",
            Self::SchemaWarning => "Schema reference could not be resolved",
            Self::TransportError => "Request failed before a response arrived",
        }
    }

    /// Which failure type a contract violation belongs to.
    #[must_use]
    pub const fn from_violation(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::LinkMismatch | ViolationKind::MissingQueryParam => Self::LinkMismatch,
            ViolationKind::UnexpectedField
            | ViolationKind::TypeMismatch
            | ViolationKind::FormatMismatch
            | ViolationKind::PatternMismatch
            | ViolationKind::MissingKey
            | ViolationKind::ResourceTypeMismatch => Self::SchemaViolation,
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Snapshot of HTTP request for reproduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestSnapshot {
    pub method: String,
    /// Full URL without query string
    pub url: String,
    /// Query parameters in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<(String, String)>,
}

impl RequestSnapshot {
    #[must_use]
    pub fn get(url: impl Into<String>, params: &[(String, String)]) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            params: params.to_vec(),
        }
    }
}

/// Snapshot of HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

/// A single failure case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Failure {
    /// `<scenario>#<n>`, unique within a run
    pub id: String,
    /// Scenario that produced the failure
    pub scenario: String,
    /// Endpoint path relative to the base URL
    pub endpoint: String,
    /// Type of failure
    pub failure_type: FailureType,
    /// Severity level
    pub severity: Severity,
    /// What went wrong
    pub message: String,
    /// Field path inside the body (`data[0].attributes.owner`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Full request for reproduction
    pub request: RequestSnapshot,
    /// Response received (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
}

impl Failure {
    /// Create a failure with the type's default severity
    #[must_use]
    pub fn new(
        failure_type: FailureType,
        scenario: impl Into<String>,
        endpoint: impl Into<String>,
        request: RequestSnapshot,
        message: impl Into<String>,
    ) -> Self {
        let scenario = scenario.into();
        Self {
            id: format!("{scenario}#0"),
            scenario,
            endpoint: endpoint.into(),
            failure_type,
            severity: failure_type.default_severity(),
            message: message.into(),
            location: None,
            request,
            response: None,
        }
    }

    /// Status code of the response, if one arrived
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }

    /// Add response to failure
    #[must_use]
    pub fn with_response(mut self, response: ResponseSnapshot) -> Self {
        self.response = Some(response);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.id = format!("{}#{index}", self.scenario);
        self
    }

    /// Override severity
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.failure_type)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> RequestSnapshot {
        RequestSnapshot::get(
            "http://localhost:8080/api/pets",
            &[("filter[species]".to_string(), "dog".to_string())],
        )
    }

    #[test]
    fn failure_type_severity_mapping() {
        assert_eq!(
            FailureType::TransportError.default_severity(),
            Severity::Critical
        );
        assert_eq!(
            FailureType::SchemaViolation.default_severity(),
            Severity::Error
        );
        assert_eq!(
            FailureType::LatencyExceeded.default_severity(),
            Severity::Error
        );
        assert_eq!(
            FailureType::SchemaWarning.default_severity(),
            Severity::Warning
        );
    }

    #[test]
    fn link_kinds_map_to_link_mismatch() {
        assert_eq!(
            FailureType::from_violation(ViolationKind::MissingQueryParam),
            FailureType::LinkMismatch
        );
        assert_eq!(
            FailureType::from_violation(ViolationKind::LinkMismatch),
            FailureType::LinkMismatch
        );
        assert_eq!(
            FailureType::from_violation(ViolationKind::UnexpectedField),
            FailureType::SchemaViolation
        );
    }

    #[test]
    fn failure_builder_pattern() {
        let failure = Failure::new(
            FailureType::SchemaViolation,
            "get all pets",
            "/pets",
            sample_request(),
            "expected integer, got number",
        )
        .with_location("data[0].attributes.age")
        .with_index(3)
        .with_severity(Severity::Warning);

        assert_eq!(failure.id, "get all pets#3");
        assert_eq!(failure.severity, Severity::Warning);
        assert_eq!(failure.status_code(), None);
        insta::assert_snapshot!(
            failure.to_string(),
            @"[warning] Response does not match OpenAPI schema at data[0].attributes.age: expected integer, got number"
        );
    }

    #[test]
    fn failure_serialization_roundtrip() {
        let failure = Failure::new(
            FailureType::UnexpectedStatus,
            "get pet",
            "/pets/1",
            sample_request(),
            "expected 200, got 404",
        )
        .with_response(ResponseSnapshot {
            status_code: 404,
            body: Some("{}".to_string()),
            latency_ms: 12,
        });
        let json = serde_json::to_string(&failure).unwrap();
        let parsed: Failure = serde_json::from_str(&json).unwrap();

        assert_eq!(failure, parsed);
        assert_eq!(parsed.status_code(), Some(404));
    }
}
