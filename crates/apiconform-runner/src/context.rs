//! Test context and endpoint probe
//!
//! A [`TestContext`] is built once per run and only borrowed afterwards. Each
//! probe sends one GET and evaluates every assertion, so a slow 404 reports
//! both the status and the latency.

use std::collections::HashSet;
use std::time::Duration;

use apiconform_core::{
    Finding, RequestSnapshot, ResponseData, ResponseSnapshot, SchemaValidator, Severity,
    Specification, validate_self_link,
};
use serde_json::Value;

use crate::session::{Session, SessionError};

/// Everything a probe needs, fixed for the whole run.
pub struct TestContext<S> {
    base_url: String,
    local_test: bool,
    session: S,
    spec: Specification,
}

/// Result of one request and the checks run on it.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
    /// Decoded body; `None` when it is not JSON
    pub json: Option<Value>,
    pub findings: Vec<Finding>,
}

impl ProbeOutcome {
    /// No finding worse than a warning.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings
            .iter()
            .all(|f| f.failure_type().default_severity() == Severity::Warning)
    }

    /// Primary data of the body, if it has any.
    #[must_use]
    pub fn data(&self) -> Option<ResponseData<'_>> {
        self.json
            .as_ref()
            .and_then(|body| ResponseData::from_body(body).ok())
    }
}

impl<S: Session> TestContext<S> {
    pub fn new(
        base_url: impl Into<String>,
        local_test: bool,
        session: S,
        spec: Specification,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            local_test,
            session,
            spec,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn spec(&self) -> &Specification {
        &self.spec
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// GET `{base_url}{endpoint}` and check status, JSON decoding and latency.
    ///
    /// # Errors
    ///
    /// Returns error when no response arrives.
    pub fn probe(
        &self,
        endpoint: &str,
        expected_status: u16,
        params: &[(String, String)],
        max_elapsed: Duration,
    ) -> Result<ProbeOutcome, ProbeError> {
        let url = format!("{}{endpoint}", self.base_url);
        let request = RequestSnapshot::get(&url, params);

        let response = self
            .session
            .get(&url, params)
            .map_err(|source| ProbeError::Transport {
                url: url.clone(),
                source,
            })?;
        let latency_ms = u64::try_from(response.elapsed.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(
            url = %url,
            ?params,
            status = response.status,
            elapsed_ms = latency_ms,
            body = %response.body,
            "GET"
        );

        let mut findings = Vec::new();

        if response.status != expected_status {
            findings.push(Finding::UnexpectedStatus {
                expected: expected_status,
                actual: response.status,
            });
        }

        let json = match response.json() {
            Ok(json) => Some(json),
            Err(e) => {
                findings.push(Finding::NotJson(e.to_string()));
                None
            }
        };

        if response.elapsed >= max_elapsed {
            findings.push(Finding::SlowResponse {
                elapsed: response.elapsed,
                limit: max_elapsed,
            });
        }

        // Pretty-printed so reports and reproductions stay readable
        let body = json
            .as_ref()
            .and_then(|j| serde_json::to_string_pretty(j).ok())
            .unwrap_or_else(|| response.body.clone());

        Ok(ProbeOutcome {
            request,
            response: ResponseSnapshot {
                status_code: response.status,
                body: (!body.is_empty()).then_some(body),
                latency_ms,
            },
            json,
            findings,
        })
    }

    /// Probe, then check the body against `resource` and the self link.
    ///
    /// The schema is looked up before any request is sent.
    ///
    /// # Errors
    ///
    /// Returns error for an unknown resource or when no response arrives.
    pub fn check_endpoint(
        &self,
        endpoint: &str,
        resource: &str,
        expected_status: u16,
        params: &[(String, String)],
        nullable_fields: &HashSet<String>,
        max_elapsed: Duration,
    ) -> Result<ProbeOutcome, ProbeError> {
        let schema = self
            .spec
            .resource_schema(resource)
            .ok_or_else(|| ProbeError::UnknownResource(resource.to_string()))?;

        let mut outcome = self.probe(endpoint, expected_status, params, max_elapsed)?;
        let Some(body) = &outcome.json else {
            return Ok(outcome);
        };

        let schema_outcome = SchemaValidator::new(&self.spec, nullable_fields).check_body(
            outcome.response.status_code,
            body,
            schema,
        );
        let mut findings: Vec<Finding> = schema_outcome
            .violations
            .into_iter()
            .map(Finding::from)
            .chain(schema_outcome.warnings.into_iter().map(Finding::from))
            .collect();

        if let Some(link) = body
            .get("links")
            .and_then(|l| l.get("self"))
            .and_then(Value::as_str)
        {
            if let Err(violations) =
                validate_self_link(link, &self.base_url, endpoint, params, self.local_test)
            {
                findings.extend(violations.into_iter().map(Finding::from));
            }
        }

        outcome.findings.extend(findings);
        Ok(outcome)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: SessionError,
    },
    #[error("Resource '{0}' is not defined in the OpenAPI document")]
    UnknownResource(String),
}
