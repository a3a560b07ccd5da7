//! HTTP file generator - converts failures to .http format

use crate::verdict::{Failure, RequestSnapshot};

/// Generate .http file content from failures
///
/// Failures sharing a request are written once, with every message listed
/// above it. URLs under `base_url` are rewritten to `{{base_url_var}}`.
#[must_use]
pub fn to_http_file(failures: &[Failure], base_url: &str, base_url_var: &str) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "# Auto-generated reproduction cases ({} failures)",
        failures.len()
    ));
    lines.push(format!("@{base_url_var} = {base_url}"));
    lines.push(String::new());

    let mut groups: Vec<(&RequestSnapshot, Vec<&Failure>)> = Vec::new();
    for failure in failures {
        match groups.iter_mut().find(|(r, _)| **r == failure.request) {
            Some((_, members)) => members.push(failure),
            None => groups.push((&failure.request, vec![failure])),
        }
    }

    for (idx, (request, members)) in groups.iter().enumerate() {
        lines.push(format!("### [{idx}] {}", members[0].scenario));
        for failure in members {
            lines.push(format!("# {} ({})", failure, failure.id));
        }
        let mut request = RequestSnapshot::clone(request);
        if let Some(rest) = request.url.strip_prefix(base_url) {
            request.url = format!("{{{{{base_url_var}}}}}{rest}");
        }
        lines.push(request_line(&request));
        lines.push("Accept: application/json".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// `GET <url>?<query>` with the query string rebuilt from the snapshot
fn request_line(request: &RequestSnapshot) -> String {
    if request.params.is_empty() {
        return format!("{} {}", request.method, request.url);
    }
    let query: Vec<String> = request
        .params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    format!("{} {}?{}", request.method, request.url, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::FailureType;

    const BASE: &str = "https://api.example.edu/v1";

    fn failure(failure_type: FailureType, params: &[(&str, &str)], message: &str) -> Failure {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Failure::new(
            failure_type,
            "paginate pets",
            "/pets",
            RequestSnapshot::get(format!("{BASE}/pets"), &params),
            message,
        )
    }

    #[test]
    fn generates_http_file_header() {
        let output = to_http_file(&[], BASE, "base_url");
        assert!(output.contains("# Auto-generated reproduction cases (0 failures)"));
        assert!(output.contains("@base_url = https://api.example.edu/v1"));
    }

    #[test]
    fn rewrites_base_url_and_keeps_query() {
        let failures = [failure(
            FailureType::ScenarioAssertion,
            &[("page[size]", "1")],
            "expected 1, got 25",
        )];
        let output = to_http_file(&failures, BASE, "base_url");
        assert!(output.contains("GET {{base_url}}/pets?page[size]=1"));
        assert!(output.contains("expected 1, got 25"));
    }

    #[test]
    fn groups_failures_by_request() {
        let failures = [
            failure(FailureType::SchemaViolation, &[], "unexpected field 'x'"),
            failure(FailureType::LinkMismatch, &[], "path does not match"),
            failure(FailureType::SchemaViolation, &[("page[size]", "1")], "other"),
        ];
        let output = to_http_file(&failures, BASE, "base_url");
        assert_eq!(output.matches("GET ").count(), 2);
        assert!(output.contains("### [0] paginate pets"));
        assert!(output.contains("### [1] paginate pets"));
    }

    #[test]
    fn foreign_urls_are_kept_verbatim() {
        let mut f = failure(FailureType::UnexpectedStatus, &[], "expected status 200, got 500");
        f.request.url = "http://localhost:8080/api/pets".to_string();
        let output = to_http_file(&[f], BASE, "base_url");
        assert!(output.contains("GET http://localhost:8080/api/pets"));
    }
}
