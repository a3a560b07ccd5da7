//! Self-link checks
//!
//! A resource's `links.self` must point back at the requested endpoint on the
//! expected base URL and must echo every requested query parameter.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::violation::{Violation, ViolationKind};

/// Hostname Docker gives the host machine; links name it `localhost`.
const CONTAINER_HOST_ALIAS: &str = "host.docker.internal";

/// Local deployments publish links without the `:<port>/api` gateway prefix.
fn local_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r":\d{4}/api").expect("static regex"))
}

/// Apply local-deployment rewriting to a base or link URL.
#[must_use]
pub fn normalize_local_url(url: &str) -> String {
    local_prefix()
        .replace(url, "")
        .replace(CONTAINER_HOST_ALIAS, "localhost")
}

/// Check a self link against the expected base URL, endpoint and query keys.
///
/// Every mismatch is reported, not just the first.
///
/// # Errors
///
/// Returns the scheme/host/path mismatches and missing query keys.
pub fn validate_self_link(
    link_url: &str,
    expected_base_url: &str,
    endpoint: &str,
    query_params: &[(String, String)],
    local_mode: bool,
) -> Result<(), Vec<Violation>> {
    let (base, link) = if local_mode {
        (
            normalize_local_url(expected_base_url),
            normalize_local_url(link_url),
        )
    } else {
        (
            expected_base_url.replace(CONTAINER_HOST_ALIAS, "localhost"),
            link_url.to_string(),
        )
    };

    let link = Url::parse(&link).map_err(|e| {
        vec![Violation::new(
            ViolationKind::LinkMismatch,
            "links.self",
            format!("'{link_url}' is not a valid URL: {e}"),
        )]
    })?;
    let base = Url::parse(&base).map_err(|e| {
        vec![Violation::new(
            ViolationKind::LinkMismatch,
            "base_url",
            format!("'{base}' is not a valid URL: {e}"),
        )]
    })?;

    let expected_path = format!("{}{endpoint}", base.path().trim_end_matches('/'));
    let comparisons = [
        ("scheme", link.scheme().to_string(), base.scheme().to_string()),
        ("netloc", netloc(&link), netloc(&base)),
        ("path", link.path().to_string(), expected_path),
    ];

    let mut violations: Vec<Violation> = comparisons
        .into_iter()
        .filter(|(_, actual, expected)| actual != expected)
        .map(|(part, actual, expected)| {
            Violation::new(
                ViolationKind::LinkMismatch,
                "links.self",
                format!("{part} does not match\nExpected: {expected}\nLink: {actual}"),
            )
        })
        .collect();

    let echoed: HashSet<String> = link.query_pairs().map(|(k, _)| k.into_owned()).collect();
    for (key, _) in query_params {
        if !echoed.contains(key) {
            violations.push(Violation::new(
                ViolationKind::MissingQueryParam,
                "links.self",
                format!("query parameter '{key}' missing from self link"),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// `host[:port]`, port only when explicit and non-default.
fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn kinds(r: Result<(), Vec<Violation>>) -> Vec<ViolationKind> {
        r.err()
            .unwrap_or_default()
            .into_iter()
            .map(|v| v.kind)
            .collect()
    }

    #[test]
    fn matching_remote_link() {
        let r = validate_self_link(
            "https://api.example.edu/v1/pets/3",
            "https://api.example.edu/v1",
            "/pets/3",
            &[],
            false,
        );
        assert!(r.is_ok());
    }

    #[test]
    fn local_mode_normalizes_both_sides() {
        let r = validate_self_link(
            "http://host.docker.internal:8080/api/pets?page%5Bnumber%5D=1",
            "http://localhost:8080/api",
            "/pets",
            &params(&[("page[number]", "1")]),
            true,
        );
        assert!(r.is_ok(), "{r:?}");

        let r = validate_self_link(
            "http://localhost/v1/pets",
            "http://host.docker.internal:8080/api/v1",
            "/pets",
            &[],
            true,
        );
        assert!(r.is_ok(), "{r:?}");
    }

    #[test]
    fn normalize_local_url_strips_gateway_prefix() {
        assert_eq!(
            normalize_local_url("http://host.docker.internal:8080/api/v1"),
            "http://localhost/v1"
        );
        assert_eq!(
            normalize_local_url("https://api.example.edu/v1"),
            "https://api.example.edu/v1"
        );
    }

    #[test]
    fn remote_mode_does_not_strip_port() {
        let r = validate_self_link(
            "http://localhost/pets",
            "http://localhost:8080/api",
            "/pets",
            &[],
            false,
        );
        assert_eq!(
            kinds(r),
            vec![ViolationKind::LinkMismatch, ViolationKind::LinkMismatch]
        );
    }

    #[test]
    fn each_mismatch_is_reported() {
        let r = validate_self_link(
            "http://other.example.edu/v2/pets",
            "https://api.example.edu/v1",
            "/pets",
            &[],
            false,
        );
        let violations = r.unwrap_err();
        assert_eq!(violations.len(), 3);
        assert!(violations[0].message.starts_with("scheme does not match"));
        assert!(violations[1].message.starts_with("netloc does not match"));
        insta::assert_snapshot!(violations[2].message, @r"
        path does not match
        Expected: /v1/pets
        Link: /v2/pets
        ");
    }

    #[test]
    fn extra_echoed_params_are_fine() {
        let r = validate_self_link(
            "https://api.example.edu/v1/pets?filter%5Bspecies%5D=dog&page%5Bsize%5D=25&page%5Bnumber%5D=1",
            "https://api.example.edu/v1",
            "/pets",
            &params(&[("filter[species]", "dog")]),
            false,
        );
        assert!(r.is_ok());
    }

    #[test]
    fn dropped_param_is_reported() {
        let r = validate_self_link(
            "https://api.example.edu/v1/pets?page%5Bnumber%5D=1",
            "https://api.example.edu/v1",
            "/pets",
            &params(&[("page[number]", "1"), ("page[size]", "1")]),
            false,
        );
        let violations = r.unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::MissingQueryParam);
        assert!(violations[0].message.contains("page[size]"));
    }

    #[test]
    fn invalid_link_is_link_mismatch() {
        let r = validate_self_link("/pets", "https://api.example.edu", "/pets", &[], false);
        assert_eq!(kinds(r), vec![ViolationKind::LinkMismatch]);
    }

    #[test]
    fn root_base_path_counts_as_empty() {
        let r = validate_self_link(
            "https://api.example.edu/pets",
            "https://api.example.edu",
            "/pets",
            &[],
            false,
        );
        assert!(r.is_ok());
    }
}
