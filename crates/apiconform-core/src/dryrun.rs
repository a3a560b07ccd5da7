//! Dry run plan types and config validation
//!
//! Describes what a run *would* request without sending anything.
//! Used for pre-flight validation and CI previews.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Config;
use crate::config::Scenario;
use crate::openapi::Specification;

// ── Plan types ──

/// Complete dry run plan: planned requests and config warnings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DryRunPlan {
    /// Base URL requests would go to
    pub base_url: String,
    /// Per-scenario plan, in run order
    pub scenarios: Vec<ScenarioPlan>,
    /// Config/spec validation results
    pub validations: Vec<Validation>,
}

/// Request and checks planned for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioPlan {
    pub name: String,
    /// Full request URL including the query string
    pub url: String,
    pub resource: String,
    pub expected_status: u16,
    /// Checks beyond status, JSON and latency
    pub checks: Vec<String>,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

impl Validation {
    fn new(check: &str, status: ValidationStatus, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            status,
            message: message.into(),
        }
    }
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ── Config validation ──

/// Patterns that suggest a placeholder value rather than a real credential.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "YOUR_",
    "TODO",
    "CHANGEME",
    "changeme",
    "placeholder",
    "xxx",
    "XXX",
    "replace-me",
    "REPLACE_ME",
    "<",
];

fn placeholder_in(value: &str) -> Option<&'static str> {
    PLACEHOLDER_PATTERNS
        .iter()
        .copied()
        .find(|pattern| value.contains(pattern))
}

/// Validate config (and the OpenAPI document, when it loaded).
#[must_use]
pub fn validate_config(config: &Config, spec: Option<&Specification>) -> Vec<Validation> {
    let mut checks = Vec::new();

    // OpenAPI document
    match spec {
        Some(spec) => checks.push(Validation::new(
            "openapi",
            ValidationStatus::Ok,
            format!(
                "openapi: {} (version {})",
                config.openapi.display(),
                spec.version().unwrap_or("unknown")
            ),
        )),
        None if config.openapi.exists() => checks.push(Validation::new(
            "openapi",
            ValidationStatus::Error,
            format!("openapi: {} (unreadable)", config.openapi.display()),
        )),
        None => checks.push(Validation::new(
            "openapi",
            ValidationStatus::Error,
            format!("openapi: {} (not found)", config.openapi.display()),
        )),
    }

    // Base URL
    let base_url = config.target_base_url();
    match url::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => checks.push(Validation::new(
            "base_url",
            ValidationStatus::Ok,
            format!("base_url: {base_url}"),
        )),
        _ => checks.push(Validation::new(
            "base_url",
            ValidationStatus::Error,
            format!("base_url: {base_url} (not an http:// or https:// URL)"),
        )),
    }

    // Credentials for the selected mode
    checks.push(validate_credentials(config));

    // Scenarios
    if config.scenarios.is_empty() {
        checks.push(Validation::new(
            "scenarios",
            ValidationStatus::Warning,
            "scenarios: none defined",
        ));
    }
    if let Some(spec) = spec {
        for scenario in &config.scenarios {
            if spec.resource_schema(&scenario.resource).is_none() {
                checks.push(Validation::new(
                    "scenarios",
                    ValidationStatus::Error,
                    format!(
                        "{}: resource '{}' not defined in {}",
                        scenario.name,
                        scenario.resource,
                        config.openapi.display()
                    ),
                ));
            }
        }
    }

    checks
}

fn validate_credentials(config: &Config) -> Validation {
    let (mode, secrets) = if config.local_test {
        (
            "basic_auth",
            config
                .auth
                .basic_auth
                .as_ref()
                .map(|b| vec![("username", &b.username), ("password", &b.password)]),
        )
    } else {
        (
            "oauth2",
            config.auth.oauth2.as_ref().map(|o| {
                vec![
                    ("client_id", &o.client_id),
                    ("client_secret", &o.client_secret),
                ]
            }),
        )
    };

    let Some(secrets) = secrets else {
        return Validation::new(
            "auth",
            ValidationStatus::Warning,
            format!("auth: no {mode} credentials, requests are sent unauthenticated"),
        );
    };

    let issues: Vec<String> = secrets
        .iter()
        .filter_map(|(key, value)| {
            placeholder_in(value).map(|p| format!("{key} contains '{p}', may be placeholder"))
        })
        .collect();

    if issues.is_empty() {
        Validation::new("auth", ValidationStatus::Ok, format!("auth: {mode} configured"))
    } else {
        Validation::new(
            "auth",
            ValidationStatus::Warning,
            format!("auth: {mode}: {}", issues.join("; ")),
        )
    }
}

// ── Plan construction ──

impl DryRunPlan {
    /// Plan every scenario selected by `filter`.
    #[must_use]
    pub fn build(config: &Config, spec: Option<&Specification>, filter: Option<&str>) -> Self {
        let base_url = config.target_base_url().to_string();
        let scenarios = config
            .scenarios
            .iter()
            .filter(|s| s.matches_filter(filter))
            .map(|s| plan_scenario(&base_url, s))
            .collect();

        Self {
            base_url,
            scenarios,
            validations: validate_config(config, spec),
        }
    }
}

fn plan_scenario(base_url: &str, scenario: &Scenario) -> ScenarioPlan {
    let params = scenario.query_params();
    let mut url = format!("{base_url}{}", scenario.endpoint);
    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        url = format!("{url}?{}", query.join("&"));
    }

    let mut checks = vec![format!("schema {}", scenario.resource)];
    if (200..300).contains(&scenario.expected_status) {
        checks.push("self link".to_string());
    }
    if let Some(p) = scenario.pagination {
        checks.push(format!(
            "pagination (defaults {}/{})",
            p.default_number, p.default_size
        ));
    }
    for (attribute, expected) in &scenario.attribute_equals {
        checks.push(format!("{attribute} == {expected}"));
    }

    ScenarioPlan {
        name: scenario.name.clone(),
        url,
        resource: scenario.resource.clone(),
        expected_status: scenario.expected_status,
        checks,
    }
}

// ── Display helpers ──

impl DryRunPlan {
    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Dry run: {} scenarios against {}\n",
            self.scenarios.len(),
            self.base_url,
        ));

        for s in &self.scenarios {
            lines.push(format!("{} (expect {}):", s.name, s.expected_status));
            lines.push(format!("  GET {}", s.url));
            lines.push(format!("  Checks: {}", s.checks.join(", ")));
            lines.push(String::new());
        }

        lines.push("Config validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    /// Returns true if any validation has Error status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }

    /// Returns true if any validation has Warning status.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, BasicAuth, OAuth2};
    use serde_json::json;

    fn spec() -> Specification {
        Specification::new(json!({
            "swagger": "2.0",
            "definitions": {"PetResource": {"properties": {}}}
        }))
    }

    fn config() -> Config {
        toml::from_str(
            r#"
openapi = "nonexistent.yaml"
base_url = "https://api.example.edu/v1"

[auth.oauth2]
token_api_url = "https://api.example.edu/oauth2/token"
client_id = "a1b2c3"
client_secret = "s3cr3t"

[[scenarios]]
name = "get all pets"
endpoint = "/pets"
resource = "PetResource"
params = { "page[number]" = 2, "page[size]" = 5 }
pagination = {}
"#,
        )
        .unwrap()
    }

    fn find<'a>(checks: &'a [Validation], name: &str) -> &'a Validation {
        checks.iter().find(|c| c.check == name).unwrap()
    }

    #[test]
    fn validate_openapi_not_found() {
        let checks = validate_config(&config(), None);
        let check = find(&checks, "openapi");
        assert_eq!(check.status, ValidationStatus::Error);
        assert!(check.message.contains("not found"));
    }

    #[test]
    fn validate_openapi_loaded() {
        let checks = validate_config(&config(), Some(&spec()));
        let check = find(&checks, "openapi");
        assert_eq!(check.status, ValidationStatus::Ok);
        assert!(check.message.contains("version 2.0"));
    }

    #[test]
    fn validate_bad_base_url() {
        let cfg = Config {
            base_url: "localhost:8080".into(),
            ..config()
        };
        let checks = validate_config(&cfg, None);
        assert_eq!(find(&checks, "base_url").status, ValidationStatus::Error);
    }

    #[test]
    fn validate_real_credentials_no_warning() {
        let checks = validate_config(&config(), Some(&spec()));
        assert_eq!(find(&checks, "auth").status, ValidationStatus::Ok);
        assert!(!DryRunPlan::build(&config(), Some(&spec()), None).has_warnings());
    }

    #[test]
    fn validate_placeholder_credentials() {
        let cfg = Config {
            auth: AuthConfig {
                oauth2: Some(OAuth2 {
                    token_api_url: "https://api.example.edu/oauth2/token".into(),
                    client_id: "your-client-id".into(),
                    client_secret: "<secret>".into(),
                }),
                basic_auth: None,
            },
            ..config()
        };
        let checks = validate_config(&cfg, None);
        let auth = find(&checks, "auth");
        assert_eq!(auth.status, ValidationStatus::Warning);
        assert!(auth.message.contains("client_id contains 'your-'"));
        assert!(auth.message.contains("client_secret contains '<'"));
    }

    #[test]
    fn validate_local_mode_uses_basic_auth() {
        let mut cfg = config();
        cfg.local_test = true;
        let checks = validate_config(&cfg, None);
        assert_eq!(find(&checks, "auth").status, ValidationStatus::Warning);

        cfg.auth.basic_auth = Some(BasicAuth {
            username: "tester".into(),
            password: "hunter2".into(),
        });
        let checks = validate_config(&cfg, None);
        assert_eq!(find(&checks, "auth").status, ValidationStatus::Ok);
    }

    #[test]
    fn validate_unknown_resource() {
        let mut cfg = config();
        cfg.scenarios[0].resource = "OwnerResource".into();
        let plan = DryRunPlan::build(&cfg, Some(&spec()), None);
        assert!(plan.has_errors());
        let check = find(&plan.validations, "scenarios");
        assert!(check.message.contains("'OwnerResource'"));
    }

    #[test]
    fn plan_terminal_output() {
        let plan = DryRunPlan::build(&config(), Some(&spec()), None);
        let text = plan.to_terminal();
        assert!(text.contains("Dry run: 1 scenarios against https://api.example.edu/v1"));
        assert!(text.contains("GET https://api.example.edu/v1/pets?page[number]=2&page[size]=5"));
        assert!(text.contains("Checks: schema PetResource, self link, pagination (defaults 1/25)"));
        assert!(text.contains("[OK] auth: oauth2 configured"));
    }

    #[test]
    fn plan_respects_filter() {
        let plan = DryRunPlan::build(&config(), None, Some("owners"));
        assert!(plan.scenarios.is_empty());
    }
}
