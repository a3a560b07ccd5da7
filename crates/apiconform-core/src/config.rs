//! Project configuration for contract runs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::verdict::FailureType;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAPI document (local file, JSON or YAML)
    #[serde(default = "default_openapi")]
    pub openapi: PathBuf,

    /// Base URL of the deployed API
    pub base_url: String,

    /// Base URL used when `local_test` is set
    #[serde(default)]
    pub local_base_url: Option<String>,

    /// Test a local deployment: basic auth, self-signed TLS, link normalization
    #[serde(default)]
    pub local_test: bool,

    /// Every response must arrive strictly faster than this
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_seconds: f64,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Failure types left out of the verdict
    #[serde(default)]
    pub ignore: Vec<FailureType>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Credentials; which one is used depends on `local_test`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub oauth2: Option<OAuth2>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Client-credentials grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2 {
    pub token_api_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// One endpoint check.
///
/// ```toml
/// [[scenarios]]
/// name = "filter pets by species"
/// endpoint = "/pets"
/// resource = "PetResource"
/// params = { "filter[species]" = "dog" }
/// attribute_equals = { species = "dog" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// Path appended to the base URL, e.g. "/pets/1"
    pub endpoint: String,

    /// Definition name in the OpenAPI document, e.g. "PetResource"
    pub resource: String,

    #[serde(default = "default_status")]
    pub expected_status: u16,

    /// Query parameters; non-string values are sent in their JSON spelling
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,

    /// Attributes allowed to be null or empty
    #[serde(default)]
    pub nullable_fields: Vec<String>,

    /// Check `meta.currentPageNumber` / `meta.currentPageSize`
    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Every returned resource must carry these attribute values (case-insensitive)
    #[serde(default)]
    pub attribute_equals: BTreeMap<String, String>,

    /// Overrides the project-wide latency bound
    #[serde(default)]
    pub max_elapsed_seconds: Option<f64>,
}

/// Page the API falls back to when `page[number]` / `page[size]` are omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page_number")]
    pub default_number: u64,
    #[serde(default = "default_page_size")]
    pub default_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default_number: default_page_number(),
            default_size: default_page_size(),
        }
    }
}

fn default_openapi() -> PathBuf {
    PathBuf::from("openapi.yaml")
}

fn default_max_elapsed() -> f64 {
    5.0
}

fn default_status() -> u16 {
    200
}

fn default_page_number() -> u64 {
    1
}

fn default_page_size() -> u64 {
    25
}

impl Scenario {
    /// Query parameters as sent on the wire.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    #[must_use]
    pub fn nullable_set(&self) -> HashSet<String> {
        self.nullable_fields.iter().cloned().collect()
    }

    /// Whether `--filter` selects this scenario (substring of name or endpoint).
    #[must_use]
    pub fn matches_filter(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|f| self.name.contains(f) || self.endpoint.contains(f))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openapi: default_openapi(),
            base_url: "http://localhost:8080/api".to_string(),
            local_base_url: None,
            local_test: false,
            max_elapsed_seconds: default_max_elapsed(),
            auth: AuthConfig::default(),
            ignore: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.apiconform.toml)
    ///
    /// # Errors
    ///
    /// Returns error if no candidate exists or the one found cannot be parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".apiconform.toml", ".apiconform.json", "apiconform.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(ConfigError::NotFound(candidates.join(", ")))
    }

    /// Base URL requests go to: the local one when testing locally.
    #[must_use]
    pub fn target_base_url(&self) -> &str {
        match (&self.local_base_url, self.local_test) {
            (Some(local), true) => local,
            _ => &self.base_url,
        }
    }

    /// Latency bound for a scenario.
    #[must_use]
    pub fn max_elapsed(&self, scenario: &Scenario) -> Duration {
        let seconds = scenario
            .max_elapsed_seconds
            .unwrap_or(self.max_elapsed_seconds);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::from_secs(5))
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# apiconform configuration

# OpenAPI document (local file path, JSON or YAML)
openapi = "openapi.yaml"

# Deployed API
base_url = "https://api.example.edu/v1"

# Local deployment (used when local_test = true)
local_base_url = "http://host.docker.internal:8080/api/v1"
local_test = false

# Responses must arrive faster than this (seconds)
max_elapsed_seconds = 5.0

# Failure types to leave out of the verdict
# ignore = ["latency_exceeded"]

# Local runs authenticate with basic auth
[auth.basic_auth]
username = "your-username"
password = "your-password"

# Remote runs fetch a client-credentials token
[auth.oauth2]
token_api_url = "https://api.example.edu/oauth2/token"
client_id = "your-client-id"
client_secret = "your-client-secret"

[[scenarios]]
name = "get all pets"
endpoint = "/pets"
resource = "PetResource"
nullable_fields = ["owner"]

[[scenarios]]
name = "paginate pets"
endpoint = "/pets"
resource = "PetResource"
params = { "page[number]" = 1, "page[size]" = 1 }
pagination = { default_number = 1, default_size = 25 }

# [[scenarios]]
# name = "filter pets by species"
# endpoint = "/pets"
# resource = "PetResource"
# params = { "filter[species]" = "dog" }
# attribute_equals = { species = "dog" }

# [[scenarios]]
# name = "pet not found"
# endpoint = "/pets/999999"
# resource = "ErrorObject"
# expected_status = 404
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No config file found (looked for {0})")]
    NotFound(String),
}
