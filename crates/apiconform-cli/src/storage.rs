//! Run history under `~/.apiconform/runs/`
//!
//! Every `apiconform run` is saved regardless of `--output` mode, one
//! directory per run: `{host_port}_{timestamp}/`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use apiconform_core::{Config, RunReport, to_http_file};

const REDACTED: &str = "********";

/// Where runs are written.
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// `~/.apiconform/runs`
    pub fn in_home() -> Result<Self, std::io::Error> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self::at(PathBuf::from(home).join(".apiconform").join("runs")))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `config.toml` (secrets redacted), `report.json` and, when
    /// anything failed, `reproductions.http`. Returns the run directory.
    pub fn save(&self, config: &Config, report: &RunReport) -> Result<PathBuf, std::io::Error> {
        let dir = self.root.join(run_dir_name(&report.base_url));
        std::fs::create_dir_all(&dir)?;

        let config_toml = toml::to_string_pretty(&redacted(config))
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(dir.join("config.toml"), config_toml)?;

        let json =
            serde_json::to_string_pretty(report).map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(dir.join("report.json"), json)?;

        write_reproductions(&dir, report)?;
        Ok(dir)
    }
}

/// Write `reproductions.http` into `dir` when the run has failures.
///
/// Returns the file path, or `None` when there was nothing to reproduce.
pub fn write_reproductions(dir: &Path, report: &RunReport) -> Result<Option<PathBuf>, std::io::Error> {
    let failures: Vec<_> = report.failures().cloned().collect();
    if failures.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join("reproductions.http");
    std::fs::write(&path, to_http_file(&failures, &report.base_url, "base_url"))?;
    Ok(Some(path))
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(basic) = config.auth.basic_auth.as_mut() {
        basic.password = REDACTED.to_string();
    }
    if let Some(oauth2) = config.auth.oauth2.as_mut() {
        oauth2.client_secret = REDACTED.to_string();
    }
    config
}

/// `{host_port}_{timestamp}` e.g. `localhost_8080_20261017T093000`
fn run_dir_name(base_url: &str) -> String {
    format!("{}_{}", host_port(base_url), timestamp_compact())
}

/// `"http://localhost:8080/api/v1"` → `"localhost_8080"`
fn host_port(base_url: &str) -> String {
    match url::Url::parse(base_url) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}_{port}"),
            (Some(host), None) => host.to_string(),
            _ => "unknown".to_string(),
        },
        Err(_) => "unknown".to_string(),
    }
}

fn timestamp_compact() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (y, mo, d) = civil_from_days((secs / 86_400) as i64);
    let tod = secs % 86_400;
    format!(
        "{y:04}{mo:02}{d:02}T{:02}{:02}{:02}",
        tod / 3600,
        (tod % 3600) / 60,
        tod % 60
    )
}

/// Days since the Unix epoch to a proleptic Gregorian date.
///
/// <https://howardhinnant.github.io/date_algorithms.html#civil_from_days>
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = i64::from(yoe) + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiconform_core::config::{BasicAuth, OAuth2};
    use apiconform_core::{
        CaseReport, Failure, FailureType, RequestSnapshot, VerdictPolicy,
    };

    fn failing_report() -> RunReport {
        let request = RequestSnapshot::get("http://localhost:8080/api/v1/pets", &[]);
        let failure = Failure::new(
            FailureType::UnexpectedStatus,
            "get all pets",
            "/pets",
            request,
            "expected status 200, got 500",
        );
        RunReport::new(
            "http://localhost:8080/api/v1",
            true,
            vec![CaseReport::new("get all pets", "/pets", None, vec![failure])],
            &VerdictPolicy::default(),
        )
    }

    #[test]
    fn host_port_from_base_url() {
        assert_eq!(host_port("http://localhost:8080/api/v1"), "localhost_8080");
        assert_eq!(host_port("https://api.example.edu/v1"), "api.example.edu");
        assert_eq!(host_port("not a url"), "unknown");
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(20_489), (2026, 2, 5));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn secrets_are_redacted() {
        let mut config = Config::default();
        config.auth.basic_auth = Some(BasicAuth {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        });
        config.auth.oauth2 = Some(OAuth2 {
            token_api_url: "https://api.example.edu/oauth2/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "s3cret".to_string(),
        });

        let text = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("s3cret"));
        assert!(text.contains("username = \"user\""));
    }

    #[test]
    fn save_writes_run_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::at(tmp.path());

        let dir = store.save(&Config::default(), &failing_report()).unwrap();

        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("localhost_8080_"));
        assert!(dir.join("config.toml").exists());
        let report: RunReport =
            serde_json::from_str(&std::fs::read_to_string(dir.join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report.cases.len(), 1);
        let http = std::fs::read_to_string(dir.join("reproductions.http")).unwrap();
        assert!(http.contains("{{base_url}}/pets"));
    }

    #[test]
    fn nothing_to_reproduce() {
        let tmp = tempfile::tempdir().unwrap();
        let report = RunReport::new(
            "https://api.example.edu/v1",
            false,
            vec![CaseReport::new("get all pets", "/pets", None, vec![])],
            &VerdictPolicy::default(),
        );
        assert_eq!(write_reproductions(tmp.path(), &report).unwrap(), None);
    }
}
