//! Verdict policy - determines how failures are filtered and judged

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Failure, FailureType, Severity};

/// Policy for filtering and judging failures
#[derive(Debug, Clone, Default)]
pub struct VerdictPolicy {
    /// Strict mode: warnings become errors
    pub strict: bool,
    /// Failure types to ignore
    pub ignore_failure_types: Vec<FailureType>,
}

impl VerdictPolicy {
    /// Policy under which warnings fail the run
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn ignoring(mut self, types: &[FailureType]) -> Self {
        self.ignore_failure_types.extend_from_slice(types);
        self
    }

    /// Filter failures according to policy
    #[must_use]
    pub fn filter(&self, failures: Vec<Failure>) -> Vec<Failure> {
        failures
            .into_iter()
            .filter(|f| !self.ignore_failure_types.contains(&f.failure_type))
            .collect()
    }

    /// Highest exit code among all failures, 0 when there are none.
    #[must_use]
    pub fn exit_code(&self, failures: &[Failure]) -> i32 {
        failures
            .iter()
            .map(|f| f.severity.exit_code(self.strict))
            .max()
            .unwrap_or(0)
    }

    /// Determine verdict from the number of cases run and their failures.
    ///
    /// PASS requires at least one case and an exit code of 0.
    #[must_use]
    pub fn verdict(&self, failures: &[Failure], cases: usize) -> Verdict {
        let exit_code = self.exit_code(failures);

        let status = if exit_code == 0 && cases > 0 {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        };

        let reason = if cases == 0 {
            "No scenarios were run".to_string()
        } else if failures.is_empty() {
            format!("All {cases} scenarios passed")
        } else {
            let count = |severity: Severity| failures.iter().filter(|f| f.severity == severity).count();
            let summary = format!(
                "{} failures ({} critical, {} error, {} warning)",
                failures.len(),
                count(Severity::Critical),
                count(Severity::Error),
                count(Severity::Warning)
            );
            if status == VerdictStatus::Pass {
                format!("All {cases} scenarios passed; {summary}")
            } else {
                summary
            }
        };

        Verdict {
            status,
            exit_code,
            reason,
        }
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
