//! Severity levels for contract failures
//!
//! Severity decides the exit code: a warning only fails a run under --strict.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Failure severity - maps directly to exit codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unresolvable schema reference, slow response (exit 0, or 1 if --strict)
    Warning,
    /// Contract broken: status, body shape, link (exit 1)
    Error,
    /// Case could not run: transport failure (exit 2)
    Critical,
}

impl Severity {
    /// Convert severity to exit code
    ///
    /// - strict=true: Warning becomes exit 1
    /// - strict=false: Warning is exit 0
    #[must_use]
    pub const fn exit_code(self, strict: bool) -> i32 {
        match self {
            Self::Warning => {
                if strict {
                    1
                } else {
                    0
                }
            }
            Self::Error => 1,
            Self::Critical => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_warning_depends_on_strict() {
        assert_eq!(Severity::Warning.exit_code(false), 0);
        assert_eq!(Severity::Warning.exit_code(true), 1);
    }

    #[test]
    fn exit_code_error_and_critical_ignore_strict() {
        for strict in [true, false] {
            assert_eq!(Severity::Error.exit_code(strict), 1);
            assert_eq!(Severity::Critical.exit_code(strict), 2);
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn severity_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");

        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }
}
