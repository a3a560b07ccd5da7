//! Contract violations found in a response body or self link

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What kind of contract rule was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Field not declared in the schema's property mapping
    UnexpectedField,
    /// Value is not an instance of the declared type
    TypeMismatch,
    /// String does not satisfy `format` (url, uri, email)
    FormatMismatch,
    /// String does not match `pattern`
    PatternMismatch,
    /// Response or schema lacks a key needed to continue
    MissingKey,
    /// Resource `type` differs from the schema's type enumeration
    ResourceTypeMismatch,
    /// Self link scheme, host or path differs from the expected URL
    LinkMismatch,
    /// Requested query parameter missing from the self link
    MissingQueryParam,
}

impl ViolationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnexpectedField => "unexpected field",
            Self::TypeMismatch => "type mismatch",
            Self::FormatMismatch => "format mismatch",
            Self::PatternMismatch => "pattern mismatch",
            Self::MissingKey => "missing key",
            Self::ResourceTypeMismatch => "resource type mismatch",
            Self::LinkMismatch => "link mismatch",
            Self::MissingQueryParam => "missing query parameter",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken rule, located by a dotted path such as `data[0].attributes.owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub kind: ViolationKind,
    pub path: String,
    pub message: String,
}

impl Violation {
    #[must_use]
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
        }
    }
}
