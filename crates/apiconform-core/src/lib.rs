//! apiconform-core: contract checks for JSON:API responses
//!
//! This crate holds the pure half of apiconform: OpenAPI document access,
//! type resolution, body and self-link validation, and the failure/verdict
//! types a run is judged by. Nothing here performs I/O beyond reading files.

pub mod config;
pub mod convert;
pub mod dryrun;
pub mod generator;
pub mod link;
pub mod openapi;
pub mod report;
pub mod types;
pub mod validate;
pub mod verdict;
pub mod violation;

pub use config::{Config, ConfigError, Scenario};
pub use convert::{Finding, classify_findings};
pub use dryrun::DryRunPlan;
pub use generator::to_http_file;
pub use link::validate_self_link;
pub use openapi::{SpecError, Specification};
pub use report::{CaseReport, CaseStatus, RunReport};
pub use types::{Resolution, SemanticType, UnresolvedReason, resolve_type};
pub use validate::{ResponseData, SchemaOutcome, SchemaValidator, SchemaWarning, validate};
pub use verdict::{
    Failure, FailureType, RequestSnapshot, ResponseSnapshot, Severity, Verdict, VerdictPolicy,
    VerdictStatus,
};
pub use violation::{Violation, ViolationKind};
