//! apiconform-runner: sends the requests apiconform-core judges
//!
//! [`HttpSession`] authenticates once; [`TestContext`] probes endpoints
//! through any [`Session`]; [`ScenarioRunner`] drives the configured scenarios.

pub mod context;
pub mod scenario;
pub mod session;

pub use context::{ProbeError, ProbeOutcome, TestContext};
pub use scenario::ScenarioRunner;
pub use session::{HttpResponse, HttpSession, Session, SessionError};
