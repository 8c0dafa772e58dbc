//! Schema-validated agents.
//!
//! An agent is a persona ([`AgentSpec`]) plus an output schema. Running it
//! never raises: the outcome is always an [`AgentResult`].

mod registry;
mod result;
mod runner;
mod spec;

pub use registry::AgentRegistry;
pub use result::{AgentError, AgentErrorKind, AgentResult};
pub use runner::{run_agent, AgentSettings};
pub use spec::AgentSpec;
