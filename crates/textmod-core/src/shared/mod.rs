pub mod message;
pub mod scopes;
pub mod types;

pub use message::{AppliedChange, ModificationResult, RequestOutcome};
pub use scopes::{get_scope_definition, ModificationScope, ScopeDefinition, SCOPES};
pub use types::*;
