pub mod config;
pub mod engine;
pub mod error;
pub mod prompts;
pub mod services;
pub mod shared;

pub use config::EngineConfig;
pub use engine::TextModEngine;
pub use error::{Result, TextModError};
pub use services::ai::Oracle;
pub use services::anthropic::AnthropicClient;
pub use services::session::{InMemorySessionStore, SessionStore};
pub use services::workspace::ProjectRoot;
pub use shared::{
    AppliedChange, FileMap, ModificationRequest, ModificationResult, ModificationScope,
    RequestOutcome, ScopeDecision, TextReplaceTerms,
};
