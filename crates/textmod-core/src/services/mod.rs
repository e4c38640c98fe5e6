pub mod aggregate;
pub mod ai;
pub mod anthropic;
pub mod classifier;
pub mod diff;
pub mod extract;
pub mod locator;
pub mod matching;
pub mod proposal;
pub mod session;
pub mod workspace;
