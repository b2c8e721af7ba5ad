pub mod llm;
pub mod markers;
pub mod prompt;
pub mod schema;

pub use llm::{GuardedGenerator, DEFAULT_MAX_TOKENS};
pub use markers::{extract_between, DecisionRationale};
pub use schema::WorkflowOutput;
