pub mod payload;
pub mod runner;

pub use payload::artifact_payload;
pub use runner::{WorkflowRunner, DEFAULT_POLL_INTERVAL};
