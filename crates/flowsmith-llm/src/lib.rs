mod client;
pub mod error;
pub mod generator;
mod types;

pub use client::{ChatBackend, DEFAULT_BASE_URL, DEFAULT_MODEL, LlmClient, LlmConfig};
pub use error::{ChatError, ErrorKind, GenerateError, MalformedOutput};
pub use generator::{
    GeneratedResult, WorkflowSource, generate_fallback, generate_workflow,
    generate_workflow_with_backend, system_prompt, user_prompt,
};
pub use types::*;
