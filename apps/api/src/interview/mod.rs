// Interview session state machine, transcript adapter and report generation.
// All model and speech calls go through the llm_client traits.

pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod report;
pub mod session;
pub mod transcript;
