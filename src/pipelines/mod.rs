pub mod json_extract;
pub mod orchestrator;
pub mod perf;
pub mod prompts;
pub mod retry;
