// Interview preparation workflow.
// Profile extraction, batched question generation, answer evaluation and CSV export.
// Every model call goes through llm_client::ModelInvoker and the tolerant parser.

pub mod evaluation;
pub mod export;
pub mod handlers;
pub mod profile;
pub mod prompts;
pub mod questions;
