// Resume tooling: text parsing, HTML templates, and Gemini-backed ATS scoring.
// All LLM calls go through llm_client.

pub mod analysis;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod templates;
