// Feedback: prompt building, the single completion call per submission,
// tolerant parsing, and portfolio summaries.
// All completion calls go through llm_client; nothing here talks to the API directly.

pub mod generator;
pub mod handlers;
pub mod portfolio;
pub mod prompts;
