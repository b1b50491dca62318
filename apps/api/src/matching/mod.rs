// Two-stage matching: vector similarity narrows the postings, LLM judgments rank them.
// All LLM calls go through llm_client; all vectors come from the embedding module.

pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod ranker;
pub mod scorer;
pub mod similarity;

pub use orchestrator::{MatchError, MatchInput, MatchPipeline, MatchReport};
