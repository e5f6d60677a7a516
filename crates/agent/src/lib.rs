//! Assistant runtime for free-text questions.
//!
//! Messages that match no directive land here. The LLM is strictly a
//! conversational fallback: it answers questions about CRM usage, it never
//! mutates the CRM. All writes go through the deterministic directive path.

pub mod llm;
pub mod runtime;

pub use llm::LlmClient;
pub use runtime::AssistantRuntime;
