//! AI features: text enhancement, summary generation, ATS scoring.
//!
//! All LLM traffic goes through `llm_client`; every LLM-backed request is
//! rate limited and charged against the caller's plan quota first.

pub mod ats;
pub mod handlers;
pub mod impact;
pub mod keywords;
pub mod prompts;
