//! Chat-completion providers and the priority-ordered model invoker.
//!
//! [`ChatClient`] talks to one OpenAI-compatible endpoint (Groq by default). [`ModelInvoker`]
//! walks a list of model ids, treating transport errors, rejections and rate limits as
//! distinct outcomes, and reports which model answered.

mod client;
mod envelope;
mod invoker;
mod rate_limit;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChatBackend, ChatClient, ChatError, ChatMessage, ChatReply, ChatRequest};
pub use envelope::{extract_text, Extractor, EXTRACTORS};
pub use invoker::{ModelCallResult, ModelInvoker, Unanswered};
pub use rate_limit::{parse_retry_after_body, parse_retry_after_header, parse_retry_after_header_at};
