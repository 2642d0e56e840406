//! Text shaping around model calls: prompt assembly, output cleanup and length limits.
//!
//! Everything here is pure (templates aside, which read files once at startup).

mod prompt;
mod sanitize;
mod templates;
mod truncate;

pub use prompt::{build_prompt, PromptContext, USER_TEXT_PLACEHOLDER};
pub use sanitize::{answer_from_object, sanitize, ANSWER_KEYS};
pub use templates::Templates;
pub use truncate::{truncate, truncate_chars, TRUNCATION_MARKER};
