//! Merge a prompt template with the (untrusted) message body under three ceilings.

use super::truncate::truncate_chars;
use crate::config::LimitsConfig;

/// Token replaced by the user text inside a template.
pub const USER_TEXT_PLACEHOLDER: &str = "{{USER_TEXT}}";

/// Result of [`build_prompt`]. `merged` is what gets sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub template: String,
    pub user_text: String,
    pub merged: String,
    pub user_text_truncated: bool,
}

/// Trim and cap the user text, cap the template, substitute (or append when the template has
/// no placeholder), then cap the merged prompt at `max_model_input_chars`.
pub fn build_prompt(user_text: &str, template: &str, limits: &LimitsConfig) -> PromptContext {
    let trimmed = user_text.trim();
    let user = truncate_chars(trimmed, limits.max_user_chars);
    let user_text_truncated = user.len() < trimmed.len();
    let template = truncate_chars(template, limits.max_template_chars);

    let merged = if template.contains(USER_TEXT_PLACEHOLDER) {
        template.replace(USER_TEXT_PLACEHOLDER, user)
    } else if template.trim().is_empty() {
        user.to_string()
    } else if user.is_empty() {
        template.trim_end().to_string()
    } else {
        format!("{}\n\n{}", template.trim_end(), user)
    };
    let merged = truncate_chars(&merged, limits.max_model_input_chars).to_string();

    if user_text_truncated {
        log::debug!(
            "user text truncated from {} to {} chars",
            trimmed.chars().count(),
            limits.max_user_chars
        );
    }

    PromptContext {
        template: template.to_string(),
        user_text: user.to_string(),
        merged,
        user_text_truncated,
    }
}
