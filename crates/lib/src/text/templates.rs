//! Prompt templates: one plain-text file per reply kind, each with a `{{USER_TEXT}}` placeholder.

use std::fs;
use std::path::Path;

use crate::config::TemplatesConfig;

static DEFAULT_REPLY_TEMPLATE: &str = include_str!("../../config/templates/prompt.txt");
static DEFAULT_BUSINESS_TEMPLATE: &str =
    include_str!("../../config/templates/prompt_biznesowy.txt");

/// Templates loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    /// Personal (empathetic) reply.
    pub reply: String,
    /// Business (notarial) answer.
    pub business: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            reply: DEFAULT_REPLY_TEMPLATE.to_string(),
            business: DEFAULT_BUSINESS_TEMPLATE.to_string(),
        }
    }
}

impl Templates {
    /// Load templates from `dir`; a missing or blank file falls back to the bundled default.
    pub fn load(dir: &Path, config: &TemplatesConfig) -> Self {
        let defaults = Self::default();
        Self {
            reply: read_template(&dir.join(&config.reply_file)).unwrap_or(defaults.reply),
            business: read_template(&dir.join(&config.business_file))
                .unwrap_or(defaults.business),
        }
    }
}

fn read_template(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) if !s.trim().is_empty() => Some(s),
        Ok(_) => {
            log::warn!("template {} is empty, using bundled default", path.display());
            None
        }
        Err(e) => {
            log::warn!("template {} unavailable ({}), using bundled default", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::USER_TEXT_PLACEHOLDER;

    #[test]
    fn bundled_defaults_have_placeholder() {
        let t = Templates::default();
        assert!(t.reply.contains(USER_TEXT_PLACEHOLDER));
        assert!(t.business.contains(USER_TEXT_PLACEHOLDER));
    }

    #[test]
    fn load_prefers_files_and_falls_back_per_file() {
        let dir = std::env::temp_dir().join(format!("responder-templates-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("prompt.txt"), "Własny: {{USER_TEXT}}").unwrap();
        fs::write(dir.join("prompt_biznesowy.txt"), "   \n").unwrap();

        let t = Templates::load(&dir, &TemplatesConfig::default());
        assert_eq!(t.reply, "Własny: {{USER_TEXT}}");
        assert_eq!(t.business, Templates::default().business);

        let _ = fs::remove_dir_all(&dir);
    }
}
