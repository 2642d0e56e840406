//! Initialize the configuration directory: default config, prompt templates and the asset
//! directories.
//!
//! Layout mirrors `crates/lib/config/`: `config/templates/` → `~/.autoresponder/templates/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/config/templates");

/// Ensure the configuration directory has been initialized (config file and templates directory exist).
pub fn require_initialized(config_path: &Path, config: &config::Config) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `autoresponder init` first (config file not found: {})",
            config_path.display()
        );
    }
    let templates_dir = config::resolve_templates_dir(config, config_path);
    if !templates_dir.exists() {
        anyhow::bail!(
            "configuration not initialized; run `autoresponder init` first (templates directory not found: {})",
            templates_dir.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Writes `config.json` with `{}` if missing.
/// - Extracts the bundled prompt templates into `templates` if it does not exist.
/// - Creates empty `emotki` and `pdf` directories for the attachments.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config::config_dir(config_path);
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let templates_dir = config_dir.join("templates");
    if !templates_dir.exists() {
        std::fs::create_dir_all(&templates_dir)
            .with_context(|| format!("creating templates directory {}", templates_dir.display()))?;
        if let Err(e) = BUNDLED_TEMPLATES.extract(&templates_dir) {
            anyhow::bail!(
                "extracting bundled templates to {}: {}",
                templates_dir.display(),
                e
            );
        }
        log::info!("extracted bundled templates to {}", templates_dir.display());
    } else {
        log::debug!("templates directory already exists at {}, skipping", templates_dir.display());
    }

    for name in ["emotki", "pdf"] {
        let dir = config_dir.join(name);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {} directory {}", name, dir.display()))?;
            log::info!("created {} (add attachment files here)", dir.display());
        }
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_require() {
        let dir = std::env::temp_dir().join(format!("responder-init-{}", uuid::Uuid::new_v4()));
        let config_path = dir.join("config.json");
        let cfg = config::Config::default();
        assert!(require_initialized(&config_path, &cfg).is_err());

        init_config_dir(&config_path).unwrap();
        require_initialized(&config_path, &cfg).unwrap();
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");
        assert!(dir.join("templates").join("prompt.txt").exists());
        assert!(dir.join("templates").join("prompt_biznesowy.txt").exists());
        assert!(dir.join("emotki").is_dir());
        assert!(dir.join("pdf").is_dir());

        std::fs::write(&config_path, br#"{"gateway":{"port":1}}"#).unwrap();
        init_config_dir(&config_path).unwrap();
        assert!(std::fs::read_to_string(&config_path).unwrap().contains("port"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
