//! Static attachments keyed by validated labels: emoticon PNGs and PDFs.
//!
//! Lookup is `<dir>/<name>.<ext>`, then `<dir>/<fallback>.<ext>`, then nothing. A missing or
//! unreadable file only ever costs the attachment.

use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{Category, EmotionLabel};
use crate::config::{self, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Emoticon,
    TopicPdf,
    EmotionPdf,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Emoticon => "png",
            AssetKind::TopicPdf | AssetKind::EmotionPdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AssetKind::Emoticon => "image/png",
            AssetKind::TopicPdf | AssetKind::EmotionPdf => "application/pdf",
        }
    }
}

/// File contents ready to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AssetReference {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct AssetResolver {
    emoticon_dir: PathBuf,
    pdf_dir: PathBuf,
    fallback_name: String,
}

impl AssetResolver {
    pub fn new(emoticon_dir: PathBuf, pdf_dir: PathBuf, fallback_name: impl Into<String>) -> Self {
        Self {
            emoticon_dir,
            pdf_dir,
            fallback_name: fallback_name.into(),
        }
    }

    pub fn from_config(config: &Config, config_path: &Path) -> Self {
        Self::new(
            config::resolve_emoticon_dir(config, config_path),
            config::resolve_pdf_dir(config, config_path),
            config.assets.fallback_name.clone(),
        )
    }

    fn dir(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Emoticon => &self.emoticon_dir,
            AssetKind::TopicPdf | AssetKind::EmotionPdf => &self.pdf_dir,
        }
    }

    /// `name` of `kind`, else the fallback asset of `kind`, else `None`.
    pub fn resolve(&self, name: &str, kind: AssetKind) -> Option<AssetReference> {
        if let Some(asset) = self.read(name, kind) {
            return Some(asset);
        }
        if name != self.fallback_name {
            log::debug!(
                "asset {}.{} unavailable, trying {}",
                name,
                kind.extension(),
                self.fallback_name
            );
            if let Some(asset) = self.read(&self.fallback_name, kind) {
                return Some(asset);
            }
        }
        log::warn!(
            "no {} asset for {:?} (fallback {:?} missing too)",
            kind.extension(),
            name,
            self.fallback_name
        );
        None
    }

    pub fn emoticon(&self, label: &EmotionLabel) -> Option<AssetReference> {
        self.resolve(label.as_str(), AssetKind::Emoticon)
    }

    pub fn emotion_pdf(&self, label: &EmotionLabel) -> Option<AssetReference> {
        self.resolve(label.as_str(), AssetKind::EmotionPdf)
    }

    pub fn topic_pdf(&self, category: &Category) -> Option<AssetReference> {
        self.resolve(category.as_str(), AssetKind::TopicPdf)
    }

    fn read(&self, name: &str, kind: AssetKind) -> Option<AssetReference> {
        if !is_safe_name(name) {
            return None;
        }
        let filename = format!("{}.{}", name, kind.extension());
        let path = self.dir(kind).join(&filename);
        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Some(AssetReference {
                filename,
                mime_type: kind.mime_type().to_string(),
                bytes,
            }),
            Ok(_) => {
                log::warn!("asset {} is empty", path.display());
                None
            }
            Err(_) => None,
        }
    }
}

/// A bare file stem: no separators, no parent references, not empty.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Catalog;

    fn temp_dirs() -> (PathBuf, PathBuf, PathBuf) {
        let root = std::env::temp_dir().join(format!("responder-assets-{}", uuid::Uuid::new_v4()));
        let emotki = root.join("emotki");
        let pdf = root.join("pdf");
        fs::create_dir_all(&emotki).unwrap();
        fs::create_dir_all(&pdf).unwrap();
        (root, emotki, pdf)
    }

    #[test]
    fn primary_asset_is_read() {
        let (root, emotki, pdf) = temp_dirs();
        fs::write(emotki.join("twarz_spokoj.png"), b"png").unwrap();
        let resolver = AssetResolver::new(emotki, pdf, "error");
        let asset = resolver.resolve("twarz_spokoj", AssetKind::Emoticon).unwrap();
        assert_eq!(asset.filename, "twarz_spokoj.png");
        assert_eq!(asset.mime_type, "image/png");
        assert_eq!(asset.to_base64(), "cG5n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_primary_falls_back() {
        let (root, emotki, pdf) = temp_dirs();
        fs::write(pdf.join("error.pdf"), b"%PDF-fallback").unwrap();
        fs::write(pdf.join("twarz_lek.pdf"), b"").unwrap();
        let resolver = AssetResolver::new(emotki, pdf, "error");
        let asset = resolver.resolve("twarz_lek", AssetKind::EmotionPdf).unwrap();
        assert_eq!(asset.filename, "error.pdf");
        assert_eq!(asset.bytes, b"%PDF-fallback");
        assert_eq!(asset.mime_type, "application/pdf");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn both_missing_is_none() {
        let (root, emotki, pdf) = temp_dirs();
        let resolver = AssetResolver::new(emotki, pdf, "error");
        assert_eq!(resolver.resolve("twarz_lek", AssetKind::Emoticon), None);
        assert_eq!(resolver.resolve("error", AssetKind::TopicPdf), None);
        let _ = fs::remove_dir_all(&root);
        let gone = AssetResolver::new(root.join("nope"), root.join("nope"), "error");
        assert_eq!(gone.resolve("x", AssetKind::Emoticon), None);
    }

    #[test]
    fn unsafe_names_fall_back() {
        let (root, emotki, pdf) = temp_dirs();
        fs::write(root.join("secret.pdf"), b"secret").unwrap();
        fs::write(pdf.join("error.pdf"), b"fallback").unwrap();
        let resolver = AssetResolver::new(emotki, pdf, "error");
        let asset = resolver.resolve("../secret", AssetKind::TopicPdf).unwrap();
        assert_eq!(asset.bytes, b"fallback");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn label_helpers_use_validated_labels() {
        let (root, emotki, pdf) = temp_dirs();
        let catalog = Catalog::default();
        let category = catalog.default_category();
        fs::write(pdf.join(format!("{}.pdf", category)), b"kontakt").unwrap();
        fs::write(emotki.join("error.png"), b"err").unwrap();
        let resolver = AssetResolver::new(emotki, pdf, "error");
        assert_eq!(resolver.topic_pdf(&category).unwrap().bytes, b"kontakt");
        let fallback = catalog.fallback_emotion();
        assert_eq!(resolver.emoticon(&fallback).unwrap().filename, "error.png");
        assert_eq!(resolver.emotion_pdf(&fallback), None);
        let _ = fs::remove_dir_all(root);
    }
}
