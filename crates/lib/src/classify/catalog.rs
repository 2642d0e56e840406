//! Closed label sets. A label only exists as [`EmotionLabel`] or [`Category`] after it has been
//! checked against the configured vocabulary, so model output never reaches a file lookup
//! unvalidated.

use serde::Serialize;

use crate::config::CatalogConfig;

pub const DEFAULT_EMOTIONS: &[&str] = &[
    "twarz_lek",
    "twarz_nuda",
    "twarz_radosc",
    "twarz_smutek",
    "twarz_spokoj",
    "twarz_zaskoczenie",
    "twarz_zlosc",
];

pub const FALLBACK_EMOTION: &str = "error";

pub const DEFAULT_CATEGORY: &str = "kontakt_godziny_pracy_notariusza_podstawowe_informacje";

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "darowizna_mieszkania_lub_domu_obowiazki_podatkowe_i_formalne",
    "dzial_spadku_umowny_krok_po_kroku_z_notariuszem",
    "intercyza_umowa_majatkowa_malzenska_wyjasnienie_i_koszty",
    DEFAULT_CATEGORY,
    "sprzedaz_nieruchomosci_mieszkanie_procedura_koszty_wymagane_dokumenty",
];

/// A member of the emotion vocabulary, or the fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EmotionLabel(String);

impl EmotionLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member of the business category allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configured vocabularies (lower-cased).
#[derive(Debug, Clone)]
pub struct Catalog {
    emotions: Vec<String>,
    fallback_emotion: String,
    categories: Vec<String>,
    default_category: String,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

impl Catalog {
    pub fn from_config(config: &CatalogConfig) -> Self {
        let emotions: Vec<String> = config
            .emotions
            .iter()
            .map(|e| normalize(e))
            .filter(|e| !e.is_empty())
            .collect();
        let mut categories: Vec<String> = config
            .categories
            .iter()
            .map(|c| normalize(strip_pdf(c)))
            .filter(|c| !c.is_empty())
            .collect();
        let default_category = normalize(strip_pdf(&config.default_category));
        if !categories.contains(&default_category) {
            categories.push(default_category.clone());
        }
        Self {
            emotions,
            fallback_emotion: normalize(&config.fallback_emotion),
            categories,
            default_category,
        }
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn fallback_emotion(&self) -> EmotionLabel {
        EmotionLabel(self.fallback_emotion.clone())
    }

    pub fn default_category(&self) -> Category {
        Category(self.default_category.clone())
    }

    /// `token` as an emotion label when it is in the vocabulary, otherwise the fallback.
    pub fn emotion(&self, token: &str) -> EmotionLabel {
        let token = normalize(token);
        if self.emotions.contains(&token) {
            EmotionLabel(token)
        } else {
            self.fallback_emotion()
        }
    }

    /// `raw` (optionally with a `.pdf` suffix) as a category when it is on the allow-list,
    /// otherwise the default category.
    pub fn category(&self, raw: &str) -> Category {
        let label = normalize(strip_pdf(raw.trim()));
        if self.categories.contains(&label) {
            Category(label)
        } else {
            if !label.is_empty() {
                log::debug!("category {:?} not on the allow-list; using default", raw);
            }
            self.default_category()
        }
    }

    pub fn is_default_category(&self, category: &Category) -> bool {
        category.0 == self.default_category
    }

    pub fn is_fallback_emotion(&self, label: &EmotionLabel) -> bool {
        label.0 == self.fallback_emotion
    }
}

fn strip_pdf(label: &str) -> &str {
    let len = label.len();
    if len >= 4 && label.is_char_boundary(len - 4) && label[len - 4..].eq_ignore_ascii_case(".pdf") {
        &label[..len - 4]
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_must_be_in_vocabulary() {
        let catalog = Catalog::default();
        assert_eq!(catalog.emotion("Twarz_Radosc").as_str(), "twarz_radosc");
        assert_eq!(catalog.emotion("joy").as_str(), FALLBACK_EMOTION);
        assert!(catalog.is_fallback_emotion(&catalog.emotion("")));
    }

    #[test]
    fn category_strips_pdf_and_checks_allow_list() {
        let catalog = Catalog::default();
        let c = catalog.category("DZIAL_SPADKU_UMOWNY_KROK_PO_KROKU_Z_NOTARIUSZEM.pdf");
        assert_eq!(c.as_str(), "dzial_spadku_umowny_krok_po_kroku_z_notariuszem");
        assert!(!catalog.is_default_category(&c));
        assert_eq!(catalog.category("UNKNOWN_FILE.pdf").as_str(), DEFAULT_CATEGORY);
    }

    #[test]
    fn path_like_labels_are_coerced() {
        let catalog = Catalog::default();
        for raw in ["../../etc/passwd", "/tmp/x.pdf", "a/b", "..", "", "  "] {
            assert_eq!(catalog.category(raw), catalog.default_category(), "{:?}", raw);
        }
    }

    #[test]
    fn default_category_is_always_allowed() {
        let config = CatalogConfig {
            categories: vec!["a".to_string()],
            default_category: "kontakt.pdf".to_string(),
            ..CatalogConfig::default()
        };
        let catalog = Catalog::from_config(&config);
        assert_eq!(catalog.categories(), &["a".to_string(), "kontakt".to_string()]);
        assert_eq!(catalog.category("nope").as_str(), "kontakt");
    }

    #[test]
    fn strip_pdf_handles_short_and_multibyte() {
        assert_eq!(strip_pdf("pdf"), "pdf");
        assert_eq!(strip_pdf("ż.PDF"), "ż");
        assert_eq!(strip_pdf("żółć"), "żółć");
    }
}
