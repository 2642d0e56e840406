//! Which reply sections a sender gets.
//!
//! Business senders get the business answer, allowed senders get the personal reply, and
//! anyone else whose message mentions a keyword gets both. With every list empty the service
//! is open and every sender gets both sections.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::PolicyConfig;

/// Lower-cased address; `Name <addr>` is reduced to `addr`, and Gmail local parts lose dots
/// and any `+tag`.
pub fn normalize_email(raw: &str) -> String {
    let mut email = raw.trim();
    if let (Some(start), Some(end)) = (email.find('<'), email.rfind('>')) {
        if start < end {
            email = &email[start + 1..end];
        }
    }
    let email = email.trim().to_lowercase();
    match email.rsplit_once('@') {
        Some((local, domain)) if domain == "gmail.com" || domain == "googlemail.com" => {
            let local = local.split('+').next().unwrap_or_default().replace('.', "");
            format!("{}@{}", local, domain)
        }
        _ => email,
    }
}

fn email_set<I>(items: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|e| normalize_email(e.as_ref()))
        .filter(|e| !e.is_empty())
        .collect()
}

/// Reply sections to produce. Neither means the message is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Audience {
    pub business: bool,
    pub personal: bool,
}

impl Audience {
    pub const BOTH: Audience = Audience {
        business: true,
        personal: true,
    };

    pub fn is_ignored(&self) -> bool {
        !self.business && !self.personal
    }
}

#[derive(Debug, Clone, Default)]
pub struct SenderPolicy {
    business: HashSet<String>,
    allowed: HashSet<String>,
    keywords: Vec<String>,
}

impl SenderPolicy {
    pub fn new<B, A, K>(business: B, allowed: A, keywords: K) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            business: email_set(business),
            allowed: email_set(allowed),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Lists from config plus one address per line from `allowed_file` (missing file is fine;
    /// blank lines and `#` comments are skipped).
    pub fn from_config(config: &PolicyConfig, allowed_file: &Path) -> Self {
        let mut allowed = config.allowed_senders.clone();
        match fs::read_to_string(allowed_file) {
            Ok(text) => {
                let before = allowed.len();
                allowed.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .map(str::to_string),
                );
                log::info!(
                    "loaded {} allowed senders from {}",
                    allowed.len() - before,
                    allowed_file.display()
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("cannot read {}: {}", allowed_file.display(), e),
        }
        Self::new(&config.business_senders, &allowed, &config.keywords)
    }

    pub fn is_open(&self) -> bool {
        self.business.is_empty() && self.allowed.is_empty() && self.keywords.is_empty()
    }

    pub fn decide(&self, sender: &str, body: &str) -> Audience {
        if self.is_open() {
            return Audience::BOTH;
        }
        let sender = normalize_email(sender);
        let business = self.business.contains(&sender);
        let personal = self.allowed.contains(&sender);
        if business || personal {
            return Audience { business, personal };
        }
        let body = body.to_lowercase();
        if self.keywords.iter().any(|k| body.contains(k.as_str())) {
            Audience::BOTH
        } else {
            Audience::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_addresses() {
        assert_eq!(normalize_email(" Jan.Kowalski+news@Gmail.com "), "jankowalski@gmail.com");
        assert_eq!(normalize_email("Jan <jan.k@firma.pl>"), "jan.k@firma.pl");
        assert_eq!(normalize_email("a.b+c@firma.pl"), "a.b+c@firma.pl");
        assert_eq!(normalize_email("bez-malpy"), "bez-malpy");
    }

    fn policy() -> SenderPolicy {
        SenderPolicy::new(
            ["biuro@firma.pl"],
            ["ja.nek@gmail.com", "oba@firma.pl"],
            ["Notariusz", "spadek"],
        )
    }

    #[test]
    fn lists_select_sections() {
        let p = SenderPolicy::new(["oba@firma.pl"], ["oba@firma.pl"], Vec::<String>::new());
        assert_eq!(p.decide("oba@firma.pl", ""), Audience::BOTH);

        let p = policy();
        assert_eq!(
            p.decide("BIURO@firma.pl", "spadek"),
            Audience {
                business: true,
                personal: false
            }
        );
        assert_eq!(
            p.decide("Janek <janek+x@gmail.com>", ""),
            Audience {
                business: false,
                personal: true
            }
        );
    }

    #[test]
    fn keyword_only_gets_both() {
        let p = policy();
        assert_eq!(p.decide("obcy@x.pl", "Pytanie do NOTARIUSZA"), Audience::BOTH);
        assert!(p.decide("obcy@x.pl", "zwykła wiadomość").is_ignored());
    }

    #[test]
    fn empty_policy_is_open() {
        let p = SenderPolicy::default();
        assert!(p.is_open());
        assert_eq!(p.decide("ktokolwiek@x.pl", ""), Audience::BOTH);
    }

    #[test]
    fn allowed_file_is_merged() {
        let path = std::env::temp_dir().join(format!("responder-allowed-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, "# lista\n\nPrzyjaciel@firma.pl\n").unwrap();
        let config = PolicyConfig {
            keywords: vec!["umowa".to_string()],
            ..PolicyConfig::default()
        };
        let p = SenderPolicy::from_config(&config, &path);
        assert!(p.decide("przyjaciel@firma.pl", "").personal);
        let _ = fs::remove_file(&path);

        let missing = SenderPolicy::from_config(&PolicyConfig::default(), &path);
        assert!(missing.is_open());
    }
}
