//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.autoresponder/config.json`) and then
//! overridden from the environment once at startup. After that it is shared as an
//! immutable `Arc<Config>`; nothing below reads the environment again.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{DEFAULT_CATEGORIES, DEFAULT_CATEGORY, DEFAULT_EMOTIONS, FALLBACK_EMOTION};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP gateway settings (bind, port, webhook secret).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Text-generation provider: endpoint, key, model priority lists, timeouts.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Character ceilings for prompts and replies.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Prompt template files.
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Emoticon and PDF directories.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Emotion vocabulary and business category allow-list.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Optional image-generation provider.
    #[serde(default)]
    pub image: ImageConfig,

    /// Which senders get which reply sections.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// In-memory response cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fixed strings used when rendering replies.
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Gateway bind, port and webhook secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 10000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// When set, POST /webhook must carry a matching X-Webhook-Secret header. Overridden by WEBHOOK_SECRET env.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_gateway_port() -> u16 {
    10000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            webhook_secret: None,
        }
    }
}

/// OpenAI-compatible chat completions provider (Groq by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Bearer token. Overridden by KLUCZ_GROQ or GROQ_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Models for the personal reply, in priority order. Overridden by MODEL_TYLER env (comma-separated).
    #[serde(default = "default_reply_models")]
    pub reply_models: Vec<String>,

    /// Models for the business answer + category, in priority order. Overridden by MODEL_BIZ env.
    #[serde(default = "default_reply_models")]
    pub business_models: Vec<String>,

    /// Fast/cheap models for emotion detection. Overridden by MODEL_EMOTION env.
    #[serde(default = "default_emotion_models")]
    pub emotion_models: Vec<String>,

    /// Sampling temperature for the personal reply.
    #[serde(default = "default_reply_temperature")]
    pub reply_temperature: f32,

    /// Sampling temperature for business and emotion calls (0 = reproducible).
    #[serde(default)]
    pub classification_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_emotion_max_tokens")]
    pub emotion_max_tokens: u32,

    /// Timeout for reply generation. Overridden by HTTP_TIMEOUT_SECONDS env.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,

    /// Timeout for short classification calls; kept well below the reply timeout.
    #[serde(default = "default_classification_timeout_secs")]
    pub classification_timeout_secs: u64,
}

fn default_provider_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_reply_models() -> Vec<String> {
    vec!["llama-3.3-70b-versatile".to_string()]
}

fn default_emotion_models() -> Vec<String> {
    vec!["llama-3.1-8b-instant".to_string()]
}

fn default_reply_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    700
}

fn default_emotion_max_tokens() -> u32 {
    16
}

fn default_reply_timeout_secs() -> u64 {
    20
}

fn default_classification_timeout_secs() -> u64 {
    8
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            reply_models: default_reply_models(),
            business_models: default_reply_models(),
            emotion_models: default_emotion_models(),
            reply_temperature: default_reply_temperature(),
            classification_temperature: 0.0,
            max_tokens: default_max_tokens(),
            emotion_max_tokens: default_emotion_max_tokens(),
            reply_timeout_secs: default_reply_timeout_secs(),
            classification_timeout_secs: default_classification_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn classification_timeout(&self) -> Duration {
        Duration::from_secs(self.classification_timeout_secs)
    }
}

/// Character ceilings (counted in chars, not bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    #[serde(default = "default_max_user_chars")]
    pub max_user_chars: usize,
    #[serde(default = "default_max_template_chars")]
    pub max_template_chars: usize,
    #[serde(default = "default_max_model_input_chars")]
    pub max_model_input_chars: usize,
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,
}

fn default_max_user_chars() -> usize {
    2000
}

fn default_max_template_chars() -> usize {
    3000
}

fn default_max_model_input_chars() -> usize {
    5000
}

fn default_max_reply_chars() -> usize {
    2000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_user_chars: default_max_user_chars(),
            max_template_chars: default_max_template_chars(),
            max_model_input_chars: default_max_model_input_chars(),
            max_reply_chars: default_max_reply_chars(),
        }
    }
}

/// Template store: a directory holding one file per reply kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesConfig {
    /// Template directory. Relative paths are resolved against the config file's parent. Default: `templates`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_reply_template")]
    pub reply_file: String,
    #[serde(default = "default_business_template")]
    pub business_file: String,
}

fn default_reply_template() -> String {
    "prompt.txt".to_string()
}

fn default_business_template() -> String {
    "prompt_biznesowy.txt".to_string()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: None,
            reply_file: default_reply_template(),
            business_file: default_business_template(),
        }
    }
}

/// Asset directories. Relative paths are resolved against the config file's parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsConfig {
    /// PNG emoticons, one per emotion label (default `emotki`).
    #[serde(default)]
    pub emoticon_dir: Option<PathBuf>,
    /// PDFs for emotions and business topics (default `pdf`).
    #[serde(default)]
    pub pdf_dir: Option<PathBuf>,
    /// File stem tried when the primary asset is unavailable.
    #[serde(default = "default_fallback_asset")]
    pub fallback_name: String,
}

fn default_fallback_asset() -> String {
    "error".to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            emoticon_dir: None,
            pdf_dir: None,
            fallback_name: default_fallback_asset(),
        }
    }
}

/// Closed label sets. Defaults are the notarial office lists; override per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default = "default_emotions")]
    pub emotions: Vec<String>,
    #[serde(default = "default_fallback_emotion")]
    pub fallback_emotion: String,
    /// Business category allow-list (PDF file stems).
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Category used for unknown or invalid labels.
    #[serde(default = "default_category")]
    pub default_category: String,
    /// JSON field carrying the answer text in business replies.
    #[serde(default = "default_answer_field")]
    pub answer_field: String,
    /// JSON field carrying the category in business replies.
    #[serde(default = "default_category_field")]
    pub category_field: String,
}

fn default_emotions() -> Vec<String> {
    DEFAULT_EMOTIONS.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_emotion() -> String {
    FALLBACK_EMOTION.to_string()
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_answer_field() -> String {
    "odpowiedz_tekstowa".to_string()
}

fn default_category_field() -> String {
    "kategoria_pdf".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            emotions: default_emotions(),
            fallback_emotion: default_fallback_emotion(),
            categories: default_categories(),
            default_category: default_category(),
            answer_field: default_answer_field(),
            category_field: default_category_field(),
        }
    }
}

/// HuggingFace-style inference endpoint used for the optional illustration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
    /// Overridden by HF_IMAGE_MODEL env.
    #[serde(default = "default_image_model")]
    pub model: String,
    /// Image generation is disabled when no key is set. Overridden by YOUR_HF_IMAGE_API_KEY or HF_IMAGE_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_image_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_image_model() -> String {
    "stabilityai/stable-diffusion-2".to_string()
}

fn default_image_timeout_secs() -> u64 {
    30
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_base_url(),
            model: default_image_model(),
            api_key: None,
            timeout_secs: default_image_timeout_secs(),
        }
    }
}

/// Sender lists. All empty means every sender gets both sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Senders answered by the business section only. Extended by BIZ_LIST env.
    #[serde(default)]
    pub business_senders: Vec<String>,
    /// Senders answered by the personal section only. Extended by ALLOWED_LIST env.
    #[serde(default)]
    pub allowed_senders: Vec<String>,
    /// Body keywords that qualify an unknown sender for both sections. Extended by KEYWORDS env.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Optional file with one allowed address per line (default `dozwolone_email.txt` when present).
    #[serde(default)]
    pub allowed_senders_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

/// Strings rendered into replies when a model cannot be used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyConfig {
    /// HTML appended under every reply.
    #[serde(default = "default_footer_html")]
    pub footer_html: String,
    #[serde(default = "default_reply_fallback")]
    pub reply_fallback: String,
    #[serde(default = "default_business_fallback")]
    pub business_fallback: String,
    #[serde(default = "default_rate_limited_message")]
    pub rate_limited_message: String,
    /// Note attached to business replies whose topic could not be recognised.
    #[serde(default = "default_unclear_topic_note")]
    pub unclear_topic_note: String,
}

fn default_footer_html() -> String {
    "<p style=\"color:#0a8a0a; font-size:10px;\">Odpowiedź wygenerowana automatycznie.</p>"
        .to_string()
}

fn default_reply_fallback() -> String {
    "Przepraszam, wystąpił problem z generowaniem odpowiedzi.".to_string()
}

fn default_business_fallback() -> String {
    "Przepraszam, wystąpił problem z generowaniem odpowiedzi biznesowej.".to_string()
}

fn default_rate_limited_message() -> String {
    "Usługa odpowiedzi jest chwilowo niedostępna z powodu limitu zapytań.".to_string()
}

fn default_unclear_topic_note() -> String {
    "Niejednoznaczny temat; proszę o kontakt w celu doprecyzowania.".to_string()
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            footer_html: default_footer_html(),
            reply_fallback: default_reply_fallback(),
            business_fallback: default_business_fallback(),
            rate_limited_message: default_rate_limited_message(),
            unclear_topic_note: default_unclear_topic_note(),
        }
    }
}

/// Trimmed, non-empty value of the first variable in `names` that is set.
fn first_non_empty<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        lookup(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Split a comma-separated list, trimming and dropping empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in production.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = first_non_empty(&lookup, &["KLUCZ_GROQ", "GROQ_API_KEY"]) {
        config.provider.api_key = Some(key);
    }
    if let Some(models) = first_non_empty(&lookup, &["MODEL_TYLER"]) {
        config.provider.reply_models = split_list(&models);
    }
    if let Some(models) = first_non_empty(&lookup, &["MODEL_BIZ"]) {
        config.provider.business_models = split_list(&models);
    }
    if let Some(models) = first_non_empty(&lookup, &["MODEL_EMOTION"]) {
        config.provider.emotion_models = split_list(&models);
    }
    if let Some(secs) = first_non_empty(&lookup, &["HTTP_TIMEOUT_SECONDS"]) {
        match secs.parse::<u64>() {
            Ok(v) if v > 0 => config.provider.reply_timeout_secs = v,
            _ => log::warn!("ignoring invalid HTTP_TIMEOUT_SECONDS: {}", secs),
        }
    }
    if let Some(key) = first_non_empty(&lookup, &["YOUR_HF_IMAGE_API_KEY", "HF_IMAGE_API_KEY"]) {
        config.image.api_key = Some(key);
    }
    if let Some(model) = first_non_empty(&lookup, &["HF_IMAGE_MODEL"]) {
        config.image.model = model;
    }
    if let Some(list) = first_non_empty(&lookup, &["BIZ_LIST"]) {
        config.policy.business_senders.extend(split_list(&list));
    }
    if let Some(list) = first_non_empty(&lookup, &["ALLOWED_LIST"]) {
        config.policy.allowed_senders.extend(split_list(&list));
    }
    if let Some(list) = first_non_empty(&lookup, &["KEYWORDS"]) {
        config.policy.keywords.extend(split_list(&list));
    }
    if let Some(secret) = first_non_empty(&lookup, &["WEBHOOK_SECRET"]) {
        config.gateway.webhook_secret = Some(secret);
    }
    if let Some(port) = first_non_empty(&lookup, &["PORT"]) {
        match port.parse::<u16>() {
            Ok(p) => config.gateway.port = p,
            Err(_) => log::warn!("ignoring invalid PORT: {}", port),
        }
    }
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Short preview of a secret for logs: `abcd...wxyz`.
pub fn masked_key_preview(key: Option<&str>) -> String {
    let Some(k) = key.map(str::trim).filter(|k| !k.is_empty()) else {
        return "<none>".to_string();
    };
    let chars: Vec<char> = k.chars().collect();
    let keep = if chars.len() <= 8 { 2 } else { 4 };
    if chars.len() <= keep * 2 {
        return "...".to_string();
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("AUTORESPONDER_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".autoresponder").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Environment overrides are applied before returning.
/// Returns the config and the path that was used (for resolving relative directories).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok((config, path))
}

/// Directory holding the config file; `.` when the path has no parent.
pub fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve an optional configured directory: absolute paths as-is, relative ones against the config
/// file's parent, and `default_name` under the config directory when unset.
pub fn resolve_dir(config_path: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    let base = config_dir(config_path);
    match configured {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.to_path_buf()
            } else {
                base.join(d)
            }
        }
        _ => base.join(default_name),
    }
}

pub fn resolve_templates_dir(config: &Config, config_path: &Path) -> PathBuf {
    resolve_dir(config_path, config.templates.directory.as_deref(), "templates")
}

pub fn resolve_emoticon_dir(config: &Config, config_path: &Path) -> PathBuf {
    resolve_dir(config_path, config.assets.emoticon_dir.as_deref(), "emotki")
}

pub fn resolve_pdf_dir(config: &Config, config_path: &Path) -> PathBuf {
    resolve_dir(config_path, config.assets.pdf_dir.as_deref(), "pdf")
}

pub fn resolve_allowed_senders_file(config: &Config, config_path: &Path) -> PathBuf {
    resolve_dir(
        config_path,
        config.policy.allowed_senders_file.as_deref(),
        "dozwolone_email.txt",
    )
}
