//! One inbound message in, one payload out.
//!
//! Every failure below the gateway degrades content (fallback text, default topic, missing
//! attachment) instead of failing the request.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::AssetResolver;
use crate::cache::TtlCache;
use crate::classify::{BusinessClassifier, Catalog, EmotionClassifier};
use crate::config::{self, Config};
use crate::image::ImageClient;
use crate::llm::{
    ChatBackend, ChatClient, ChatMessage, ChatRequest, ModelCallResult, ModelInvoker, Unanswered,
};
use crate::policy::SenderPolicy;
use crate::reply::{
    render_html, Attachment, BusinessSection, PersonalSection, WebhookResponse, EMOTICON_CONTENT_ID,
};
use crate::text::{build_prompt, sanitize, truncate, Templates};

/// Webhook request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "from", default)]
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Apology text, extended with the retry hint when the provider gave one.
fn rate_limited_text(message: &str, retry_after_secs: Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!("{} Spróbuj ponownie za około {} s.", message, secs),
        None => message.to_string(),
    }
}

pub struct Pipeline {
    config: Arc<Config>,
    catalog: Arc<Catalog>,
    templates: Templates,
    invoker: Arc<ModelInvoker>,
    business: BusinessClassifier,
    emotion: EmotionClassifier,
    policy: SenderPolicy,
    assets: AssetResolver,
    image: Option<ImageClient>,
}

impl Pipeline {
    pub fn from_config(config: Arc<Config>, config_path: &Path) -> Self {
        let backend = Arc::new(ChatClient::from_config(&config.provider));
        Self::with_backend(config, config_path, backend)
    }

    pub fn with_backend(
        config: Arc<Config>,
        config_path: &Path,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let templates = Templates::load(
            &config::resolve_templates_dir(&config, config_path),
            &config.templates,
        );
        let invoker = Arc::new(if config.cache.enabled {
            ModelInvoker::with_cache(
                backend,
                TtlCache::new(Duration::from_secs(config.cache.ttl_secs), config.cache.capacity),
            )
        } else {
            ModelInvoker::new(backend)
        });
        let catalog = Arc::new(Catalog::from_config(&config.catalog));
        let business = BusinessClassifier::new(
            invoker.clone(),
            config.clone(),
            catalog.clone(),
            templates.business.clone(),
        );
        let emotion = EmotionClassifier::new(invoker.clone(), config.clone(), catalog.clone());
        let policy = SenderPolicy::from_config(
            &config.policy,
            &config::resolve_allowed_senders_file(&config, config_path),
        );
        let assets = AssetResolver::from_config(&config, config_path);
        let image = ImageClient::from_config(&config.image);
        if image.is_some() {
            log::info!("image generation enabled ({})", config.image.model);
        }
        Self {
            config,
            catalog,
            templates,
            invoker,
            business,
            emotion,
            policy,
            assets,
            image,
        }
    }

    pub async fn respond(&self, message: &InboundMessage) -> WebhookResponse {
        let body = message.body.trim();
        if body.is_empty() {
            return WebhookResponse::ignored("empty body");
        }
        let audience = self.policy.decide(&message.sender, body);
        if audience.is_ignored() {
            log::info!("ignoring message from {:?}: sender not allowed", message.sender);
            return WebhookResponse::ignored("sender not allowed");
        }
        log::info!(
            "message from {:?} ({:?}): business={} personal={}",
            message.sender,
            message.subject,
            audience.business,
            audience.personal
        );

        let (biznes, zwykly) = tokio::join!(
            async {
                if audience.business {
                    Some(self.business_section(body).await)
                } else {
                    None
                }
            },
            async {
                if audience.personal {
                    Some(self.personal_section(body).await)
                } else {
                    None
                }
            }
        );
        WebhookResponse::Ok { biznes, zwykly }
    }

    async fn personal_section(&self, body: &str) -> PersonalSection {
        let reply = &self.config.reply;
        let (emotion, result) = tokio::join!(self.emotion.classify(body), self.reply_text(body));
        let emotion = emotion.unwrap_or_else(|| self.catalog.fallback_emotion());

        let (text, model, rate_limited) = match result {
            ModelCallResult::Answered { text, model } => {
                let clean = truncate(sanitize(&text).trim(), self.config.limits.max_reply_chars);
                if clean.is_empty() {
                    log::warn!("model {} returned an empty reply", model);
                    (reply.reply_fallback.clone(), None, false)
                } else {
                    (clean, Some(model), false)
                }
            }
            ModelCallResult::RateLimited {
                retry_after_secs, ..
            } => (
                rate_limited_text(&reply.rate_limited_message, retry_after_secs),
                None,
                true,
            ),
            ModelCallResult::Exhausted => (reply.reply_fallback.clone(), None, false),
        };

        let emoticon = self
            .assets
            .emoticon(&emotion)
            .map(|a| Attachment::from_asset(&a).inline(EMOTICON_CONTENT_ID));
        let pdf = self.assets.emotion_pdf(&emotion).map(|a| Attachment::from_asset(&a));
        let image = match (&self.image, &model) {
            (Some(client), Some(_)) => match client.generate(&text).await {
                Ok(asset) => Some(Attachment::from_asset(&asset)),
                Err(e) => {
                    log::warn!("image generation failed: {}", e);
                    None
                }
            },
            _ => None,
        };
        let cid = emoticon.as_ref().map(|_| EMOTICON_CONTENT_ID);

        PersonalSection {
            reply_html: render_html(&text, &reply.footer_html, cid),
            emoticon,
            pdf,
            image,
            detected_emotion: emotion.to_string(),
            model,
            rate_limited,
        }
    }

    async fn reply_text(&self, body: &str) -> ModelCallResult {
        let provider = &self.config.provider;
        let prompt = build_prompt(body, &self.templates.reply, &self.config.limits);
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt.merged)],
            max_tokens: provider.max_tokens,
            temperature: provider.reply_temperature,
        };
        self.invoker
            .invoke(&request, &provider.reply_models, provider.reply_timeout())
            .await
    }

    async fn business_section(&self, body: &str) -> BusinessSection {
        let reply = &self.config.reply;
        let (text, category, model, rate_limited) = match self.business.classify(body).await {
            Ok(answer) if !answer.answer.trim().is_empty() => {
                (answer.answer, answer.category, Some(answer.source_id), false)
            }
            Ok(answer) => {
                log::warn!("model {} returned an empty business answer", answer.source_id);
                (reply.business_fallback.clone(), answer.category, None, false)
            }
            Err(Unanswered::RateLimited { retry_after_secs }) => (
                rate_limited_text(&reply.rate_limited_message, retry_after_secs),
                self.catalog.default_category(),
                None,
                true,
            ),
            Err(Unanswered::Exhausted) => (
                reply.business_fallback.clone(),
                self.catalog.default_category(),
                None,
                false,
            ),
        };
        let notes = (model.is_some() && self.catalog.is_default_category(&category))
            .then(|| reply.unclear_topic_note.clone());
        BusinessSection {
            reply_html: render_html(&text, &reply.footer_html, None),
            pdf: self.assets.topic_pdf(&category).map(|a| Attachment::from_asset(&a)),
            topic: category.to_string(),
            notes,
            model,
            rate_limited,
        }
    }
}
