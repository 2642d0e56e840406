//! Best-effort emotion label for the sender's message. Failure yields `None` and never blocks
//! the reply.

use std::sync::Arc;

use super::catalog::{Catalog, EmotionLabel};
use crate::config::Config;
use crate::llm::{ChatMessage, ChatRequest, ModelInvoker};
use crate::text::truncate_chars;

/// Lower-cased first whitespace-delimited token of `output`, without surrounding punctuation.
pub fn first_token(output: &str) -> String {
    output
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
        .to_lowercase()
}

pub struct EmotionClassifier {
    invoker: Arc<ModelInvoker>,
    config: Arc<Config>,
    catalog: Arc<Catalog>,
}

impl EmotionClassifier {
    pub fn new(invoker: Arc<ModelInvoker>, config: Arc<Config>, catalog: Arc<Catalog>) -> Self {
        Self {
            invoker,
            config,
            catalog,
        }
    }

    fn instruction(&self) -> String {
        format!(
            "Określ dominującą emocję nadawcy wiadomości. Odpowiedz dokładnie jednym słowem z listy: {}. \
             Nie dodawaj żadnych wyjaśnień.",
            self.catalog.emotions().join(", ")
        )
    }

    pub async fn classify(&self, user_text: &str) -> Option<EmotionLabel> {
        let provider = &self.config.provider;
        let text = truncate_chars(user_text.trim(), self.config.limits.max_user_chars);
        if text.is_empty() {
            return None;
        }
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(self.instruction()),
                ChatMessage::user(text),
            ],
            max_tokens: provider.emotion_max_tokens,
            temperature: provider.classification_temperature,
        };
        let result = self
            .invoker
            .invoke(
                &request,
                &provider.emotion_models,
                provider.classification_timeout(),
            )
            .await;
        let output = result.text()?;
        let label = self.catalog.emotion(&first_token(output));
        if self.catalog.is_fallback_emotion(&label) {
            log::debug!("emotion output {:?} not in vocabulary", output);
        }
        Some(label)
    }
}
