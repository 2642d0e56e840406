//! Business answers: the model is asked for a JSON object with an answer and a topic category,
//! and both fields are recovered even when it wraps the object in prose.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::catalog::{Catalog, Category};
use crate::config::Config;
use crate::llm::{ChatMessage, ChatRequest, ModelInvoker, Unanswered};
use crate::text::{answer_from_object, build_prompt, sanitize, truncate};

/// Answer and raw category extracted from model output. `category` is unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFields {
    pub answer: String,
    pub category: Option<String>,
}

/// Recover `answer_field` and `category_field` from `raw`: whole output as a JSON object, then
/// the substring from the first `{` to the last `}`, then `raw` verbatim with no category.
/// An object with neither `answer_field` nor another answer-like key yields an empty answer.
pub fn recover_fields(raw: &str, answer_field: &str, category_field: &str) -> RecoveredFields {
    let trimmed = raw.trim();
    let object = parse_object(trimmed).or_else(|| {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        if end <= start {
            return None;
        }
        parse_object(&trimmed[start..=end])
    });

    match object {
        Some(map) => {
            // Without any answer-like key the object carries no text for the customer.
            let answer = match map.get(answer_field).and_then(Value::as_str) {
                Some(a) => a.trim().to_string(),
                None => answer_from_object(&map)
                    .map(|a| sanitize(&a))
                    .unwrap_or_default(),
            };
            let category = map
                .get(category_field)
                .and_then(Value::as_str)
                .map(|c| c.trim().to_string());
            RecoveredFields { answer, category }
        }
        None => RecoveredFields {
            answer: raw.to_string(),
            category: None,
        },
    }
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Classified business answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessReply {
    pub answer: String,
    pub category: Category,
    /// Model that produced the answer.
    pub source_id: String,
}

pub struct BusinessClassifier {
    invoker: Arc<ModelInvoker>,
    config: Arc<Config>,
    catalog: Arc<Catalog>,
    template: String,
}

impl BusinessClassifier {
    pub fn new(
        invoker: Arc<ModelInvoker>,
        config: Arc<Config>,
        catalog: Arc<Catalog>,
        template: String,
    ) -> Self {
        Self {
            invoker,
            config,
            catalog,
            template,
        }
    }

    fn system_prompt(&self) -> String {
        let fields = &self.config.catalog;
        format!(
            "Jesteś asystentem kancelarii notarialnej. Odpowiadasz WYŁĄCZNIE jednym obiektem JSON, \
             bez żadnego tekstu przed ani po nim, w formacie:\n\
             {{\"{answer}\": \"<treść odpowiedzi dla klienta>\", \"{category}\": \"<kategoria>\"}}\n\
             Pole \"{category}\" musi być dokładnie jedną z wartości:\n{list}\n\
             Jeśli temat nie pasuje do żadnej kategorii, użyj \"{default}\".",
            answer = fields.answer_field,
            category = fields.category_field,
            list = self
                .catalog
                .categories()
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n"),
            default = self.catalog.default_category(),
        )
    }

    /// Answer `user_text` with a validated category, or report why no model answered.
    pub async fn classify(&self, user_text: &str) -> Result<BusinessReply, Unanswered> {
        let provider = &self.config.provider;
        let limits = &self.config.limits;
        let prompt = build_prompt(user_text, &self.template, limits);
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(prompt.merged),
            ],
            max_tokens: provider.max_tokens,
            temperature: provider.classification_temperature,
        };
        let (raw, source_id) = self
            .invoker
            .invoke(&request, &provider.business_models, provider.reply_timeout())
            .await
            .into_answer()?;

        let fields = recover_fields(
            &raw,
            &self.config.catalog.answer_field,
            &self.config.catalog.category_field,
        );
        let category = self
            .catalog
            .category(fields.category.as_deref().unwrap_or_default());
        log::info!("business answer from {} (category {})", source_id, category);
        Ok(BusinessReply {
            answer: truncate(&fields.answer, limits.max_reply_chars),
            category,
            source_id,
        })
    }
}
