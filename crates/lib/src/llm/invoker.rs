//! Priority-ordered model invocation.
//!
//! Candidates are tried one at a time; the first answer wins. Transport errors and non-200
//! responses move on to the next candidate. A 429 is remembered (with its retry hint) and the
//! next candidate is tried, since quotas are per model. Nothing here sleeps or retries the same
//! model.

use std::sync::Arc;
use std::time::Duration;

use super::client::{ChatBackend, ChatReply, ChatRequest};
use crate::cache::{cache_key, TtlCache};

/// Outcome of [`ModelInvoker::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCallResult {
    /// `model` answered with `text` (raw, not yet sanitized).
    Answered { text: String, model: String },
    /// Nobody answered and at least one candidate was rate limited; `model` is the first one.
    RateLimited {
        retry_after_secs: Option<u64>,
        model: String,
    },
    /// Nobody answered: misconfiguration, transport errors or upstream rejections.
    Exhausted,
}

/// Why a call produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unanswered {
    RateLimited { retry_after_secs: Option<u64> },
    Exhausted,
}

impl ModelCallResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Answered { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Id of the model that answered.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Answered { model, .. } => Some(model),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// `(text, model)` or the reason there is none.
    pub fn into_answer(self) -> Result<(String, String), Unanswered> {
        match self {
            Self::Answered { text, model } => Ok((text, model)),
            Self::RateLimited {
                retry_after_secs, ..
            } => Err(Unanswered::RateLimited { retry_after_secs }),
            Self::Exhausted => Err(Unanswered::Exhausted),
        }
    }
}

/// Calls a [`ChatBackend`] over a list of candidate models, optionally caching answers.
pub struct ModelInvoker {
    backend: Arc<dyn ChatBackend>,
    cache: Option<TtlCache<(String, String)>>,
}

impl ModelInvoker {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(backend: Arc<dyn ChatBackend>, cache: TtlCache<(String, String)>) -> Self {
        Self {
            backend,
            cache: Some(cache),
        }
    }

    /// Try `models` in order with `request`. See the module docs for the per-status behavior.
    pub async fn invoke(
        &self,
        request: &ChatRequest,
        models: &[String],
        timeout: Duration,
    ) -> ModelCallResult {
        if !self.backend.is_configured() {
            log::warn!("no provider API key configured; skipping model call");
            return ModelCallResult::Exhausted;
        }
        let candidates: Vec<&str> = models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();
        if candidates.is_empty() {
            log::warn!("empty model list; skipping model call");
            return ModelCallResult::Exhausted;
        }

        let key = self.cache.as_ref().map(|_| request_key(request, &candidates));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some((text, model)) = cache.get(key) {
                log::debug!("cache hit for model call (answered by {})", model);
                return ModelCallResult::Answered { text, model };
            }
        }

        let mut rate_limited: Option<(Option<u64>, String)> = None;
        for model in candidates {
            match self.backend.complete(model, request, timeout).await {
                Ok(ChatReply::Text(text)) => {
                    log::debug!("model {} answered ({} chars)", model, text.chars().count());
                    if let (Some(cache), Some(key)) = (&self.cache, &key) {
                        cache.insert(key.clone(), (text.clone(), model.to_string()));
                    }
                    return ModelCallResult::Answered {
                        text,
                        model: model.to_string(),
                    };
                }
                Ok(ChatReply::RateLimited { retry_after_secs }) => {
                    log::warn!(
                        "model {} rate limited (retry after {:?}s)",
                        model,
                        retry_after_secs
                    );
                    if rate_limited.is_none() {
                        rate_limited = Some((retry_after_secs, model.to_string()));
                    }
                }
                Err(e) => {
                    log::warn!("model {} failed: {}", model, e);
                }
            }
        }

        match rate_limited {
            Some((retry_after_secs, model)) => ModelCallResult::RateLimited {
                retry_after_secs,
                model,
            },
            None => ModelCallResult::Exhausted,
        }
    }
}

fn request_key(request: &ChatRequest, models: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(request.messages.len() * 2 + 3);
    parts.push(models.join(","));
    parts.push(request.max_tokens.to_string());
    parts.push(request.temperature.to_string());
    for m in &request.messages {
        parts.push(m.role.clone());
        parts.push(m.content.clone());
    }
    cache_key(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StubBackend;
    use crate::llm::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("cześć")],
            max_tokens: 50,
            temperature: 0.0,
        }
    }

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    const T: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn first_success_wins() {
        let backend = Arc::new(
            StubBackend::new()
                .status("a", 500)
                .text("b", "ok")
                .text("c", "never"),
        );
        let invoker = ModelInvoker::new(backend.clone());
        let result = invoker.invoke(&request(), &models(&["a", "b", "c"]), T).await;
        assert_eq!(result.text(), Some("ok"));
        assert_eq!(result.source_id(), Some("b"));
        assert_eq!(backend.models_called(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn all_failures_exhaust_without_rate_limit() {
        let backend = Arc::new(StubBackend::new().status("a", 500));
        let invoker = ModelInvoker::new(backend);
        let result = invoker.invoke(&request(), &models(&["a", "missing"]), T).await;
        assert_eq!(result, ModelCallResult::Exhausted);
        assert!(!result.is_rate_limited());
    }

    #[tokio::test]
    async fn rate_limit_is_reported_when_nobody_answers() {
        let backend = Arc::new(
            StubBackend::new()
                .rate_limited("a", Some(5))
                .rate_limited("b", Some(60)),
        );
        let invoker = ModelInvoker::new(backend.clone());
        let result = invoker.invoke(&request(), &models(&["a", "b"]), T).await;
        assert!(result.is_rate_limited());
        assert_eq!(result.retry_after_secs(), Some(5));
        assert_eq!(result.text(), None);
        assert_eq!(backend.models_called(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn later_candidate_can_answer_after_rate_limit() {
        let backend = Arc::new(
            StubBackend::new()
                .rate_limited("a", None)
                .text("b", "z drugiego"),
        );
        let invoker = ModelInvoker::new(backend);
        let result = invoker.invoke(&request(), &models(&["a", "b"]), T).await;
        assert_eq!(
            result,
            ModelCallResult::Answered {
                text: "z drugiego".to_string(),
                model: "b".to_string()
            }
        );
    }

    #[tokio::test]
    async fn misconfiguration_skips_network() {
        let backend = Arc::new(StubBackend::new().text("a", "x").unconfigured());
        let invoker = ModelInvoker::new(backend.clone());
        assert_eq!(
            invoker.invoke(&request(), &models(&["a"]), T).await,
            ModelCallResult::Exhausted
        );
        assert!(backend.models_called().is_empty());

        let configured = Arc::new(StubBackend::new().text("a", "x"));
        let invoker = ModelInvoker::new(configured.clone());
        assert_eq!(
            invoker.invoke(&request(), &models(&["", "  "]), T).await,
            ModelCallResult::Exhausted
        );
        assert!(configured.models_called().is_empty());
    }

    #[tokio::test]
    async fn cached_answer_skips_backend() {
        let backend = Arc::new(StubBackend::new().text("a", "raz"));
        let cache = TtlCache::new(Duration::from_secs(60), 16);
        let invoker = ModelInvoker::with_cache(backend.clone(), cache);
        let first = invoker.invoke(&request(), &models(&["a"]), T).await;
        let second = invoker.invoke(&request(), &models(&["a"]), T).await;
        assert_eq!(first, second);
        assert_eq!(backend.models_called().len(), 1);
    }

    #[tokio::test]
    async fn rate_limits_are_not_cached() {
        let backend = Arc::new(StubBackend::new().rate_limited("a", Some(1)));
        let invoker = ModelInvoker::with_cache(backend.clone(), TtlCache::new(Duration::from_secs(60), 16));
        invoker.invoke(&request(), &models(&["a"]), T).await;
        invoker.invoke(&request(), &models(&["a"]), T).await;
        assert_eq!(backend.models_called().len(), 2);
    }

    #[test]
    fn into_answer_maps_variants() {
        assert_eq!(
            ModelCallResult::RateLimited {
                retry_after_secs: Some(3),
                model: "a".to_string()
            }
            .into_answer(),
            Err(Unanswered::RateLimited {
                retry_after_secs: Some(3)
            })
        );
        assert_eq!(
            ModelCallResult::Exhausted.into_answer(),
            Err(Unanswered::Exhausted)
        );
    }
}
