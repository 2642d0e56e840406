//! Scripted [`ChatBackend`] for unit tests in other modules.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::client::{ChatBackend, ChatError, ChatReply, ChatRequest};

enum Scripted {
    Reply(ChatReply),
    Status(u16),
}

/// Answers per model id; unknown models get a 404.
pub(crate) struct StubBackend {
    replies: HashMap<String, Scripted>,
    configured: bool,
    calls: Mutex<Vec<(String, ChatRequest)>>,
}

impl StubBackend {
    pub(crate) fn new() -> Self {
        Self {
            replies: HashMap::new(),
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn text(mut self, model: &str, text: &str) -> Self {
        self.replies.insert(
            model.to_string(),
            Scripted::Reply(ChatReply::Text(text.to_string())),
        );
        self
    }

    pub(crate) fn rate_limited(mut self, model: &str, retry_after_secs: Option<u64>) -> Self {
        self.replies.insert(
            model.to_string(),
            Scripted::Reply(ChatReply::RateLimited { retry_after_secs }),
        );
        self
    }

    pub(crate) fn status(mut self, model: &str, status: u16) -> Self {
        self.replies
            .insert(model.to_string(), Scripted::Status(status));
        self
    }

    /// Report the backend as missing its credentials.
    pub(crate) fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Model ids in call order.
    pub(crate) fn models_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    /// Requests sent to `model`.
    pub(crate) fn requests_for(&self, model: &str) -> Vec<ChatRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn complete(
        &self,
        model: &str,
        request: &ChatRequest,
        _timeout: Duration,
    ) -> Result<ChatReply, ChatError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        match self.replies.get(model) {
            Some(Scripted::Reply(reply)) => Ok(reply.clone()),
            Some(Scripted::Status(status)) => Err(ChatError::Api {
                status: *status,
                body: String::new(),
            }),
            None => Err(ChatError::Api {
                status: 404,
                body: format!("model {} not found", model),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
