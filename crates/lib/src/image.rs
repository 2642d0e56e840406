//! Optional illustration for the personal reply, generated by a Hugging Face style inference
//! endpoint (`POST {base}/{model}` with `{"inputs": prompt}`).

use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::assets::AssetReference;
use crate::config::ImageConfig;
use crate::text::truncate_chars;

const PROMPT_PREFIX: &str = "Minimalistyczny schemat blokowy ilustrujący główne idee odpowiedzi: ";
const PROMPT_SUFFIX: &str = ", clean diagram, white background, vector style";
const PROMPT_SOURCE_CHARS: usize = 400;
const FILENAME_STEM: &str = "ilustracja";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image api error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("image response had no usable image: {0}")]
    Unusable(String),
}

/// Prompt describing `answer`: its first characters on one line between a fixed prefix and suffix.
pub fn image_prompt(answer: &str) -> String {
    let core = truncate_chars(answer, PROMPT_SOURCE_CHARS).replace(&['\r', '\n'][..], " ");
    format!("{}{}{}", PROMPT_PREFIX, core.trim(), PROMPT_SUFFIX)
}

#[derive(Clone)]
pub struct ImageClient {
    endpoint: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ImageClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// `None` unless an API key is configured.
    pub fn from_config(config: &ImageConfig) -> Option<Self> {
        let key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let endpoint = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.model.trim_matches('/')
        );
        Some(Self::new(endpoint, key, Duration::from_secs(config.timeout_secs)))
    }

    /// Generate an illustration for `answer`.
    pub async fn generate(&self, answer: &str) -> Result<AssetReference, ImageError> {
        let prompt = image_prompt(answer);
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "inputs": prompt }))
            .send()
            .await?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(ImageError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let content_type = header_content_type(res.headers());
        if content_type.starts_with("image/") {
            let bytes = res.bytes().await?.to_vec();
            return image_asset(bytes, &content_type);
        }

        let body: Value = serde_json::from_slice(&res.bytes().await?)
            .map_err(|e| ImageError::Unusable(format!("not an image or JSON ({})", e)))?;
        if let Some(b64) = body.get("b64_json").and_then(Value::as_str) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map_err(|e| ImageError::Unusable(format!("bad b64_json: {}", e)))?;
            return image_asset(bytes, "image/png");
        }
        let url = image_url(&body)
            .ok_or_else(|| ImageError::Unusable("JSON without an image url".to_string()))?;
        self.fetch(url).await
    }

    async fn fetch(&self, url: &str) -> Result<AssetReference, ImageError> {
        let res = self.client.get(url).timeout(self.timeout).send().await?;
        if !res.status().is_success() {
            return Err(ImageError::Api {
                status: res.status().as_u16(),
                body: String::new(),
            });
        }
        let content_type = header_content_type(res.headers());
        let content_type = if content_type.starts_with("image/") {
            content_type
        } else {
            "image/png".to_string()
        };
        let bytes = res.bytes().await?.to_vec();
        image_asset(bytes, &content_type)
    }
}

fn header_content_type(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
        .unwrap_or_default()
}

fn image_url(body: &Value) -> Option<&str> {
    body.get("url")
        .or_else(|| body.pointer("/data/0/url"))
        .or_else(|| body.get("image_url"))
        .and_then(Value::as_str)
        .filter(|u| !u.trim().is_empty())
}

fn image_asset(bytes: Vec<u8>, content_type: &str) -> Result<AssetReference, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Unusable("empty image".to_string()));
    }
    let extension = match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    };
    Ok(AssetReference {
        filename: format!("{}.{}", FILENAME_STEM, extension),
        mime_type: content_type.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prompt_is_single_line_and_bounded() {
        let answer = format!("linia1\nlinia2\r\n{}", "x".repeat(1000));
        let prompt = image_prompt(&answer);
        assert!(!prompt.contains('\n'));
        assert!(prompt.starts_with(PROMPT_PREFIX));
        assert!(prompt.ends_with(PROMPT_SUFFIX));
        assert!(prompt.chars().count() <= PROMPT_PREFIX.chars().count() + 400 + PROMPT_SUFFIX.chars().count());
    }

    #[test]
    fn disabled_without_key() {
        assert!(ImageClient::from_config(&ImageConfig::default()).is_none());
        let config = ImageConfig {
            api_key: Some("  ".to_string()),
            ..ImageConfig::default()
        };
        assert!(ImageClient::from_config(&config).is_none());
    }

    fn client(server: &MockServer) -> ImageClient {
        ImageClient::new(format!("{}/models/sd", server.uri()), "hf-key", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn raw_image_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/sd"))
            .and(header("authorization", "Bearer hf-key"))
            .and(body_json(serde_json::json!({ "inputs": image_prompt("Odpowiedź") })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;
        let asset = client(&server).generate("Odpowiedź").await.unwrap();
        assert_eq!(asset.bytes, vec![1, 2, 3]);
        assert_eq!(asset.filename, "ilustracja.jpg");
        assert_eq!(asset.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn json_url_is_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/sd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "data": [{ "url": format!("{}/img/1", server.uri()) }] }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![9u8]),
            )
            .mount(&server)
            .await;
        let asset = client(&server).generate("x").await.unwrap();
        assert_eq!(asset.bytes, vec![9]);
        assert_eq!(asset.filename, "ilustracja.png");
    }

    #[tokio::test]
    async fn b64_json_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "b64_json": "AQID" })),
            )
            .mount(&server)
            .await;
        let asset = client(&server).generate("x").await.unwrap();
        assert_eq!(asset.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;
        match client(&server).generate("x").await {
            Err(ImageError::Api { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "loading");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn json_without_image_is_unusable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": "x" })),
            )
            .mount(&server)
            .await;
        assert!(matches!(
            client(&server).generate("x").await,
            Err(ImageError::Unusable(_))
        ));
    }
}
