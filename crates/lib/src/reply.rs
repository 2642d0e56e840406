//! Reply HTML and the JSON payload returned to the mail-sending script.
//!
//! Field names (`biznes`, `zwykly`, `reply_html`, ...) are what the script reads; keep them stable.

use serde::{Deserialize, Serialize};

use crate::assets::AssetReference;

/// Content id the personal emoticon is embedded under (`<img src="cid:emotka_cid">`).
pub const EMOTICON_CONTENT_ID: &str = "emotka_cid";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped `text` as italic paragraphs (blank line = new paragraph, newline = `<br>`), an
/// optional inline image by content id, then `footer_html` as-is.
pub fn render_html(text: &str, footer_html: &str, inline_cid: Option<&str>) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut html = String::new();
    for paragraph in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let lines: Vec<String> = paragraph.lines().map(|l| escape_html(l.trim_end())).collect();
        html.push_str("<p><i>");
        html.push_str(&lines.join("<br>"));
        html.push_str("</i></p>\n");
    }
    if let Some(cid) = inline_cid {
        html.push_str(&format!(
            "<p><img src=\"cid:{}\" alt=\"emotka\" style=\"width:64px;height:64px;\"></p>\n",
            escape_html(cid)
        ));
    }
    html.push_str(footer_html);
    html
}

/// Base64 file for the script to attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub base64: String,
    pub filename: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl Attachment {
    pub fn from_asset(asset: &AssetReference) -> Self {
        Self {
            base64: asset.to_base64(),
            filename: asset.filename.clone(),
            content_type: asset.mime_type.clone(),
            content_id: None,
        }
    }

    /// Same attachment, embedded inline under `content_id`.
    pub fn inline(mut self, content_id: &str) -> Self {
        self.content_id = Some(content_id.to_string());
        self
    }
}

/// Notarial answer with the topic PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSection {
    pub reply_html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Attachment>,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Model that answered; absent when the fallback text was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub rate_limited: bool,
}

/// Empathetic reply with the emotion attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalSection {
    pub reply_html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoticon: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Attachment>,
    pub detected_emotion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub rate_limited: bool,
}

/// Body of every webhook response (always HTTP 200).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookResponse {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        biznes: Option<BusinessSection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zwykly: Option<PersonalSection>,
    },
    Ignored {
        reason: String,
    },
}

impl WebhookResponse {
    pub fn ignored(reason: impl Into<String>) -> Self {
        WebhookResponse::Ignored {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn html_is_escaped_and_paragraphed() {
        let html = render_html("Dzień <b>dobry</b>\nlinia 2\n\n\nDrugi & ostatni", "<hr>", None);
        assert_eq!(
            html,
            "<p><i>Dzień &lt;b&gt;dobry&lt;/b&gt;<br>linia 2</i></p>\n<p><i>Drugi &amp; ostatni</i></p>\n<hr>"
        );
    }

    #[test]
    fn inline_image_precedes_footer() {
        let html = render_html("x", "<footer>", Some(EMOTICON_CONTENT_ID));
        assert!(html.contains("src=\"cid:emotka_cid\""));
        assert!(html.ends_with("<footer>"));
    }

    #[test]
    fn ignored_payload_shape() {
        let value = serde_json::to_value(WebhookResponse::ignored("empty body")).unwrap();
        assert_eq!(value, json!({"status": "ignored", "reason": "empty body"}));
    }

    #[test]
    fn ok_payload_shape() {
        let asset = AssetReference {
            filename: "twarz_lek.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        };
        let response = WebhookResponse::Ok {
            biznes: None,
            zwykly: Some(PersonalSection {
                reply_html: "<p>x</p>".to_string(),
                emoticon: Some(Attachment::from_asset(&asset).inline(EMOTICON_CONTENT_ID)),
                pdf: None,
                image: None,
                detected_emotion: "twarz_lek".to_string(),
                model: Some("m".to_string()),
                rate_limited: false,
            }),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "ok",
                "zwykly": {
                    "reply_html": "<p>x</p>",
                    "emoticon": {
                        "base64": "cG5n",
                        "filename": "twarz_lek.png",
                        "content_type": "image/png",
                        "content_id": "emotka_cid"
                    },
                    "detected_emotion": "twarz_lek",
                    "model": "m",
                    "rate_limited": false
                }
            })
        );
        let back: WebhookResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }
}
