use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::channel::oneshot;
use image::RgbaImage;
use serde::Deserialize;

use crate::decode::decode_image_bytes;
use crate::document::Selection;
use crate::error::{DecodeError, RemoteEditError};

/// Hosted model the edit requests go to.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub type EditOutcome = Result<RgbaImage, RemoteEditError>;

/// One instruction-plus-image payload for the remote editor.
pub struct EditRequest {
    pub prompt: String,
    pub mime_type: String,
    pub image_bytes: Vec<u8>,
}

/// The remote image-transform collaborator: takes a flattened rendering and
/// an instruction, eventually yields a replacement image or a reason it
/// could not.
pub trait RemoteImageEditor {
    fn begin_edit(&self, api_key: &str, request: EditRequest) -> oneshot::Receiver<EditOutcome>;
}

/// An edit in flight, remembering what it was launched for so the result can
/// be routed back (or dropped if that target is gone by then).
pub struct PendingEdit {
    target: Selection,
    receiver: oneshot::Receiver<EditOutcome>,
}

impl PendingEdit {
    pub fn new(target: Selection, receiver: oneshot::Receiver<EditOutcome>) -> Self {
        Self { target, receiver }
    }

    pub fn target(&self) -> Selection {
        self.target
    }

    /// Non-blocking check for completion. Returns `None` while the edit is
    /// still running; a dropped sender reports as a cancelled edit.
    pub fn poll(&mut self) -> Option<EditOutcome> {
        match self.receiver.try_recv() {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(RemoteEditError::Cancelled)),
        }
    }
}

/// Editor backed by the Gemini generateContent endpoint. Works on native and
/// on the web through the same fetch path.
pub struct GeminiImageEditor {
    api_root: String,
}

impl GeminiImageEditor {
    pub fn new() -> Self {
        Self {
            api_root: API_ROOT.to_owned(),
        }
    }

    fn request_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_root, GEMINI_MODEL, api_key
        )
    }
}

impl Default for GeminiImageEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteImageEditor for GeminiImageEditor {
    fn begin_edit(&self, api_key: &str, request: EditRequest) -> oneshot::Receiver<EditOutcome> {
        let (tx, rx) = oneshot::channel();

        if api_key.is_empty() {
            let _ = tx.send(Err(RemoteEditError::MissingApiKey));
            return rx;
        }

        let body = request_body(&request.prompt, &request.mime_type, &request.image_bytes);
        let bytes = match serde_json::to_vec(&body) {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tx.send(Err(RemoteEditError::Http(err.to_string())));
                return rx;
            }
        };

        let mut http = ehttp::Request::post(self.request_url(api_key), bytes);
        http.headers = ehttp::Headers::new(&[("Content-Type", "application/json")]);

        log::info!("remote edit started ({} byte payload)", request.image_bytes.len());
        ehttp::fetch(http, move |result| {
            let outcome = match result {
                Ok(response) => parse_edit_response(response.status, &response.bytes),
                Err(message) => Err(RemoteEditError::Http(message)),
            };
            if let Err(err) = &outcome {
                log::warn!("remote edit failed: {err}");
            }
            let _ = tx.send(outcome);
        });

        rx
    }
}

fn request_body(prompt: &str, mime_type: &str, image_bytes: &[u8]) -> serde_json::Value {
    // The API takes snake_case on requests but answers in camelCase.
    serde_json::json!({
        "contents": [{
            "parts": [
                { "text": prompt },
                { "inline_data": { "mime_type": mime_type, "data": BASE64.encode(image_bytes) } }
            ]
        }]
    })
}

#[derive(Default, Deserialize)]
struct EditResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Default, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    finish_reason: Option<String>,
    content: Option<Content>,
}

#[derive(Default, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

/// Walk the response down to its image payload, naming the first thing that
/// rules one out. An unparseable body is treated as an empty response.
pub fn parse_edit_response(status: u16, body: &[u8]) -> EditOutcome {
    let parsed: EditResponse = serde_json::from_slice(body).unwrap_or_default();

    if !(200..300).contains(&status) {
        let message = parsed
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP Error: {status}"));
        return Err(RemoteEditError::Http(message));
    }

    let candidates = parsed.candidates.unwrap_or_default();
    let Some(candidate) = candidates.first() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(RemoteEditError::Blocked(reason));
        }
        return Err(RemoteEditError::NoCandidates);
    };

    if let Some(reason) = &candidate.finish_reason {
        if reason != "STOP" {
            return Err(RemoteEditError::BadFinishReason(reason.clone()));
        }
    }

    let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref()) else {
        return Err(RemoteEditError::NoContentParts);
    };

    let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) else {
        return match parts.iter().find_map(|p| p.text.as_ref()) {
            Some(text) => Err(RemoteEditError::TextOnly(text.clone())),
            None => Err(RemoteEditError::NoImage),
        };
    };

    let mime = inline.mime_type.as_deref().unwrap_or("image/png");
    let payload = BASE64
        .decode(inline.data.as_deref().unwrap_or(""))
        .map_err(DecodeError::from)?;
    let image = decode_image_bytes("", mime, &payload)?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_png;

    fn png_base64(width: u32, height: u32) -> String {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([80, 90, 100, 255]));
        BASE64.encode(encode_png(&image).unwrap())
    }

    fn image_reply(width: u32, height: u32) -> Vec<u8> {
        serde_json::json!({
            "candidates": [{
                "finishReason": "STOP",
                "content": {
                    "parts": [
                        { "text": "Here you go." },
                        { "inlineData": { "mimeType": "image/png", "data": png_base64(width, height) } }
                    ]
                }
            }]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_parse_decodes_returned_image() {
        let image = parse_edit_response(200, &image_reply(6, 3)).unwrap();
        assert_eq!((image.width(), image.height()), (6, 3));
    }

    #[test]
    fn test_parse_prefers_server_error_message() {
        let body = br#"{"error":{"message":"API key not valid"}}"#;
        let err = parse_edit_response(400, body).unwrap_err();
        assert_eq!(err.to_string(), "API key not valid");
    }

    #[test]
    fn test_parse_falls_back_to_http_status() {
        let err = parse_edit_response(502, b"Bad Gateway").unwrap_err();
        assert_eq!(err.to_string(), "HTTP Error: 502");
    }

    #[test]
    fn test_parse_reports_block_reason() {
        let body = br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert_eq!(err.to_string(), "Request blocked: SAFETY");
    }

    #[test]
    fn test_parse_reports_empty_response() {
        let err = parse_edit_response(200, b"{}").unwrap_err();
        assert!(matches!(err, RemoteEditError::NoCandidates));
    }

    #[test]
    fn test_parse_rejects_bad_finish_reason() {
        let body = br#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert_eq!(err.to_string(), "Generation failed. Reason: MAX_TOKENS");
    }

    #[test]
    fn test_parse_requires_content_parts() {
        let body = br#"{"candidates":[{"finishReason":"STOP"}]}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert!(matches!(err, RemoteEditError::NoContentParts));
    }

    #[test]
    fn test_parse_surfaces_text_only_reply() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"I cannot edit that."}]}}]}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert_eq!(err.to_string(), "AI returned text: \"I cannot edit that.\"");
    }

    #[test]
    fn test_parse_reports_partless_reply_without_image() {
        let body = br#"{"candidates":[{"content":{"parts":[{}]}}]}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert!(matches!(err, RemoteEditError::NoImage));
    }

    #[test]
    fn test_parse_rejects_corrupt_image_payload() {
        let body = br#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"bm90IGFuIGltYWdl"}}]}}]}"#;
        let err = parse_edit_response(200, body).unwrap_err();
        assert!(matches!(err, RemoteEditError::BadImagePayload(_)));
    }

    #[test]
    fn test_request_body_carries_prompt_and_payload() {
        let body = request_body("remove the background", "image/png", &[1, 2, 3]);
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "remove the background");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        let data = parts[1]["inline_data"]["data"].as_str().unwrap();
        assert_eq!(BASE64.decode(data).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_request_url_names_model_and_key() {
        let editor = GeminiImageEditor::new();
        let url = editor.request_url("secret123");
        assert!(url.contains(GEMINI_MODEL));
        assert!(url.ends_with("key=secret123"));
    }

    #[test]
    fn test_missing_key_fails_without_network() {
        let editor = GeminiImageEditor::new();
        let mut pending = PendingEdit::new(
            Selection::Base,
            editor.begin_edit(
                "",
                EditRequest {
                    prompt: "brighten".to_owned(),
                    mime_type: "image/png".to_owned(),
                    image_bytes: vec![0u8; 8],
                },
            ),
        );
        let outcome = pending.poll().unwrap();
        assert!(matches!(outcome, Err(RemoteEditError::MissingApiKey)));
    }

    #[test]
    fn test_pending_edit_reports_dropped_sender_as_cancelled() {
        let (tx, rx) = oneshot::channel::<EditOutcome>();
        let mut pending = PendingEdit::new(Selection::Base, rx);
        drop(tx);
        let outcome = pending.poll().unwrap();
        assert!(matches!(outcome, Err(RemoteEditError::Cancelled)));
    }

    #[test]
    fn test_pending_edit_waits_then_delivers() {
        let (tx, rx) = oneshot::channel::<EditOutcome>();
        let mut pending = PendingEdit::new(Selection::Base, rx);
        assert!(pending.poll().is_none());

        tx.send(Ok(RgbaImage::new(2, 2))).ok().unwrap();
        let outcome = pending.poll().unwrap();
        assert_eq!(outcome.unwrap().width(), 2);
    }
}
