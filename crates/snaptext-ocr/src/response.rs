use serde::Deserialize;
use serde_json::Value;

use crate::OcrError;

const SNIPPET_CHARS: usize = 1000;

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<MessageContent>,
}

/// Providers return either a plain string or a list of typed parts
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts.into_iter().filter_map(|p| p.text).collect(),
        }
    }
}

/// Pull the recognized text out of a chat completion body.
///
/// Reads `choices[0].message.content`, first through the typed completion
/// shape and then by key lookup on generic JSON, so a response with extra or
/// oddly typed sibling fields still yields its text.
pub fn extract_text(body: &str) -> Result<String, OcrError> {
    let content = typed_content(body)
        .or_else(|| generic_content(body))
        .ok_or_else(|| OcrError::MalformedResponse {
            snippet: snippet(body),
        })?;

    let text = content.trim();
    if text.is_empty() {
        return Err(OcrError::EmptyResult);
    }

    Ok(text.to_string())
}

fn typed_content(body: &str) -> Option<String> {
    match serde_json::from_str::<ChatCompletion>(body) {
        Ok(completion) => completion
            .choices
            .into_iter()
            .next()?
            .message
            .content
            .map(MessageContent::into_text),
        Err(e) => {
            tracing::debug!("Typed completion parse failed: {}", e);
            None
        }
    }
}

fn generic_content(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let content = json.get("choices")?.get(0)?.get("message")?.get("content")?;

    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect(),
        ),
        _ => None,
    }
}

pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}
