//! Parsing model output into JSON
//!
//! Models are asked for strict JSON but usually wrap it in a fenced code
//! block, and occasionally mangle a key. Parsing strips the fence, repairs the
//! known defects and then hands the text to `serde_json`.

use serde::de::DeserializeOwned;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Errors from turning a model response into a value
#[derive(Error, Debug)]
pub enum ResponseParseError {
    /// The model returned nothing but whitespace
    #[error("model returned empty content")]
    Empty,

    /// The (stripped) text is not the expected JSON
    #[error("failed to parse model output as JSON: {source}")]
    Json {
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
        /// Text as returned by the model
        raw: String,
    },
}

impl ResponseParseError {
    /// The raw model text, when parsing got that far
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Json { raw, .. } => Some(raw),
        }
    }
}

/// Extract the payload of a fenced code block, if there is one
///
/// A ```` ```json ```` block anywhere in the text wins; otherwise a text that
/// starts with a bare fence has its first line and closing fence removed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find(JSON_FENCE) {
        let body = &trimmed[start + JSON_FENCE.len()..];
        let end = body.find(FENCE).unwrap_or(body.len());
        return body[..end].trim();
    }

    if let Some(rest) = trimmed.strip_prefix(FENCE) {
        // drop an optional language tag on the opening line
        let rest = match rest.find('\n') {
            Some(newline) if !rest[..newline].trim().contains(['{', '[']) => &rest[newline + 1..],
            _ => rest,
        };
        let rest = rest.trim_end();
        return rest.strip_suffix(FENCE).unwrap_or(rest).trim();
    }

    trimmed
}

/// Fix output defects seen in collected model responses
///
/// Currently: `"std=1.5` (the key/value separator swallowed into the key) is
/// rewritten to `"std": 1.5`.
pub fn repair_known_defects(text: &str) -> String {
    const BROKEN: &str = "\"std=";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(BROKEN) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + BROKEN.len()..];
        let ws = after.len() - after.trim_start().len();
        let number_len = after[ws..]
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .unwrap_or(after.len() - ws);

        if number_len > 0 {
            out.push_str("\"std\": ");
            out.push_str(&after[ws..ws + number_len]);
            rest = &after[ws + number_len..];
        } else {
            out.push_str(BROKEN);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Parse a model response into `T`
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, ResponseParseError> {
    if text.trim().is_empty() {
        return Err(ResponseParseError::Empty);
    }

    let body = repair_known_defects(strip_code_fence(text));
    serde_json::from_str(&body).map_err(|source| ResponseParseError::Json {
        source,
        raw: text.to_string(),
    })
}
