//! Response normalization: provider text → structured classification.
//!
//! Pure functions; same payload in, same value out. Models wrap their
//! JSON in code fences or prose often enough that both are handled here
//! rather than treated as failures.

use serde::Deserialize;
use serde_json::Value;

use leadly_core::IntentType;

use crate::errors::ParseFailure;

/// The structured object demanded from every provider.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AiReply {
    pub purchase_intent: bool,
    pub intent_type: IntentType,
    #[serde(default)]
    pub primary_concern: String,
    #[serde(default)]
    pub suggested_response: String,
    pub confidence: f32,
    #[serde(default)]
    pub detected_phrases: Vec<String>,
}

/// Parse the assistant text into an `AiReply`, tolerating code fences and
/// surrounding prose, clamping confidence into [0, 1], and enforcing the
/// purchase-intent invariant.
pub fn parse_ai_reply(text: &str) -> Result<AiReply, ParseFailure> {
    let unfenced = strip_code_fences(text);
    let json_slice = extract_json_object(&unfenced).ok_or(ParseFailure::MissingJson)?;

    let value: Value = serde_json::from_str(json_slice)
        .map_err(|error| ParseFailure::BadShape(error.to_string()))?;
    let mut reply: AiReply =
        serde_json::from_value(value).map_err(|error| ParseFailure::BadShape(error.to_string()))?;

    reply.confidence = reply.confidence.clamp(0.0, 1.0);

    if reply.purchase_intent {
        match reply.intent_type {
            IntentType::NotInterested => return Err(ParseFailure::InvariantViolation),
            // A hedged intent label alongside a positive purchase signal
            // coerces to the canonical pairing.
            _ => reply.intent_type = IntentType::ReadyToPurchase,
        }
    }

    Ok(reply)
}

/// Drop Markdown code-fence markers, keeping the fenced content. Handles
/// both ```json and bare ``` fences.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }

    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Slice out the outermost `{ … }` object, balancing braces so prose
/// before or after the object is ignored. Brace characters inside JSON
/// strings are skipped.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
