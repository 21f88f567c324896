//! Turns a raw service response into candidate task objects.

use serde_json::Value;

use super::error::ExtractionError;
use crate::llm::RawResponse;

/// One prospective task exactly as the service produced it. Field types are
/// not checked here.
pub type RawCandidate = Value;

/// What a shape adapter found in the payload.
#[derive(Debug, Clone, PartialEq)]
enum Content {
    Text(String),
    Structured(Value),
}

type ShapeAdapter = fn(&RawResponse) -> Option<Content>;

/// Tried in order; the first adapter returning content wins.
const SHAPE_ADAPTERS: &[ShapeAdapter] = &[
    message_content,
    choice_text,
    choice_content,
    top_level_content,
    plain_text,
    structured_payload,
];

/// Extract candidate task objects from `response`.
pub fn interpret(response: &RawResponse) -> Result<Vec<RawCandidate>, ExtractionError> {
    let content = SHAPE_ADAPTERS
        .iter()
        .find_map(|adapter| adapter(response))
        .ok_or(ExtractionError::EmptyResponse)?;

    let parsed = match content {
        Content::Structured(value) => value,
        Content::Text(text) => parse_embedded_json(&text)
            .map_err(|source| ExtractionError::MalformedOutput { source })?,
    };

    Ok(into_candidates(parsed))
}

fn first_choice(response: &RawResponse) -> Option<&Value> {
    match response {
        RawResponse::Json(value) => value.get("choices")?.get(0),
        RawResponse::Text(_) => None,
    }
}

/// `choices[0].message.content`
fn message_content(response: &RawResponse) -> Option<Content> {
    let content = first_choice(response)?.get("message")?.get("content")?;
    text_parts(content).or_else(|| content_from_value(content))
}

/// `choices[0].text` (legacy completions)
fn choice_text(response: &RawResponse) -> Option<Content> {
    content_from_value(first_choice(response)?.get("text")?)
}

/// `choices[0].content`
fn choice_content(response: &RawResponse) -> Option<Content> {
    content_from_value(first_choice(response)?.get("content")?)
}

/// `content` at the top level
fn top_level_content(response: &RawResponse) -> Option<Content> {
    match response {
        RawResponse::Json(value) => content_from_value(value.get("content")?),
        RawResponse::Text(_) => None,
    }
}

/// A body that was never JSON in the first place.
fn plain_text(response: &RawResponse) -> Option<Content> {
    match response {
        RawResponse::Text(text) if !text.trim().is_empty() => Some(Content::Text(text.clone())),
        _ => None,
    }
}

/// The payload is itself the task data rather than a completion envelope.
fn structured_payload(response: &RawResponse) -> Option<Content> {
    match response {
        RawResponse::Json(value @ Value::Array(_)) => Some(Content::Structured(value.clone())),
        RawResponse::Json(Value::Object(map)) if !map.contains_key("choices") => {
            Some(Content::Structured(Value::Object(map.clone())))
        }
        _ => None,
    }
}

fn content_from_value(value: &Value) -> Option<Content> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(Content::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Some(Content::Structured(value.clone())),
        _ => None,
    }
}

/// Multimodal content arrays: `[{"type": "text", "text": "..."}, ...]`.
fn text_parts(value: &Value) -> Option<Content> {
    let parts = value.as_array()?;
    if parts.is_empty() {
        return None;
    }

    let mut text = String::new();
    for part in parts {
        if part.get("type").and_then(Value::as_str) != Some("text") {
            return None;
        }
        text.push_str(part.get("text")?.as_str()?);
    }

    if text.trim().is_empty() {
        None
    } else {
        Some(Content::Text(text))
    }
}

/// Parse the first JSON value in `text`, skipping anything before the first
/// `[` or `{` and ignoring anything after the value ends.
fn parse_embedded_json(text: &str) -> Result<Value, serde_json::Error> {
    let start = [text.find('['), text.find('{')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(0);
    let remainder = text[start..].trim();

    let mut values = serde_json::Deserializer::from_str(remainder).into_iter::<Value>();
    match values.next() {
        Some(result) => result,
        None => serde_json::from_str(remainder),
    }
}

fn into_candidates(parsed: Value) -> Vec<RawCandidate> {
    match parsed {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("tasks") {
                return items.clone();
            }
            // Keyed-by-index shape: {"1": {...}, "2": {...}}
            map.into_iter()
                .map(|(_, value)| value)
                .filter(Value::is_object)
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::completion;
    use serde_json::json;

    #[test]
    fn test_array_content_passes_through_in_order() {
        let response = completion(r#"[{"text":"a"}, 3, {"text":"b"}]"#);
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "a"}), json!(3), json!({"text": "b"})]);
    }

    #[test]
    fn test_preamble_is_discarded() {
        let response = completion(
            "Sure! Here are the tasks you asked for:\n[{\"text\":\"Fix the login bug\"}]",
        );
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "Fix the login bug"})]);
    }

    #[test]
    fn test_markdown_fence_and_trailing_commentary() {
        let response = completion("```json\n[{\"text\":\"a\"}]\n```\nLet me know if you need more.");
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "a"})]);
    }

    #[test]
    fn test_object_before_array_wins() {
        let response = completion(r#"Result: {"tasks": [{"text": "a"}], "note": "[draft]"}"#);
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "a"})]);
    }

    #[test]
    fn test_keyed_by_index_object() {
        let response = completion(r#"{"1": {"text": "a"}, "2": {"text": "b"}, "count": 2}"#);
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "a"}), json!({"text": "b"})]);
    }

    #[test]
    fn test_tasks_key_that_is_not_a_list() {
        let response = completion(r#"{"tasks": {"text": "only"}}"#);
        let candidates = interpret(&response).unwrap();
        assert_eq!(candidates, vec![json!({"text": "only"})]);
    }

    #[test]
    fn test_scalar_json_yields_nothing() {
        assert!(interpret(&completion("42")).unwrap().is_empty());
        assert!(interpret(&completion("\"just a string\"")).unwrap().is_empty());
    }

    #[test]
    fn test_non_json_text_is_malformed() {
        let err = interpret(&completion("Sorry, I cannot help.")).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedOutput { .. }));

        let err = interpret(&completion("[{\"text\": \"unterminated\"")).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedOutput { .. }));
    }

    #[test]
    fn test_missing_content_is_empty_response() {
        let null_content = RawResponse::Json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }));
        assert!(matches!(
            interpret(&null_content),
            Err(ExtractionError::EmptyResponse)
        ));

        let no_choices = RawResponse::Json(json!({"choices": []}));
        assert!(matches!(
            interpret(&no_choices),
            Err(ExtractionError::EmptyResponse)
        ));

        assert!(matches!(
            interpret(&completion("   ")),
            Err(ExtractionError::EmptyResponse)
        ));
        assert!(matches!(
            interpret(&RawResponse::Text(String::new())),
            Err(ExtractionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_alternate_shapes() {
        let legacy = RawResponse::Json(json!({"choices": [{"text": "[{\"text\":\"a\"}]"}]}));
        assert_eq!(interpret(&legacy).unwrap(), vec![json!({"text": "a"})]);

        let choice_content = RawResponse::Json(json!({"choices": [{"content": "[{\"text\":\"b\"}]"}]}));
        assert_eq!(interpret(&choice_content).unwrap(), vec![json!({"text": "b"})]);

        let top_level = RawResponse::Json(json!({"content": "[{\"text\":\"c\"}]"}));
        assert_eq!(interpret(&top_level).unwrap(), vec![json!({"text": "c"})]);

        let plain = RawResponse::Text("Tasks: [{\"text\":\"d\"}]".to_string());
        assert_eq!(interpret(&plain).unwrap(), vec![json!({"text": "d"})]);
    }

    #[test]
    fn test_structured_content_is_used_directly() {
        let structured = RawResponse::Json(json!({
            "choices": [{"message": {"content": [{"text": "a"}, {"text": "b"}]}}]
        }));
        assert_eq!(
            interpret(&structured).unwrap(),
            vec![json!({"text": "a"}), json!({"text": "b"})]
        );

        let bare_array = RawResponse::Json(json!([{"text": "e"}]));
        assert_eq!(interpret(&bare_array).unwrap(), vec![json!({"text": "e"})]);

        let bare_tasks = RawResponse::Json(json!({"tasks": [{"text": "f"}]}));
        assert_eq!(interpret(&bare_tasks).unwrap(), vec![json!({"text": "f"})]);
    }

    #[test]
    fn test_multimodal_text_parts_are_joined() {
        let parts = RawResponse::Json(json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "[{\"text\":"},
                {"type": "text", "text": "\"a\"}]"}
            ]}}]
        }));
        assert_eq!(interpret(&parts).unwrap(), vec![json!({"text": "a"})]);
    }
}
