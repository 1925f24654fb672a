//! Model-output normalizer: flattens whatever the model layer returned into
//! one text blob for the tolerant parser.

use serde_json::Value;

use super::RawModelOutput;

/// Returns the best-effort textual form of `output`.
///
/// Precedence (first match wins):
/// 1. `result` accessor: text verbatim, list/mapping as JSON text
/// 2. `output` accessor: same rule
/// 3. the output itself is a list/mapping: JSON text
/// 4. the generic string representation
///
/// Plain text passes through unchanged, so normalizing is idempotent.
pub fn normalize(output: &RawModelOutput) -> String {
    match output {
        RawModelOutput::Text(text) => text.clone(),
        RawModelOutput::Json(value) => {
            accessor_text(value).unwrap_or_else(|| scalar_repr(value))
        }
        RawModelOutput::Envelope {
            result,
            output,
            raw,
        } => result
            .as_ref()
            .and_then(accessor_text)
            .or_else(|| output.as_ref().and_then(accessor_text))
            .unwrap_or_else(|| raw.clone()),
    }
}

/// Text for a value read through an accessor; `None` for anything that is
/// neither text nor a list/mapping, so the caller falls through.
fn accessor_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

fn scalar_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_identity() {
        for text in ["", "hello", "```json\n[1, 2]\n```", "{'a': 1}"] {
            let raw = RawModelOutput::Text(text.to_string());
            assert_eq!(normalize(&raw), text);
        }
    }

    #[test]
    fn test_normalizing_normalized_text_is_stable() {
        let raw = RawModelOutput::Json(json!({"name": "Ada", "skills": ["Rust"]}));
        let once = normalize(&raw);
        let twice = normalize(&RawModelOutput::Text(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_list_and_mapping_round_trip_through_json() {
        let values = [
            json!([{"question": "Explain ownership"}, {"question": "What is Send?"}]),
            json!({"name": "Ada", "email": "ada@example.com", "skills": ["Rust", "SQL"]}),
            json!([]),
        ];
        for value in values {
            let text = normalize(&RawModelOutput::Json(value.clone()));
            let back: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_result_accessor_text_is_verbatim() {
        let raw = RawModelOutput::Envelope {
            result: Some(json!("  [{'question': 'Q'}]  ")),
            output: Some(json!("ignored")),
            raw: "ignored".to_string(),
        };
        assert_eq!(normalize(&raw), "  [{'question': 'Q'}]  ");
    }

    #[test]
    fn test_result_accessor_list_is_serialized() {
        let raw = RawModelOutput::Envelope {
            result: Some(json!([{"question": "Q"}])),
            output: None,
            raw: "repr".to_string(),
        };
        assert_eq!(normalize(&raw), r#"[{"question":"Q"}]"#);
    }

    #[test]
    fn test_output_accessor_used_when_result_absent() {
        let raw = RawModelOutput::Envelope {
            result: None,
            output: Some(json!({"score": 7})),
            raw: "repr".to_string(),
        };
        assert_eq!(normalize(&raw), r#"{"score":7}"#);
    }

    #[test]
    fn test_non_text_result_falls_through_to_output() {
        let raw = RawModelOutput::Envelope {
            result: Some(Value::Null),
            output: Some(json!("from output")),
            raw: "repr".to_string(),
        };
        assert_eq!(normalize(&raw), "from output");
    }

    #[test]
    fn test_envelope_without_usable_accessors_uses_repr() {
        let raw = RawModelOutput::Envelope {
            result: Some(json!(42)),
            output: None,
            raw: "CrewOutput(raw='[]')".to_string(),
        };
        assert_eq!(normalize(&raw), "CrewOutput(raw='[]')");
    }

    #[test]
    fn test_json_scalars_use_their_string_form() {
        assert_eq!(normalize(&RawModelOutput::Json(json!("text"))), "text");
        assert_eq!(normalize(&RawModelOutput::Json(json!(3))), "3");
        assert_eq!(normalize(&RawModelOutput::Json(json!(true))), "true");
    }
}
