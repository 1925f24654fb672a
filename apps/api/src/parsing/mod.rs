//! Tolerant structured-data parser: turns normalized model text into JSON
//! values and typed records.
//!
//! Model replies are not schema-guaranteed, so parsing runs a cascade of
//! increasingly permissive strategies:
//!
//! 1. strip a leading ```` ```lang ```` fence and a trailing ```` ``` ````
//! 2. list shapes only: narrow to the first `[` .. last `]`
//! 3. strict JSON
//! 4. permissive literal parse (single quotes, `True`/`None`, trailing commas)
//! 5. replace every `'` with `"` and retry strict JSON
//!
//! Step 5 corrupts apostrophes inside values that steps 3–4 could not rescue.
//! That is accepted behavior, kept for compatibility with existing prompts.

pub mod literal;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// The kind of record a model reply is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Profile,
    QuestionList,
    Feedback,
}

impl Shape {
    pub fn is_list(self) -> bool {
        matches!(self, Shape::QuestionList | Shape::Feedback)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Profile => "candidate profile",
            Shape::QuestionList => "question list",
            Shape::Feedback => "feedback list",
        };
        f.write_str(name)
    }
}

/// The cascade step that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StrictJson,
    Literal,
    QuoteRepair,
}

/// Raised only once every strategy is exhausted, or when the parsed value
/// does not fit the requested record type. Carries the normalized text and
/// the furthest-narrowed candidate for diagnostics.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not parse model output as a {shape}: {reason}")]
    Exhausted {
        shape: Shape,
        original: String,
        candidate: String,
        reason: String,
    },

    #[error("model output does not match the {shape} schema: {reason}")]
    Schema {
        shape: Shape,
        original: String,
        candidate: String,
        reason: String,
    },
}

impl ParseError {
    pub fn shape(&self) -> Shape {
        match self {
            ParseError::Exhausted { shape, .. } | ParseError::Schema { shape, .. } => *shape,
        }
    }

    pub fn original(&self) -> &str {
        match self {
            ParseError::Exhausted { original, .. } | ParseError::Schema { original, .. } => {
                original
            }
        }
    }

    pub fn candidate(&self) -> &str {
        match self {
            ParseError::Exhausted { candidate, .. } | ParseError::Schema { candidate, .. } => {
                candidate
            }
        }
    }
}

/// Runs the cascade and returns the parsed value.
#[allow(dead_code)] // untyped entry point; request handlers go through `parse_as`
pub fn parse(text: &str, shape: Shape) -> Result<Value, ParseError> {
    parse_traced(text, shape).map(|parsed| parsed.value)
}

/// Runs the cascade and deserializes the value into `T`.
/// A value of the wrong structure is a `ParseError::Schema`, never a partial record.
pub fn parse_as<T: DeserializeOwned>(text: &str, shape: Shape) -> Result<T, ParseError> {
    parse_as_traced(text, shape).map(|(value, _)| value)
}

/// Like `parse_as`, also returning the candidate text the value was parsed from,
/// for callers that run further checks on the record.
pub fn parse_as_traced<T: DeserializeOwned>(
    text: &str,
    shape: Shape,
) -> Result<(T, String), ParseError> {
    let parsed = parse_traced(text, shape)?;
    debug!("Parsed {} via {:?}", shape, parsed.strategy);
    match serde_json::from_value(parsed.value) {
        Ok(value) => Ok((value, parsed.candidate)),
        Err(e) => Err(ParseError::Schema {
            shape,
            original: text.to_string(),
            candidate: parsed.candidate,
            reason: e.to_string(),
        }),
    }
}

/// A successful cascade run: the value, the text it came from and the step
/// that parsed it.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub value: Value,
    pub candidate: String,
    pub strategy: Strategy,
}

pub fn parse_traced(text: &str, shape: Shape) -> Result<Parsed, ParseError> {
    let stripped = strip_fences(text);
    let candidate = if shape.is_list() {
        narrow_to_brackets(stripped)
    } else {
        stripped
    };

    let done = |value: Value, strategy: Strategy| {
        Ok(Parsed {
            value,
            candidate: candidate.to_string(),
            strategy,
        })
    };

    let json_err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return done(value, Strategy::StrictJson),
        Err(e) => e,
    };

    let literal_err = match literal::parse_literal(candidate) {
        Ok(value) => return done(value, Strategy::Literal),
        Err(e) => e,
    };

    let repaired = candidate.replace('\'', "\"");
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => done(value, Strategy::QuoteRepair),
        Err(repair_err) => Err(ParseError::Exhausted {
            shape,
            original: text.to_string(),
            candidate: candidate.to_string(),
            reason: format!(
                "strict JSON ({json_err}), literal ({literal_err}) and quote repair ({repair_err}) all failed"
            ),
        }),
    }
}

/// Removes a leading ```` ```lang ```` line and a trailing ```` ``` ````.
fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let after_tag = &rest[tag_len..];
        let after_newline = after_tag
            .strip_prefix("\r\n")
            .or_else(|| after_tag.strip_prefix('\n'));
        if let Some(body) = after_newline {
            text = body.trim();
        }
    }

    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Narrows to the outermost `[` .. `]` span, dropping surrounding prose.
fn narrow_to_brackets(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
