//! Answer evaluation: the model scores each question/answer pair.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::interview::prompts::evaluation_prompt;
use crate::llm_client::normalize::normalize;
use crate::llm_client::ModelInvoker;
use crate::parsing::{parse_as_traced, ParseError, Shape};

pub const MAX_SCORE: u8 = 10;

/// A question paired with the user's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
}

/// Scored feedback for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,
    #[serde(default, alias = "comment", alias = "feedback")]
    pub comments: String,
}

/// Accepts `7`, `7.0` and `"7"`; anything outside 0..=10 is rejected.
fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match score {
        Some(s) if s <= u64::from(MAX_SCORE) => Ok(s as u8),
        _ => Err(de::Error::custom(format!(
            "score must be an integer from 0 to {MAX_SCORE}, got {value}"
        ))),
    }
}

/// Scores every answer in one model request.
///
/// The reply must hold exactly one entry per answer, in order. Entries that
/// omit the question or answer text get it filled in from the request.
pub async fn evaluate_answers(
    invoker: &dyn ModelInvoker,
    answers: &[AnswerRecord],
) -> Result<Vec<FeedbackEntry>, AppError> {
    if answers.is_empty() {
        return Err(AppError::Validation(
            "There are no questions to evaluate. Generate questions first.".to_string(),
        ));
    }

    let prompt = evaluation_prompt(answers).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to serialize answers: {e}"))
    })?;

    let output = invoker
        .invoke(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Error running evaluation agent: {e}")))?;

    let text = normalize(&output);
    let (mut feedback, candidate): (Vec<FeedbackEntry>, String) =
        parse_as_traced(&text, Shape::Feedback)?;

    if feedback.len() != answers.len() {
        return Err(ParseError::Schema {
            shape: Shape::Feedback,
            original: text,
            candidate,
            reason: format!(
                "expected {} feedback entries, got {}",
                answers.len(),
                feedback.len()
            ),
        }
        .into());
    }

    for (entry, record) in feedback.iter_mut().zip(answers) {
        if entry.question.is_empty() {
            entry.question = record.question.clone();
        }
        if entry.answer.is_empty() {
            entry.answer = record.answer.clone();
        }
    }

    info!(
        "Evaluated {} answers, average score {:.1}",
        feedback.len(),
        feedback.iter().map(|f| f64::from(f.score)).sum::<f64>() / feedback.len() as f64
    );

    Ok(feedback)
}
