//! Question generation: batched model requests tailored to a profile and a job.
//!
//! Requests larger than `QUESTION_BATCH_SIZE` are split into sequential
//! sub-requests. Each batch is normalized and parsed on its own, and results
//! are concatenated in batch order. A short pause between batches eases
//! upstream rate limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::profile::CandidateProfile;
use crate::interview::prompts::questions_prompt;
use crate::llm_client::normalize::normalize;
use crate::llm_client::ModelInvoker;
use crate::parsing::{parse_as, Shape};

/// Questions per model request.
pub const QUESTION_BATCH_SIZE: usize = 10;
pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 30;

/// A single interview question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuestionRepr")]
pub struct Question {
    pub question: String,
}

/// Accepts `{"question": ".."}` and, from less obedient models, a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionRepr {
    Object { question: String },
    Bare(String),
}

impl From<QuestionRepr> for Question {
    fn from(repr: QuestionRepr) -> Self {
        match repr {
            QuestionRepr::Object { question } | QuestionRepr::Bare(question) => {
                Question { question }
            }
        }
    }
}

/// The role the candidate is preparing for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub job_position: String,
    pub job_description: String,
}

/// Splits `total` into batch sizes of at most `QUESTION_BATCH_SIZE`, in order.
pub fn plan_batches(total: usize) -> Vec<usize> {
    (0..total)
        .step_by(QUESTION_BATCH_SIZE)
        .map(|start| QUESTION_BATCH_SIZE.min(total - start))
        .collect()
}

/// Generates `total` questions in sequential batches.
///
/// Any failing batch aborts the whole request; no partial list is returned.
pub async fn generate_questions(
    invoker: &dyn ModelInvoker,
    profile: &CandidateProfile,
    job: &JobDetails,
    total: usize,
    pause: Duration,
) -> Result<Vec<Question>, AppError> {
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&total) {
        return Err(AppError::Validation(format!(
            "num_questions must be between {MIN_QUESTIONS} and {MAX_QUESTIONS}, got {total}"
        )));
    }

    let batches = plan_batches(total);
    let mut questions = Vec::with_capacity(total);
    let mut start = 0;

    for (index, &batch_size) in batches.iter().enumerate() {
        if index > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let prompt = questions_prompt(profile, job, batch_size).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}"))
        })?;

        let output = invoker.invoke(&prompt).await.map_err(|e| {
            AppError::Llm(format!("Error running question generator agent: {e}"))
        })?;

        let batch: Vec<Question> = parse_as(&normalize(&output), Shape::QuestionList)?;
        if batch.len() != batch_size {
            warn!(
                "Question batch {}/{} asked for {} questions, model returned {}",
                index + 1,
                batches.len(),
                batch_size,
                batch.len()
            );
        }
        info!(
            "Generated questions {}-{} ({}/{} batches)",
            start + 1,
            start + batch_size,
            index + 1,
            batches.len()
        );

        start += batch_size;
        questions.extend(batch);
    }

    Ok(questions)
}
