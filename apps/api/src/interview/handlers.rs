//! Axum route handlers for the interview session API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract, DocumentFormat};
use crate::interview::evaluation::{evaluate_answers, FeedbackEntry};
use crate::interview::export::{feedback_to_csv, CSV_FILE_NAME};
use crate::interview::profile::{extract_profile, CandidateProfile};
use crate::interview::questions::{generate_questions, JobDetails, Question};
use crate::session::Session;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_JOB_POSITION: &str = "Data Scientist";
const DEFAULT_JOB_DESCRIPTION: &str = "We are seeking a Data Scientist with strong experience \
    in Python, machine learning, and data analysis. The candidate should be able to build \
    predictive models, work with large datasets, and communicate insights effectively.";
const DEFAULT_NUM_QUESTIONS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ResumeUploadResponse {
    pub session_id: Uuid,
    pub file_name: Option<String>,
    pub format: DocumentFormat,
    pub resume_text: String,
    /// Set when the document could not be read; `resume_text` is then empty.
    pub extraction_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: CandidateProfile,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuestionsRequest {
    #[serde(default = "default_job_position")]
    pub job_position: String,
    #[serde(default = "default_job_description")]
    pub job_description: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
}

fn default_job_position() -> String {
    DEFAULT_JOB_POSITION.to_string()
}

fn default_job_description() -> String {
    DEFAULT_JOB_DESCRIPTION.to_string()
}

fn default_num_questions() -> usize {
    DEFAULT_NUM_QUESTIONS
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback: Vec<FeedbackEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.sessions.get(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/resume
///
/// Multipart upload with a `file` field. An unreadable document is reported in
/// `extraction_error` and stored as empty text; the request still succeeds.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    state.sessions.get(id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let (file_name, content_type, bytes) = upload.ok_or_else(|| {
        AppError::Validation(format!("Multipart field '{UPLOAD_FIELD}' is required"))
    })?;

    let format = DocumentFormat::from_mime(content_type.as_deref());
    let extracted = tokio::task::spawn_blocking(move || extract(&bytes, format))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Extraction task failed: {e}")))?;

    let (resume_text, extraction_error) = match extracted {
        Ok(text) => (text, None),
        Err(e) => {
            warn!("Resume extraction failed for session {id}: {e}");
            (String::new(), Some(e.to_string()))
        }
    };

    state
        .sessions
        .update(id, |s| {
            s.set_resume(resume_text.clone());
            Ok(())
        })
        .await?;

    info!(
        "Session {id}: stored {:?} resume ({} chars)",
        format,
        resume_text.chars().count()
    );

    Ok(Json(ResumeUploadResponse {
        session_id: id,
        file_name,
        format,
        resume_text,
        extraction_error,
    }))
}

/// POST /api/v1/sessions/:id/profile
pub async fn handle_parse_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let resume_text = session.resume_text.ok_or_else(|| {
        AppError::Validation("Upload a resume before parsing the profile".to_string())
    })?;

    let profile = extract_profile(state.invoker.as_ref(), &resume_text).await?;

    state
        .sessions
        .update(id, |s| {
            s.ensure_revision(session.revision)?;
            s.set_profile(profile.clone());
            Ok(())
        })
        .await?;

    Ok(Json(ProfileResponse { profile }))
}

/// POST /api/v1/sessions/:id/questions
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateQuestionsRequest>,
) -> Result<Json<QuestionsResponse>, AppError> {
    if request.job_position.trim().is_empty() {
        return Err(AppError::Validation(
            "job_position cannot be empty".to_string(),
        ));
    }

    let session = state.sessions.get(id).await?;
    let profile = session.profile.ok_or_else(|| {
        AppError::Validation("Parse the resume profile before generating questions".to_string())
    })?;

    let job = JobDetails {
        job_position: request.job_position,
        job_description: request.job_description,
    };
    let questions = generate_questions(
        state.invoker.as_ref(),
        &profile,
        &job,
        request.num_questions,
        state.config.question_batch_pause,
    )
    .await?;

    state
        .sessions
        .update(id, |s| {
            s.ensure_revision(session.revision)?;
            s.set_questions(questions.clone());
            Ok(())
        })
        .await?;

    info!("Session {id}: {} questions generated", questions.len());
    Ok(Json(QuestionsResponse { questions }))
}

/// PUT /api/v1/sessions/:id/answers
pub async fn handle_submit_answers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAnswersRequest>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .update(id, |s| s.set_answers(request.answers))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let records = session.answer_records();

    let feedback = evaluate_answers(state.invoker.as_ref(), &records).await?;

    state
        .sessions
        .update(id, |s| {
            s.ensure_revision(session.revision)?;
            if s.answer_records() != records {
                return Err(AppError::Validation(
                    "Answers changed during evaluation. Please evaluate again.".to_string(),
                ));
            }
            s.set_feedback(feedback.clone());
            Ok(())
        })
        .await?;

    Ok(Json(FeedbackResponse { feedback }))
}

/// GET /api/v1/sessions/:id/export.csv
pub async fn handle_export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(id).await?;
    let feedback = session.feedback.ok_or_else(|| {
        AppError::NotFound(format!("Session {id} has no evaluation results yet"))
    })?;

    let csv = feedback_to_csv(&feedback)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}
