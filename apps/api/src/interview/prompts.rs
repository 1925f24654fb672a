// Prompt specs for the three model requests: profile extraction, question
// generation and answer evaluation.

use serde::Serialize;

use crate::interview::evaluation::AnswerRecord;
use crate::interview::profile::CandidateProfile;
use crate::interview::questions::JobDetails;
use crate::llm_client::PromptSpec;

const PROFILE_KEYS: &str =
    "name, email, experience, projects, education, skills, extracurricular, achievements, certifications";

/// Resume text → candidate profile.
pub fn profile_prompt(resume_text: &str) -> PromptSpec {
    PromptSpec {
        role: "Resume Parser".to_string(),
        goal: "Extract structured candidate information from resume text".to_string(),
        backstory: "You are an expert at reading resumes and extracting key candidate \
            details for interview preparation."
            .to_string(),
        description: format!(
            "Parse the following resume and extract {PROFILE_KEYS} as JSON:\n{resume_text}"
        ),
        expected_output: format!("A JSON object with keys: {PROFILE_KEYS}."),
    }
}

/// Profile + job → `count` interview questions.
pub fn questions_prompt(
    profile: &CandidateProfile,
    job: &JobDetails,
    count: usize,
) -> Result<PromptSpec, serde_json::Error> {
    let profile_json = serde_json::to_string(profile)?;
    Ok(PromptSpec {
        role: "Interview Question Generator".to_string(),
        goal: "Generate technical, behavioral, situational interview questions based on \
            candidate profile and job description"
            .to_string(),
        backstory: "You are an expert interviewer who creates relevant questions for \
            candidates based on the job they are applying for."
            .to_string(),
        description: format!(
            "You are preparing for an interview for the position of '{position}'.\n\
             Job Description: {description}\n\
             Based on the following candidate profile, generate {count} technical interview \
             questions relevant to their experience, skills, and projects, and the job \
             description above. The goal is to assess the candidate's skills, experience, \
             and suitability for the role. \
             Return ONLY a JSON list of objects with the key 'question'.\n\
             Candidate Profile:\n{profile_json}",
            position = job.job_position,
            description = job.job_description,
        ),
        expected_output: "A JSON list of objects with the key 'question'.".to_string(),
    })
}

#[derive(Serialize)]
struct QaPair<'a> {
    question: &'a str,
    answer: &'a str,
}

/// Question/answer pairs → scored feedback.
pub fn evaluation_prompt(answers: &[AnswerRecord]) -> Result<PromptSpec, serde_json::Error> {
    let pairs: Vec<QaPair<'_>> = answers
        .iter()
        .map(|a| QaPair {
            question: &a.question,
            answer: &a.answer,
        })
        .collect();
    // serde_json leaves non-ASCII characters unescaped.
    let pairs_json = serde_json::to_string(&pairs)?;

    Ok(PromptSpec {
        role: "Answer Evaluation Agent".to_string(),
        goal: "Evaluate candidate answers and provide feedback using LLM".to_string(),
        backstory: "You are an expert technical interviewer who scores and comments on \
            candidate answers."
            .to_string(),
        description: format!(
            "You are an expert technical interviewer. For each question and answer pair \
             below, provide a score (0-10) and a short feedback comment. \
             Return ONLY a JSON list of objects with keys: question, answer, score, comments.\n\
             Q&A Pairs: {pairs_json}"
        ),
        expected_output: "A JSON list of objects with keys: question, answer, score, comments."
            .to_string(),
    })
}
