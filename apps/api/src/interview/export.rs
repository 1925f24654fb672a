//! CSV export of evaluated answers.

use crate::interview::evaluation::FeedbackEntry;

pub const CSV_FILE_NAME: &str = "interview_results.csv";
const CSV_HEADER: [&str; 4] = ["Question", "Answer", "Score", "Comments"];

/// Renders feedback as UTF-8 CSV with a header row, one row per entry.
pub fn feedback_to_csv(feedback: &[FeedbackEntry]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for entry in feedback {
        writer.write_record([
            entry.question.as_str(),
            entry.answer.as_str(),
            entry.score.to_string().as_str(),
            entry.comments.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
