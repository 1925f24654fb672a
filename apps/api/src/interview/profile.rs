//! Candidate profile: structured record extracted from resume text.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::interview::prompts::profile_prompt;
use crate::llm_client::normalize::normalize;
use crate::llm_client::ModelInvoker;
use crate::parsing::{parse_as, Shape};

/// A profile value: free text or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileField {
    Text(String),
    List(Vec<String>),
}

/// Models often return list items as objects (`{"company": .., "role": ..}`)
/// or bare numbers. Those are kept as their compact JSON text so the field
/// stays a string or a list of strings. `null` is rejected.
impl<'de> Deserialize<'de> for ProfileField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Err(de::Error::custom(
                "expected a string or a list of strings, found null",
            )),
            Value::String(s) => Ok(ProfileField::Text(s)),
            Value::Array(items) => Ok(ProfileField::List(
                items
                    .into_iter()
                    .filter(|item| !item.is_null())
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            other => Ok(ProfileField::Text(other.to_string())),
        }
    }
}

/// Structured candidate record. Created once per resume parse and never
/// mutated; uploading a new resume discards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: ProfileField,
    pub email: ProfileField,
    pub experience: ProfileField,
    pub projects: ProfileField,
    pub education: ProfileField,
    pub skills: ProfileField,
    pub extracurricular: ProfileField,
    #[serde(default)]
    pub achievements: Option<ProfileField>,
    #[serde(default)]
    pub certifications: Option<ProfileField>,
}

/// Asks the model to parse `resume_text` and returns the validated profile.
pub async fn extract_profile(
    invoker: &dyn ModelInvoker,
    resume_text: &str,
) -> Result<CandidateProfile, AppError> {
    let output = invoker
        .invoke(&profile_prompt(resume_text))
        .await
        .map_err(|e| AppError::Llm(format!("Error running resume parser agent: {e}")))?;

    let profile: CandidateProfile = parse_as(&normalize(&output), Shape::Profile)?;
    info!("Parsed candidate profile");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedInvoker;
    use crate::llm_client::{LlmError, RawModelOutput};

    const PROFILE_JSON: &str = r#"{
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "experience": [{"company": "Babbage & Co", "role": "Analyst"}],
        "projects": ["Bernoulli numbers program"],
        "education": "Private tutoring",
        "skills": ["Mathematics", "Python"],
        "extracurricular": "Poetry",
        "achievements": null
    }"#;

    #[test]
    fn test_profile_fields_accept_text_and_lists() {
        let profile: CandidateProfile = serde_json::from_str(PROFILE_JSON).unwrap();
        assert_eq!(profile.name, ProfileField::Text("Ada Lovelace".to_string()));
        assert_eq!(
            profile.skills,
            ProfileField::List(vec!["Mathematics".to_string(), "Python".to_string()])
        );
        assert_eq!(
            profile.experience,
            ProfileField::List(vec![r#"{"company":"Babbage & Co","role":"Analyst"}"#.to_string()])
        );
        assert!(profile.achievements.is_none());
        assert!(profile.certifications.is_none());
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let json = r#"{"name": "Ada", "email": "ada@example.com"}"#;
        assert!(serde_json::from_str::<CandidateProfile>(json).is_err());
    }

    #[test]
    fn test_null_required_key_is_rejected() {
        let mut value: Value = serde_json::from_str(PROFILE_JSON).unwrap();
        value["email"] = Value::Null;
        assert!(serde_json::from_value::<CandidateProfile>(value).is_err());
    }

    #[tokio::test]
    async fn test_extract_profile_from_fenced_reply() {
        let invoker = ScriptedInvoker::texts([format!("```json\n{PROFILE_JSON}\n```")]);
        let profile = extract_profile(&invoker, "Ada Lovelace ...").await.unwrap();
        assert_eq!(profile.email, ProfileField::Text("ada@example.com".to_string()));

        let prompts = invoker.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].description.ends_with("Ada Lovelace ..."));
    }

    #[tokio::test]
    async fn test_extract_profile_from_python_style_reply() {
        let reply = "{'name': 'Ada', 'email': 'ada@example.com', 'experience': [], \
            'projects': [], 'education': 'Tutoring', 'skills': ['Math'], \
            'extracurricular': 'Poetry', 'certifications': None}";
        let invoker = ScriptedInvoker::texts([reply]);
        let profile = extract_profile(&invoker, "resume").await.unwrap();
        assert_eq!(profile.experience, ProfileField::List(vec![]));
        assert!(profile.certifications.is_none());
    }

    #[tokio::test]
    async fn test_extract_profile_reads_envelope_output() {
        let invoker = ScriptedInvoker::new(vec![Ok(RawModelOutput::Envelope {
            result: None,
            output: Some(serde_json::from_str(PROFILE_JSON).unwrap()),
            raw: String::new(),
        })]);
        let profile = extract_profile(&invoker, "resume").await.unwrap();
        assert_eq!(profile.name, ProfileField::Text("Ada Lovelace".to_string()));
    }

    #[tokio::test]
    async fn test_invocation_failure_is_llm_error() {
        let invoker = ScriptedInvoker::new(vec![Err(LlmError::RateLimited { retries: 3 })]);
        let err = extract_profile(&invoker, "resume").await.unwrap_err();
        match err {
            AppError::Llm(msg) => assert!(msg.contains("resume parser agent")),
            other => panic!("expected Llm error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_parse_error() {
        let invoker = ScriptedInvoker::texts(["Sorry, I could not read that resume."]);
        let err = extract_profile(&invoker, "resume").await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }
}
