use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use course_core::model::{
    Activity, ActivityId, AnswerOption, CourseId, GradedOutcome, OptionId, Question,
    QuestionFeedback, QuestionId, QuestionKind, UserId,
};

use crate::gateway::{
    ActivityGateway, ApiError, ProgressGateway, SessionGateway, Submission, UserIdentity,
};

/// Wire tag for questions answered by picking one option.
const KIND_SINGLE_CHOICE: &str = "SINGLE_CHOICE";

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Connection settings for the course platform backend.
///
/// The request timeout is optional: the backend contract imposes none,
/// so callers opt in rather than inheriting an invented default.
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: Url,
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl RestConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            bearer_token: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reads `COURSE_API_BASE_URL` (required), `COURSE_API_TOKEN`, and
    /// `COURSE_API_TIMEOUT_SECS` from the environment.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let raw = env::var("COURSE_API_BASE_URL").ok()?;
        let base_url = match Url::parse(&raw) {
            Ok(url) => url,
            Err(err) => {
                warn!("ignoring malformed COURSE_API_BASE_URL: {err}");
                return None;
            }
        };

        let mut config = Self::new(base_url);
        if let Ok(token) = env::var("COURSE_API_TOKEN") {
            if !token.trim().is_empty() {
                config = config.with_bearer_token(token);
            }
        }
        if let Ok(secs) = env::var("COURSE_API_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config = config.with_timeout(Duration::from_secs(secs)),
                _ => warn!("ignoring malformed COURSE_API_TIMEOUT_SECS: {secs}"),
            }
        }
        Some(config)
    }
}

//
// ─── REST GATEWAY ──────────────────────────────────────────────────────────────
//

/// Gateway implementation over the platform's REST endpoints.
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    config: RestConfig,
}

impl RestGateway {
    /// Builds the HTTP client, applying the configured timeout if any.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the client cannot be constructed.
    pub fn new(config: RestConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn read_error(status: StatusCode) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthenticated,
        status => ApiError::Network(format!("unexpected status {status}")),
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[async_trait]
impl ActivityGateway for RestGateway {
    async fn activity(&self, id: ActivityId) -> Result<Activity, ApiError> {
        let url = self.endpoint(&format!("activities/{id}"));
        debug!("fetching activity {id}");
        let response = self.authorize(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("activity {id} fetch failed with status {status}");
            return Err(read_error(status));
        }

        let body: ActivityDto = response.json().await?;
        body.into_domain()
    }
}

#[async_trait]
impl SessionGateway for RestGateway {
    async fn current_user(&self) -> Result<UserIdentity, ApiError> {
        let url = self.endpoint("users/me");
        let response = self.authorize(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_error(status));
        }

        let body: UserDto = response.json().await?;
        Ok(UserIdentity::new(UserId::new(body.id), body.name))
    }
}

#[async_trait]
impl ProgressGateway for RestGateway {
    async fn submit_answers(&self, submission: &Submission) -> Result<GradedOutcome, ApiError> {
        let url = self.endpoint("progress");
        let payload = SubmissionDto::from_submission(submission);
        debug!(
            "submitting {} answers for activity {}",
            payload.answers.len(),
            submission.activity_id
        );
        let response = self
            .authorize(self.client.post(url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("submission for activity {} failed with status {status}", submission.activity_id);
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(ApiError::Unauthenticated);
            }
            // The backend reports rejection reasons as { "message": … }.
            let message = response
                .json::<ErrorBodyDto>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("the submission was not accepted ({status})"));
            return Err(ApiError::Rejected(message));
        }

        let body: OutcomeDto = response.json().await?;
        body.into_domain()
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityDto {
    id: u64,
    name: String,
    #[serde(default)]
    course_id: Option<u64>,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    id: u64,
    prompt: String,
    kind: String,
    #[serde(default)]
    options: Vec<OptionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionDto {
    id: u64,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionDto {
    user_id: u64,
    activity_id: u64,
    answers: Vec<SubmittedAnswerDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedAnswerDto {
    question_id: u64,
    chosen_option_id: u64,
    // Reserved for free-text question types; always null for single-choice.
    text_response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeDto {
    score: u32,
    error_count: u32,
    completed_at: DateTime<Utc>,
    #[serde(default)]
    feedback: Vec<FeedbackDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackDto {
    question_id: u64,
    correct: bool,
    correct_option_id: u64,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBodyDto {
    message: Option<String>,
}

impl ActivityDto {
    fn into_domain(self) -> Result<Activity, ApiError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionDto::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Activity::new(
            ActivityId::new(self.id),
            self.name,
            self.course_id.map(CourseId::new),
            questions,
        )
        .map_err(invalid_payload)
    }
}

impl QuestionDto {
    fn into_domain(self) -> Result<Question, ApiError> {
        let kind = if self.kind == KIND_SINGLE_CHOICE {
            QuestionKind::SingleChoice
        } else {
            QuestionKind::Unsupported
        };
        let options = self
            .options
            .into_iter()
            .map(|o| AnswerOption::new(OptionId::new(o.id), o.text))
            .collect();
        Question::new(QuestionId::new(self.id), self.prompt, kind, options)
            .map_err(invalid_payload)
    }
}

impl SubmissionDto {
    fn from_submission(submission: &Submission) -> Self {
        Self {
            user_id: submission.user_id.value(),
            activity_id: submission.activity_id.value(),
            answers: submission
                .answers
                .iter()
                .map(|a| SubmittedAnswerDto {
                    question_id: a.question_id.value(),
                    chosen_option_id: a.chosen_option_id.value(),
                    text_response: None,
                })
                .collect(),
        }
    }
}

impl OutcomeDto {
    fn into_domain(self) -> Result<GradedOutcome, ApiError> {
        let feedback = self
            .feedback
            .into_iter()
            .map(|f| {
                QuestionFeedback::new(
                    QuestionId::new(f.question_id),
                    f.correct,
                    OptionId::new(f.correct_option_id),
                    f.explanation,
                )
            })
            .collect();
        GradedOutcome::new(self.score, self.error_count, self.completed_at, feedback)
            .map_err(invalid_payload)
    }
}

fn invalid_payload(err: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_dto_maps_into_domain() {
        let dto: ActivityDto = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Intro Quiz",
            "courseId": 9,
            "questions": [
                {
                    "id": 10,
                    "prompt": "Pick one",
                    "kind": "SINGLE_CHOICE",
                    "options": [
                        { "id": 100, "text": "a" },
                        { "id": 101, "text": "b" }
                    ]
                }
            ]
        }))
        .unwrap();

        let activity = dto.into_domain().unwrap();
        assert_eq!(activity.id(), ActivityId::new(1));
        assert_eq!(activity.course_id(), Some(CourseId::new(9)));
        let question = activity.question(QuestionId::new(10)).unwrap();
        assert_eq!(question.kind(), QuestionKind::SingleChoice);
        assert_eq!(question.options().len(), 2);
    }

    #[test]
    fn unknown_question_kind_degrades_to_unsupported() {
        let dto: QuestionDto = serde_json::from_value(serde_json::json!({
            "id": 10,
            "prompt": "Write an essay",
            "kind": "FREE_TEXT"
        }))
        .unwrap();

        let question = dto.into_domain().unwrap();
        assert_eq!(question.kind(), QuestionKind::Unsupported);
        assert!(!question.selectable());
    }

    #[test]
    fn duplicate_wire_ids_are_invalid_payload() {
        let dto: ActivityDto = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Broken Quiz",
            "questions": [
                { "id": 10, "prompt": "One", "kind": "SINGLE_CHOICE", "options": [] },
                { "id": 10, "prompt": "Two", "kind": "SINGLE_CHOICE", "options": [] }
            ]
        }))
        .unwrap();

        let err = dto.into_domain().unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[test]
    fn outcome_dto_maps_into_domain() {
        let dto: OutcomeDto = serde_json::from_value(serde_json::json!({
            "score": 50,
            "errorCount": 1,
            "completedAt": "2025-06-15T12:26:40Z",
            "feedback": [
                { "questionId": 10, "correct": true, "correctOptionId": 100 },
                {
                    "questionId": 11,
                    "correct": false,
                    "correctOptionId": 103,
                    "explanation": "See chapter 2."
                }
            ]
        }))
        .unwrap();

        let outcome = dto.into_domain().unwrap();
        assert_eq!(outcome.score(), 50);
        assert_eq!(outcome.error_count(), 1);
        let second = outcome.feedback_for(QuestionId::new(11)).unwrap();
        assert_eq!(second.explanation.as_deref(), Some("See chapter 2."));
    }

    #[test]
    fn submission_dto_serializes_camel_case_with_null_text() {
        let submission = Submission {
            user_id: UserId::new(7),
            activity_id: ActivityId::new(1),
            answers: vec![crate::gateway::SubmittedAnswer {
                question_id: QuestionId::new(10),
                chosen_option_id: OptionId::new(100),
            }],
        };

        let value = serde_json::to_value(SubmissionDto::from_submission(&submission)).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["activityId"], 1);
        assert_eq!(value["answers"][0]["questionId"], 10);
        assert_eq!(value["answers"][0]["chosenOptionId"], 100);
        assert!(value["answers"][0]["textResponse"].is_null());
    }

    #[test]
    fn status_codes_map_onto_the_error_taxonomy() {
        assert!(matches!(
            read_error(StatusCode::NOT_FOUND),
            ApiError::NotFound
        ));
        assert!(matches!(
            read_error(StatusCode::UNAUTHORIZED),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            read_error(StatusCode::FORBIDDEN),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            read_error(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Network(_)
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = RestConfig::new(Url::parse("https://api.example.com/v1/").unwrap());
        let gateway = RestGateway::new(config).unwrap();
        assert_eq!(
            gateway.endpoint("activities/3"),
            "https://api.example.com/v1/activities/3"
        );
    }
}
