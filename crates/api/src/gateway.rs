use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use course_core::Clock;
use course_core::model::{
    Activity, ActivityId, AnswerSheet, GradedOutcome, OptionId, QuestionFeedback, QuestionId,
    UserId,
};

/// Errors surfaced by backend gateways.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("network error: {0}")]
    Network(String),

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// The authenticated identity supplied by the ambient session.
///
/// Read-only from the engine's perspective; it is never stored inside an
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: String,
}

impl UserIdentity {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One answered question inside a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub chosen_option_id: OptionId,
}

/// The payload posted to the grading endpoint: who answered what, where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub answers: Vec<SubmittedAnswer>,
}

impl Submission {
    /// Builds the payload from an answer sheet, one entry per answered
    /// question in question-id order.
    #[must_use]
    pub fn from_sheet(user_id: UserId, activity_id: ActivityId, sheet: &AnswerSheet) -> Self {
        Self {
            user_id,
            activity_id,
            answers: sheet
                .entries()
                .map(|(question_id, chosen_option_id)| SubmittedAnswer {
                    question_id,
                    chosen_option_id,
                })
                .collect(),
        }
    }
}

//
// ─── GATEWAY CONTRACTS ─────────────────────────────────────────────────────────
//

/// Read access to activities and their question sets.
#[async_trait]
pub trait ActivityGateway: Send + Sync {
    /// Fetch an activity with its ordered questions and options.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids, `ApiError::Network` for
    /// transport failures.
    async fn activity(&self, id: ActivityId) -> Result<Activity, ApiError>;
}

/// Ambient authenticated-session lookup.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// The currently signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when nobody is signed in.
    async fn current_user(&self) -> Result<UserIdentity, ApiError>;
}

/// Submission of a completed answer set for grading.
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Post the answer set and return the graded outcome.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the backend refuses the submission,
    /// `ApiError::Network` for transport failures.
    async fn submit_answers(&self, submission: &Submission) -> Result<GradedOutcome, ApiError>;
}

/// Aggregates the three gateways behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Gateways {
    pub activities: Arc<dyn ActivityGateway>,
    pub session: Arc<dyn SessionGateway>,
    pub progress: Arc<dyn ProgressGateway>,
}

impl Gateways {
    #[must_use]
    pub fn in_memory(gateway: InMemoryGateway) -> Self {
        let activities: Arc<dyn ActivityGateway> = Arc::new(gateway.clone());
        let session: Arc<dyn SessionGateway> = Arc::new(gateway.clone());
        let progress: Arc<dyn ProgressGateway> = Arc::new(gateway);
        Self {
            activities,
            session,
            progress,
        }
    }
}

//
// ─── IN-MEMORY GATEWAY ─────────────────────────────────────────────────────────
//

#[derive(Clone)]
struct AnswerKeyEntry {
    correct_option: OptionId,
    explanation: Option<String>,
}

/// In-memory gateway for tests and prototyping.
///
/// Holds activities, an answer key, and the signed-in user, and grades
/// submissions the way the backend does: percentage score, error count, and
/// one feedback entry per question.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    clock: Clock,
    activities: Arc<Mutex<HashMap<ActivityId, Activity>>>,
    answer_key: Arc<Mutex<HashMap<(ActivityId, QuestionId), AnswerKeyEntry>>>,
    user: Arc<Mutex<Option<UserIdentity>>>,
    submissions: Arc<Mutex<Vec<Submission>>>,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Makes an activity fetchable by id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert_activity(&self, activity: Activity) {
        self.activities
            .lock()
            .expect("activities lock")
            .insert(activity.id(), activity);
    }

    /// Records the correct option (and optional explanation) for a question.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_answer_key(
        &self,
        activity: ActivityId,
        question: QuestionId,
        correct_option: OptionId,
        explanation: Option<&str>,
    ) {
        self.answer_key.lock().expect("answer key lock").insert(
            (activity, question),
            AnswerKeyEntry {
                correct_option,
                explanation: explanation.map(str::to_owned),
            },
        );
    }

    /// Signs a user in; `current_user` succeeds afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn sign_in(&self, user: UserIdentity) {
        *self.user.lock().expect("user lock") = Some(user);
    }

    /// Signs the user out; `current_user` fails afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn sign_out(&self) {
        *self.user.lock().expect("user lock") = None;
    }

    /// Number of submissions that reached this gateway.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().expect("submissions lock").len()
    }
}

#[async_trait]
impl ActivityGateway for InMemoryGateway {
    async fn activity(&self, id: ActivityId) -> Result<Activity, ApiError> {
        let guard = self
            .activities
            .lock()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        guard.get(&id).cloned().ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl SessionGateway for InMemoryGateway {
    async fn current_user(&self) -> Result<UserIdentity, ApiError> {
        let guard = self
            .user
            .lock()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        guard.clone().ok_or(ApiError::Unauthenticated)
    }
}

#[async_trait]
impl ProgressGateway for InMemoryGateway {
    async fn submit_answers(&self, submission: &Submission) -> Result<GradedOutcome, ApiError> {
        let activity = {
            let guard = self
                .activities
                .lock()
                .map_err(|e| ApiError::Network(e.to_string()))?;
            guard
                .get(&submission.activity_id)
                .cloned()
                .ok_or(ApiError::NotFound)?
        };

        self.submissions
            .lock()
            .map_err(|e| ApiError::Network(e.to_string()))?
            .push(submission.clone());

        let key = self
            .answer_key
            .lock()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let mut correct = 0_u32;
        let mut feedback = Vec::with_capacity(activity.question_count());
        for question in activity.questions() {
            let entry = key
                .get(&(submission.activity_id, question.id()))
                .ok_or_else(|| {
                    ApiError::Rejected(format!("no answer key for question {}", question.id()))
                })?;
            let chosen = submission
                .answers
                .iter()
                .find(|a| a.question_id == question.id())
                .map(|a| a.chosen_option_id);
            let hit = chosen == Some(entry.correct_option);
            if hit {
                correct += 1;
            }
            feedback.push(QuestionFeedback::new(
                question.id(),
                hit,
                entry.correct_option,
                entry.explanation.clone(),
            ));
        }

        let total = u32::try_from(activity.question_count())
            .map_err(|_| ApiError::Rejected("too many questions".to_string()))?;
        let score = if total == 0 { 0 } else { correct * 100 / total };

        GradedOutcome::new(score, total - correct, self.clock.now(), feedback)
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
