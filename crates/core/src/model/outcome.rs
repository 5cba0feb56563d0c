use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("duplicate feedback for question {0}")]
    DuplicateFeedback(QuestionId),
}

/// Graded verdict for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFeedback {
    pub question_id: QuestionId,
    pub correct: bool,
    pub correct_option_id: OptionId,
    pub explanation: Option<String>,
}

impl QuestionFeedback {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        correct: bool,
        correct_option_id: OptionId,
        explanation: Option<String>,
    ) -> Self {
        Self {
            question_id,
            correct,
            correct_option_id,
            explanation,
        }
    }
}

/// The graded result returned by the backend for one submission.
///
/// Received at most once per attempt; its presence is what puts the attempt
/// into read-only mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedOutcome {
    score: u32,
    error_count: u32,
    completed_at: DateTime<Utc>,
    feedback: Vec<QuestionFeedback>,
}

impl GradedOutcome {
    /// Assembles a graded outcome from the backend's fields.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError::DuplicateFeedback` if two feedback entries
    /// target the same question.
    pub fn new(
        score: u32,
        error_count: u32,
        completed_at: DateTime<Utc>,
        feedback: Vec<QuestionFeedback>,
    ) -> Result<Self, OutcomeError> {
        for (idx, entry) in feedback.iter().enumerate() {
            if feedback[..idx]
                .iter()
                .any(|f| f.question_id == entry.question_id)
            {
                return Err(OutcomeError::DuplicateFeedback(entry.question_id));
            }
        }

        Ok(Self {
            score,
            error_count,
            completed_at,
            feedback,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn feedback(&self) -> &[QuestionFeedback] {
        &self.feedback
    }

    /// The verdict for one question, if the backend graded it.
    #[must_use]
    pub fn feedback_for(&self, question: QuestionId) -> Option<&QuestionFeedback> {
        self.feedback.iter().find(|f| f.question_id == question)
    }
}
