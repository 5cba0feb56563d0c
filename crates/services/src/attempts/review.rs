use chrono::{DateTime, Utc};

use course_core::model::{Activity, AnswerSheet, GradedOutcome, OptionId, QuestionId};

/// One option of a graded question, with the two per-option verdict flags.
///
/// `chosen` and `correct` are independent: an option can be either, both
/// (the user got it right), or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionReview {
    pub option_id: OptionId,
    pub text: String,
    pub chosen: bool,
    pub correct: bool,
}

/// A graded question with its options and the backend's verdict.
///
/// `answered_correctly` and `correct_option_id` are `None` when the backend
/// sent no feedback entry for the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub prompt: String,
    pub chosen_option_id: Option<OptionId>,
    pub answered_correctly: Option<bool>,
    pub correct_option_id: Option<OptionId>,
    pub explanation: Option<String>,
    pub options: Vec<OptionReview>,
}

/// The complete read-only results view for one graded attempt.
///
/// Presentation-agnostic on purpose: no pre-formatted strings, no locale
/// assumptions. The UI decides how to render timestamps and scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSheet {
    pub score: u32,
    pub error_count: u32,
    pub completed_at: DateTime<Utc>,
    pub questions: Vec<QuestionReview>,
}

/// Joins the activity, the answer sheet, and the graded outcome by question
/// id into one renderable structure.
///
/// This is the single place where the merge happens; the rendering layer
/// never re-derives chosen/correct flags on its own.
#[must_use]
pub fn build_review(
    activity: &Activity,
    answers: &AnswerSheet,
    outcome: &GradedOutcome,
) -> ReviewSheet {
    let questions = activity
        .questions()
        .iter()
        .map(|question| {
            let feedback = outcome.feedback_for(question.id());
            let chosen_option_id = answers.answer_for(question.id());
            let options = question
                .options()
                .iter()
                .map(|option| OptionReview {
                    option_id: option.id(),
                    text: option.text().to_owned(),
                    chosen: chosen_option_id == Some(option.id()),
                    correct: feedback.is_some_and(|f| f.correct_option_id == option.id()),
                })
                .collect();

            QuestionReview {
                question_id: question.id(),
                prompt: question.prompt().to_owned(),
                chosen_option_id,
                answered_correctly: feedback.map(|f| f.correct),
                correct_option_id: feedback.map(|f| f.correct_option_id),
                explanation: feedback.and_then(|f| f.explanation.clone()),
                options,
            }
        })
        .collect();

    ReviewSheet {
        score: outcome.score(),
        error_count: outcome.error_count(),
        completed_at: outcome.completed_at(),
        questions,
    }
}
