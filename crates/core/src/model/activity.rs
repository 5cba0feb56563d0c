use thiserror::Error;

use crate::model::ids::{ActivityId, CourseId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity name cannot be empty")]
    EmptyName,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("duplicate question id {0} in activity")]
    DuplicateQuestion(QuestionId),

    #[error("duplicate option id {0} in question")]
    DuplicateOption(OptionId),
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// How a question is answered.
///
/// Only single-choice questions carry selectable options; anything else the
/// backend sends renders without interactive options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    SingleChoice,
    Unsupported,
}

/// One selectable choice within a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A prompt with its ordered answer options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    kind: QuestionKind,
    options: Vec<AnswerOption>,
}

impl Question {
    /// Creates a question, keeping option order as given.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::EmptyPrompt` if the prompt is blank and
    /// `ActivityError::DuplicateOption` if two options share an id.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        kind: QuestionKind,
        options: Vec<AnswerOption>,
    ) -> Result<Self, ActivityError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ActivityError::EmptyPrompt);
        }
        for (idx, option) in options.iter().enumerate() {
            if options[..idx].iter().any(|o| o.id == option.id) {
                return Err(ActivityError::DuplicateOption(option.id));
            }
        }

        Ok(Self {
            id,
            prompt,
            kind,
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Looks up an option of this question by id.
    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Whether the question offers interactive options at all.
    #[must_use]
    pub fn selectable(&self) -> bool {
        self.kind == QuestionKind::SingleChoice && !self.options.is_empty()
    }
}

//
// ─── ACTIVITY ──────────────────────────────────────────────────────────────────
//

/// A gradable unit containing ordered questions.
///
/// Immutable for the lifetime of one attempt; a fresh load replaces the whole
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    id: ActivityId,
    name: String,
    course_id: Option<CourseId>,
    questions: Vec<Question>,
}

impl Activity {
    /// Creates an activity, keeping question order as given.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::EmptyName` if the name is blank and
    /// `ActivityError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: ActivityId,
        name: impl Into<String>,
        course_id: Option<CourseId>,
        questions: Vec<Question>,
    ) -> Result<Self, ActivityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ActivityError::EmptyName);
        }
        for (idx, question) in questions.iter().enumerate() {
            if questions[..idx].iter().any(|q| q.id == question.id) {
                return Err(ActivityError::DuplicateQuestion(question.id));
            }
        }

        Ok(Self {
            id,
            name,
            course_id,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> ActivityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The course this activity belongs to, when the backend reports one.
    /// Used by the results screen to link back to the course.
    #[must_use]
    pub fn course_id(&self) -> Option<CourseId> {
        self.course_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Looks up a question by id.
    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Ids of all questions, in presentation order.
    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.questions.iter().map(|q| q.id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
