mod activity;
mod answers;
mod ids;
mod outcome;

pub use activity::{Activity, ActivityError, AnswerOption, Question, QuestionKind};
pub use answers::AnswerSheet;
pub use ids::{ActivityId, CourseId, OptionId, QuestionId, UserId};
pub use outcome::{GradedOutcome, OutcomeError, QuestionFeedback};
