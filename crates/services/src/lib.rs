#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;

pub use course_core::Clock;

pub use attempts::{
    AttemptEngine, AttemptPhase, AttemptProgress, AttemptWorkflow, LoadOutcome, LoadTicket,
    OptionReview, QuestionReview, ResumeTarget, ReviewSheet, SubmitOutcome, SubmitTicket,
    build_review,
};
pub use error::AttemptError;
