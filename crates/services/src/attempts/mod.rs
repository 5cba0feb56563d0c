mod engine;
mod progress;
mod review;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use engine::{AttemptEngine, AttemptPhase, LoadTicket, SubmitTicket};
pub use progress::AttemptProgress;
pub use review::{OptionReview, QuestionReview, ReviewSheet, build_review};
pub use workflow::{AttemptWorkflow, LoadOutcome, ResumeTarget, SubmitOutcome};
