//! Shared error types for the services crate.

use thiserror::Error;

/// Local failures of the attempt engine.
///
/// Backend failures never surface through this type; the engine converts
/// them into user-facing message state at the completion boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("no activity is loaded")]
    NotLoaded,

    #[error("answer all questions before submitting")]
    Incomplete,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("the attempt has already been graded")]
    AlreadyGraded,
}
