use std::fmt;

use log::debug;

use api::ApiError;
use course_core::model::{Activity, AnswerSheet, GradedOutcome, OptionId, Question, QuestionId};

use crate::attempts::progress::AttemptProgress;
use crate::attempts::review::{ReviewSheet, build_review};
use crate::error::AttemptError;

//
// ─── PHASES & TICKETS ──────────────────────────────────────────────────────────
//

/// Lifecycle of one attempt.
///
/// `Loading` and `Submitting` are the only suspension points; `Graded` and
/// `LoadError` are terminal until a fresh load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    NotLoaded,
    Loading,
    Ready,
    Submitting,
    Graded,
    LoadError,
}

/// Proof that a load was started; completing with an outdated ticket is a
/// no-op, which is how late responses for an abandoned attempt are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Proof that a submission was accepted for dispatch. Same staleness rule as
/// [`LoadTicket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket {
    generation: u64,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// State machine for one activity attempt.
///
/// Owns the loaded activity, the answer sheet, the navigation cursor, and,
/// after grading, the immutable outcome. All mutation happens through the
/// methods below; asynchronous work lives in
/// [`AttemptWorkflow`](crate::attempts::AttemptWorkflow), which drives the
/// `begin_*`/`complete_*` pairs.
pub struct AttemptEngine {
    phase: AttemptPhase,
    activity: Option<Activity>,
    answers: AnswerSheet,
    cursor: usize,
    outcome: Option<GradedOutcome>,
    message: Option<String>,
    generation: u64,
}

impl AttemptEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AttemptPhase::NotLoaded,
            activity: None,
            answers: AnswerSheet::new(),
            cursor: 0,
            outcome: None,
            message: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    #[must_use]
    pub fn activity(&self) -> Option<&Activity> {
        self.activity.as_ref()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&GradedOutcome> {
        self.outcome.as_ref()
    }

    /// The current user-facing message: a blocking one in `LoadError`, an
    /// inline one after a failed submission.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    //
    // ─── LOADER ────────────────────────────────────────────────────────────
    //

    /// Starts a fresh load, wiping every trace of the previous attempt so it
    /// cannot leak into the new one.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.phase = AttemptPhase::Loading;
        self.activity = None;
        self.answers.clear();
        self.cursor = 0;
        self.outcome = None;
        self.message = None;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Applies a finished load. Stale tickets (superseded by a newer load or
    /// by [`detach`](Self::detach)) are discarded without touching state.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<Activity, ApiError>) {
        if ticket.generation != self.generation {
            debug!("discarding stale load completion");
            return;
        }

        match result {
            Ok(activity) if activity.question_count() == 0 => {
                self.phase = AttemptPhase::LoadError;
                self.message =
                    Some("This activity has no questions or could not be found.".to_string());
            }
            Ok(activity) => {
                self.activity = Some(activity);
                self.phase = AttemptPhase::Ready;
            }
            Err(err) => {
                self.phase = AttemptPhase::LoadError;
                self.message = Some(load_failure_message(&err));
            }
        }
    }

    /// Invalidates every outstanding ticket. Called when the owning page
    /// unmounts, so responses that arrive afterwards are dropped instead of
    /// mutating a dead attempt.
    pub fn detach(&mut self) {
        self.generation += 1;
    }

    //
    // ─── NAVIGATOR ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The question the cursor points at, if an activity is loaded.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.activity.as_ref()?.questions().get(self.cursor)
    }

    /// Moves to the next question; no-op at the last one.
    pub fn next(&mut self) {
        let Some(activity) = &self.activity else {
            return;
        };
        if self.cursor + 1 < activity.question_count() {
            self.cursor += 1;
        }
    }

    /// Moves to the previous question; no-op at the first one.
    pub fn previous(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    //
    // ─── ANSWER COLLECTOR ──────────────────────────────────────────────────
    //

    /// Records a choice for a question, replacing any previous one.
    ///
    /// No-op once an outcome exists, and for question or option ids that do
    /// not belong to the loaded activity; the sheet's key set stays a subset
    /// of the activity's question ids.
    pub fn select(&mut self, question: QuestionId, option: OptionId) {
        if self.outcome.is_some() {
            return;
        }
        let Some(activity) = &self.activity else {
            return;
        };
        let Some(target) = activity.question(question) else {
            return;
        };
        if !target.selectable() || target.option(option).is_none() {
            return;
        }
        self.answers.select(question, option);
    }

    /// The option currently chosen for a question, if any.
    #[must_use]
    pub fn answer_for(&self, question: QuestionId) -> Option<OptionId> {
        self.answers.answer_for(question)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    /// True iff every question of the loaded activity has an answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.activity
            .as_ref()
            .is_some_and(|activity| self.answers.covers(activity))
    }

    /// Returns a summary of the attempt's answering progress.
    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        let total = self
            .activity
            .as_ref()
            .map_or(0, Activity::question_count);
        let answered = self.answers.len();
        AttemptProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    //
    // ─── SUBMITTER ─────────────────────────────────────────────────────────
    //

    /// Validates and opens a submission.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Incomplete` if any question is unanswered (no
    /// network call may follow), `AttemptError::SubmissionInFlight` while a
    /// previous submission is pending, `AttemptError::AlreadyGraded` after
    /// grading, and `AttemptError::NotLoaded` in every other phase.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, AttemptError> {
        match self.phase {
            AttemptPhase::Ready => {}
            AttemptPhase::Submitting => return Err(AttemptError::SubmissionInFlight),
            AttemptPhase::Graded => return Err(AttemptError::AlreadyGraded),
            _ => return Err(AttemptError::NotLoaded),
        }
        if !self.is_complete() {
            return Err(AttemptError::Incomplete);
        }

        self.message = None;
        self.phase = AttemptPhase::Submitting;
        Ok(SubmitTicket {
            generation: self.generation,
        })
    }

    /// Applies a finished submission. Stale tickets are discarded.
    ///
    /// Success is a one-way door into `Graded`; failure returns to `Ready`
    /// with answers and cursor intact, releasing the in-flight guard.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<GradedOutcome, ApiError>,
    ) {
        if ticket.generation != self.generation {
            debug!("discarding stale submit completion");
            return;
        }
        if self.phase != AttemptPhase::Submitting {
            return;
        }

        match result {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.phase = AttemptPhase::Graded;
            }
            Err(err) => {
                self.phase = AttemptPhase::Ready;
                self.message = Some(submit_failure_message(&err));
            }
        }
    }

    /// The merged per-question, per-option feedback view; available once
    /// graded.
    #[must_use]
    pub fn review(&self) -> Option<ReviewSheet> {
        let activity = self.activity.as_ref()?;
        let outcome = self.outcome.as_ref()?;
        Some(build_review(activity, &self.answers, outcome))
    }
}

impl Default for AttemptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttemptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptEngine")
            .field("phase", &self.phase)
            .field("activity_id", &self.activity.as_ref().map(Activity::id))
            .field("answered", &self.answers.len())
            .field("cursor", &self.cursor)
            .field("graded", &self.outcome.is_some())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

fn load_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::NotFound => "Activity not found.".to_string(),
        _ => "Could not load the activity. Try again.".to_string(),
    }
}

fn submit_failure_message(err: &ApiError) -> String {
    match err {
        // The backend's own rejection reason, when it sent one.
        ApiError::Rejected(message) => message.clone(),
        _ => "Something went wrong while submitting your answers.".to_string(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
