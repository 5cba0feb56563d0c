use std::sync::Arc;

use api::{ActivityGateway, ApiError, Gateways, ProgressGateway, SessionGateway, Submission};
use course_core::model::{Activity, ActivityId};

use crate::attempts::engine::{AttemptEngine, AttemptPhase};
use crate::error::AttemptError;

/// Where to resume after the external router has sent the user through
/// login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeTarget {
    pub activity_id: ActivityId,
}

/// What a load attempt came to. Failures are already recorded inside the
/// engine as a blocking message; the variant only tells the caller which
/// screen to show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Failed,
    RedirectToLogin(ResumeTarget),
}

/// What a dispatched submission came to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Graded,
    Failed,
    RedirectToLogin(ResumeTarget),
}

/// Orchestrates the asynchronous half of an attempt: fetching the activity
/// and dispatching the submission over the injected gateways.
///
/// The engine stays the single owner of attempt state; this service only
/// drives its `begin_*`/`complete_*` pairs around the awaits, so a caller
/// that dropped the attempt (see [`AttemptEngine::detach`]) never sees a
/// late response applied.
#[derive(Clone)]
pub struct AttemptWorkflow {
    activities: Arc<dyn ActivityGateway>,
    session: Arc<dyn SessionGateway>,
    progress: Arc<dyn ProgressGateway>,
}

impl AttemptWorkflow {
    #[must_use]
    pub fn new(
        activities: Arc<dyn ActivityGateway>,
        session: Arc<dyn SessionGateway>,
        progress: Arc<dyn ProgressGateway>,
    ) -> Self {
        Self {
            activities,
            session,
            progress,
        }
    }

    #[must_use]
    pub fn from_gateways(gateways: &Gateways) -> Self {
        Self::new(
            Arc::clone(&gateways.activities),
            Arc::clone(&gateways.session),
            Arc::clone(&gateways.progress),
        )
    }

    /// Loads an activity into the engine.
    ///
    /// The ambient identity is checked first: an unauthenticated user is
    /// handed back to the router with a resume target instead of fetching
    /// anything. Load failures become the engine's blocking message; there
    /// is no automatic retry.
    pub async fn load(&self, engine: &mut AttemptEngine, activity_id: ActivityId) -> LoadOutcome {
        match self.session.current_user().await {
            Ok(_) => {}
            Err(ApiError::Unauthenticated) => {
                return LoadOutcome::RedirectToLogin(ResumeTarget { activity_id });
            }
            Err(err) => {
                let ticket = engine.begin_load();
                engine.complete_load(ticket, Err(err));
                return LoadOutcome::Failed;
            }
        }

        let ticket = engine.begin_load();
        let result = self.activities.activity(activity_id).await;
        engine.complete_load(ticket, result);

        if engine.phase() == AttemptPhase::Ready {
            LoadOutcome::Ready
        } else {
            LoadOutcome::Failed
        }
    }

    /// Validates, builds, and dispatches the submission; exactly one call
    /// leaves per accepted validation.
    ///
    /// # Errors
    ///
    /// Local validation failures (`Incomplete`, `SubmissionInFlight`,
    /// `AlreadyGraded`, `NotLoaded`) are returned before any network
    /// activity. Gateway failures are not errors here: they are applied to
    /// the engine and reported as `SubmitOutcome::Failed` or a redirect.
    pub async fn submit(&self, engine: &mut AttemptEngine) -> Result<SubmitOutcome, AttemptError> {
        let Some(activity_id) = engine.activity().map(Activity::id) else {
            return Err(AttemptError::NotLoaded);
        };
        let ticket = engine.begin_submit()?;

        let user = match self.session.current_user().await {
            Ok(user) => user,
            Err(err) => {
                let expired = matches!(err, ApiError::Unauthenticated);
                engine.complete_submit(ticket, Err(err));
                return Ok(if expired {
                    SubmitOutcome::RedirectToLogin(ResumeTarget { activity_id })
                } else {
                    SubmitOutcome::Failed
                });
            }
        };

        let submission = Submission::from_sheet(user.id, activity_id, engine.answers());
        let result = self.progress.submit_answers(&submission).await;
        engine.complete_submit(ticket, result);

        Ok(if engine.phase() == AttemptPhase::Graded {
            SubmitOutcome::Graded
        } else {
            SubmitOutcome::Failed
        })
    }
}
