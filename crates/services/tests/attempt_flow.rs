use std::sync::Arc;

use async_trait::async_trait;

use api::{
    ActivityGateway, ApiError, Gateways, InMemoryGateway, ProgressGateway, Submission,
    UserIdentity,
};
use course_core::model::{
    Activity, ActivityId, AnswerOption, GradedOutcome, OptionId, Question, QuestionId,
    QuestionKind, UserId,
};
use course_core::time::fixed_clock;
use services::{
    AttemptEngine, AttemptError, AttemptPhase, AttemptWorkflow, LoadOutcome, ResumeTarget,
    SubmitOutcome,
};

fn sample_activity() -> Activity {
    let questions = vec![
        Question::new(
            QuestionId::new(1),
            "What does `let` introduce?",
            QuestionKind::SingleChoice,
            vec![
                AnswerOption::new(OptionId::new(1), "A binding"),
                AnswerOption::new(OptionId::new(2), "A loop"),
            ],
        )
        .unwrap(),
        Question::new(
            QuestionId::new(2),
            "Which keyword makes a binding mutable?",
            QuestionKind::SingleChoice,
            vec![
                AnswerOption::new(OptionId::new(3), "const"),
                AnswerOption::new(OptionId::new(4), "mut"),
            ],
        )
        .unwrap(),
    ];
    Activity::new(ActivityId::new(1), "Rust Basics", None, questions).unwrap()
}

fn seeded_gateway() -> InMemoryGateway {
    let gateway = InMemoryGateway::new(fixed_clock());
    gateway.insert_activity(sample_activity());
    gateway.set_answer_key(
        ActivityId::new(1),
        QuestionId::new(1),
        OptionId::new(1),
        None,
    );
    gateway.set_answer_key(
        ActivityId::new(1),
        QuestionId::new(2),
        OptionId::new(4),
        Some("`mut` opts a binding into mutation."),
    );
    gateway.sign_in(UserIdentity::new(UserId::new(7), "Ana"));
    gateway
}

#[tokio::test]
async fn full_attempt_flow_loads_answers_submits_and_reviews() {
    let gateway = seeded_gateway();
    let workflow = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway.clone()));
    let mut engine = AttemptEngine::new();

    let outcome = workflow.load(&mut engine, ActivityId::new(1)).await;
    assert_eq!(outcome, LoadOutcome::Ready);
    assert_eq!(engine.phase(), AttemptPhase::Ready);

    engine.select(QuestionId::new(1), OptionId::new(1));
    engine.next();
    engine.select(QuestionId::new(2), OptionId::new(3));
    assert!(engine.is_complete());

    let outcome = workflow.submit(&mut engine).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Graded);
    assert_eq!(engine.phase(), AttemptPhase::Graded);
    assert_eq!(gateway.submission_count(), 1);

    let review = engine.review().expect("graded attempt has a review");
    assert_eq!(review.score, 50);
    assert_eq!(review.error_count, 1);

    let second = &review.questions[1];
    assert_eq!(second.answered_correctly, Some(false));
    let chosen = second
        .options
        .iter()
        .find(|o| o.option_id == OptionId::new(3))
        .unwrap();
    assert!(chosen.chosen && !chosen.correct);
    let correct = second
        .options
        .iter()
        .find(|o| o.option_id == OptionId::new(4))
        .unwrap();
    assert!(!correct.chosen && correct.correct);
    assert_eq!(
        second.explanation.as_deref(),
        Some("`mut` opts a binding into mutation.")
    );
}

#[tokio::test]
async fn incomplete_submission_never_reaches_the_backend() {
    let gateway = seeded_gateway();
    let workflow = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway.clone()));
    let mut engine = AttemptEngine::new();

    workflow.load(&mut engine, ActivityId::new(1)).await;
    engine.select(QuestionId::new(1), OptionId::new(1));

    let err = workflow.submit(&mut engine).await.unwrap_err();
    assert_eq!(err, AttemptError::Incomplete);
    assert_eq!(gateway.submission_count(), 0);
    assert_eq!(engine.phase(), AttemptPhase::Ready);
    assert_eq!(engine.answer_for(QuestionId::new(1)), Some(OptionId::new(1)));
}

#[tokio::test]
async fn unauthenticated_load_redirects_with_resume_target() {
    let gateway = seeded_gateway();
    gateway.sign_out();
    let workflow = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway));
    let mut engine = AttemptEngine::new();

    let outcome = workflow.load(&mut engine, ActivityId::new(1)).await;
    assert_eq!(
        outcome,
        LoadOutcome::RedirectToLogin(ResumeTarget {
            activity_id: ActivityId::new(1)
        })
    );
    // Nothing was fetched, nothing was reset.
    assert_eq!(engine.phase(), AttemptPhase::NotLoaded);
}

#[tokio::test]
async fn unknown_activity_becomes_a_blocking_load_error() {
    let gateway = seeded_gateway();
    let workflow = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway));
    let mut engine = AttemptEngine::new();

    let outcome = workflow.load(&mut engine, ActivityId::new(999)).await;
    assert_eq!(outcome, LoadOutcome::Failed);
    assert_eq!(engine.phase(), AttemptPhase::LoadError);
    assert!(engine.message().unwrap().contains("not found"));
    assert!(engine.answers().is_empty());
}

#[tokio::test]
async fn session_expiry_at_submit_releases_the_guard() {
    let gateway = seeded_gateway();
    let workflow = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway.clone()));
    let mut engine = AttemptEngine::new();

    workflow.load(&mut engine, ActivityId::new(1)).await;
    engine.select(QuestionId::new(1), OptionId::new(1));
    engine.select(QuestionId::new(2), OptionId::new(4));

    gateway.sign_out();
    let outcome = workflow.submit(&mut engine).await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::RedirectToLogin(ResumeTarget {
            activity_id: ActivityId::new(1)
        })
    );
    assert_eq!(engine.phase(), AttemptPhase::Ready);
    assert_eq!(gateway.submission_count(), 0);

    // Signing back in lets the same attempt submit; answers survived.
    gateway.sign_in(UserIdentity::new(UserId::new(7), "Ana"));
    let outcome = workflow.submit(&mut engine).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Graded);
    assert_eq!(engine.review().unwrap().score, 100);
}

/// Progress gateway that refuses every submission, for failure-path tests.
struct RejectingProgress {
    message: &'static str,
}

#[async_trait]
impl ProgressGateway for RejectingProgress {
    async fn submit_answers(&self, _submission: &Submission) -> Result<GradedOutcome, ApiError> {
        Err(ApiError::Rejected(self.message.to_string()))
    }
}

#[tokio::test]
async fn backend_rejection_keeps_the_attempt_editable() {
    let gateway = seeded_gateway();
    let rejecting = AttemptWorkflow::new(
        Arc::new(gateway.clone()),
        Arc::new(gateway.clone()),
        Arc::new(RejectingProgress {
            message: "the activity deadline has passed",
        }),
    );
    let mut engine = AttemptEngine::new();

    rejecting.load(&mut engine, ActivityId::new(1)).await;
    engine.select(QuestionId::new(1), OptionId::new(1));
    engine.select(QuestionId::new(2), OptionId::new(4));

    let outcome = rejecting.submit(&mut engine).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(engine.phase(), AttemptPhase::Ready);
    assert_eq!(engine.message(), Some("the activity deadline has passed"));
    assert_eq!(engine.answer_for(QuestionId::new(2)), Some(OptionId::new(4)));

    // The same attempt goes through once the backend accepts again.
    let working = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway.clone()));
    let outcome = working.submit(&mut engine).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Graded);
    assert_eq!(gateway.submission_count(), 1);
}

/// Activity gateway that fails with a transport error, for load-path tests.
struct UnreachableActivities;

#[async_trait]
impl ActivityGateway for UnreachableActivities {
    async fn activity(&self, _id: ActivityId) -> Result<Activity, ApiError> {
        Err(ApiError::Network("connection refused".to_string()))
    }
}

#[tokio::test]
async fn network_failure_on_load_is_recoverable_by_reloading() {
    let gateway = seeded_gateway();
    let broken = AttemptWorkflow::new(
        Arc::new(UnreachableActivities),
        Arc::new(gateway.clone()),
        Arc::new(gateway.clone()),
    );
    let mut engine = AttemptEngine::new();

    let outcome = broken.load(&mut engine, ActivityId::new(1)).await;
    assert_eq!(outcome, LoadOutcome::Failed);
    assert_eq!(engine.phase(), AttemptPhase::LoadError);
    assert!(engine.message().is_some());

    // A user-initiated reload against a reachable backend recovers.
    let working = AttemptWorkflow::from_gateways(&Gateways::in_memory(gateway));
    let outcome = working.load(&mut engine, ActivityId::new(1)).await;
    assert_eq!(outcome, LoadOutcome::Ready);
    assert_eq!(engine.phase(), AttemptPhase::Ready);
}
