use std::collections::BTreeMap;

use crate::model::activity::Activity;
use crate::model::ids::{OptionId, QuestionId};

/// The in-progress mapping of question → chosen option for one attempt.
///
/// Exactly one live choice per question: selecting again overwrites the
/// previous choice. Iteration order follows question id so submission
/// payloads are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    chosen: BTreeMap<QuestionId, OptionId>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a choice for a question, replacing any previous one.
    pub fn select(&mut self, question: QuestionId, option: OptionId) {
        self.chosen.insert(question, option);
    }

    /// The option currently chosen for a question, if any.
    #[must_use]
    pub fn answer_for(&self, question: QuestionId) -> Option<OptionId> {
        self.chosen.get(&question).copied()
    }

    /// Drops all recorded choices.
    pub fn clear(&mut self) {
        self.chosen.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    /// True iff the sheet's key set equals the activity's question id set.
    #[must_use]
    pub fn covers(&self, activity: &Activity) -> bool {
        self.chosen.len() == activity.question_count()
            && activity.question_ids().all(|id| self.chosen.contains_key(&id))
    }

    /// All recorded `(question, option)` pairs in question-id order.
    pub fn entries(&self) -> impl Iterator<Item = (QuestionId, OptionId)> + '_ {
        self.chosen.iter().map(|(q, o)| (*q, *o))
    }
}
