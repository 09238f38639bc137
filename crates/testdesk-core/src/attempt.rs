//! Test attempt controller.
//!
//! Loads an attempt's question set, tracks the student's selections in memory,
//! and submits the finalized answer set exactly once. Grading happens on the
//! backend; nothing here knows which option is correct.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::countdown::Countdown;
use crate::error::ApiError;
use crate::model::{AnswerSubmission, Question, SubmitSummary, TestAttempt, UNANSWERED};
use crate::traits::{Confirm, TestsApi};

/// Errors raised while answering or submitting an attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(u64),

    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption { question_id: u64, option_id: u64 },

    #[error("this attempt has already been submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Whether a question has a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Answered,
    Unanswered,
}

/// Where a session is in its submit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Answering,
    Submitting,
    Submitted,
}

/// Result of a submit request.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The backend accepted and graded the answers.
    Submitted(SubmitSummary),
    /// The user declined the unanswered-questions prompt; nothing was sent.
    Cancelled,
}

/// An open attempt with the student's in-progress selections.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    test_id: u64,
    attempt: TestAttempt,
    selections: HashMap<u64, u64>,
    state: SessionState,
}

impl AttemptSession {
    /// Wrap a freshly started attempt. Every question starts unanswered.
    /// Questions repeating an earlier id are dropped, so each id is tracked
    /// and submitted once.
    pub fn new(test_id: u64, mut attempt: TestAttempt) -> Self {
        let mut selections = HashMap::with_capacity(attempt.questions.len());
        attempt.questions.retain(|q| {
            let first = selections.insert(q.id, UNANSWERED).is_none();
            if !first {
                tracing::warn!(question_id = q.id, "dropping duplicate question");
            }
            first
        });
        Self {
            test_id,
            attempt,
            selections,
            state: SessionState::Answering,
        }
    }

    pub fn test_id(&self) -> u64 {
        self.test_id
    }

    pub fn attempt(&self) -> &TestAttempt {
        &self.attempt
    }

    pub fn questions(&self) -> &[Question] {
        &self.attempt.questions
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of tracked selections. Equal to the question count until submit.
    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// Selected option for a question, `UNANSWERED` if none.
    pub fn selection(&self, question_id: u64) -> Option<u64> {
        self.selections.get(&question_id).copied()
    }

    /// Record a choice. Replaces any earlier choice for the same question.
    pub fn select(&mut self, question_id: u64, option_id: u64) -> Result<(), AttemptError> {
        self.ensure_answering()?;
        let question = self
            .question(question_id)
            .ok_or(AttemptError::UnknownQuestion(question_id))?;
        if !question.has_option(option_id) {
            return Err(AttemptError::UnknownOption {
                question_id,
                option_id,
            });
        }
        self.selections.insert(question_id, option_id);
        Ok(())
    }

    /// Reset a question back to unanswered.
    pub fn clear(&mut self, question_id: u64) -> Result<(), AttemptError> {
        self.ensure_answering()?;
        match self.selections.get_mut(&question_id) {
            Some(slot) => {
                *slot = UNANSWERED;
                Ok(())
            }
            None => Err(AttemptError::UnknownQuestion(question_id)),
        }
    }

    pub fn answer_status(&self, question_id: u64) -> AnswerStatus {
        match self.selections.get(&question_id) {
            Some(&id) if id != UNANSWERED => AnswerStatus::Answered,
            _ => AnswerStatus::Unanswered,
        }
    }

    /// Questions still at the sentinel, in question order.
    pub fn unanswered(&self) -> Vec<&Question> {
        self.attempt
            .questions
            .iter()
            .filter(|q| self.answer_status(q.id) == AnswerStatus::Unanswered)
            .collect()
    }

    pub fn unanswered_count(&self) -> usize {
        self.unanswered().len()
    }

    pub fn answered_count(&self) -> usize {
        self.attempt.questions.len() - self.unanswered_count()
    }

    /// Prompt to show before submitting with open questions.
    pub fn confirmation_prompt(&self) -> Option<String> {
        match self.unanswered_count() {
            0 => None,
            n => Some(format!(
                "You have {n} unanswered questions. Are you sure you want to submit?"
            )),
        }
    }

    /// One entry per question, in question order, unanswered ones as `UNANSWERED`.
    pub fn build_submission(&self) -> Vec<AnswerSubmission> {
        self.attempt
            .questions
            .iter()
            .map(|q| AnswerSubmission {
                question_id: q.id,
                selected_option_id: self.selection(q.id).unwrap_or(UNANSWERED),
            })
            .collect()
    }

    /// Time left before the advisory deadline, if the attempt has one.
    pub fn countdown(&self, now: DateTime<Utc>) -> Option<Countdown> {
        self.attempt.due_at.map(|due| Countdown::at(due, now))
    }

    fn question(&self, question_id: u64) -> Option<&Question> {
        self.attempt.questions.iter().find(|q| q.id == question_id)
    }

    fn ensure_answering(&self) -> Result<(), AttemptError> {
        match self.state {
            SessionState::Answering => Ok(()),
            SessionState::Submitting | SessionState::Submitted => {
                Err(AttemptError::AlreadySubmitted)
            }
        }
    }
}

/// Drives the start → answer → submit flow against a [`TestsApi`].
pub struct AttemptController {
    api: Arc<dyn TestsApi>,
}

impl AttemptController {
    pub fn new(api: Arc<dyn TestsApi>) -> Self {
        Self { api }
    }

    /// Open an attempt. Refusals come back as [`ApiError::Forbidden`] or
    /// [`ApiError::NotFound`] for the caller to surface.
    #[instrument(skip(self))]
    pub async fn start(&self, test_id: u64) -> Result<AttemptSession, ApiError> {
        let attempt = self.api.start_test(test_id).await?;
        tracing::info!(
            attempt = attempt.attempt_number,
            questions = attempt.questions.len(),
            "attempt loaded"
        );
        Ok(AttemptSession::new(test_id, attempt))
    }

    /// Submit the session's answers.
    ///
    /// With open questions the user is asked first; declining leaves the
    /// session untouched. Every question is sent either way, open ones with
    /// the sentinel. A failed call returns the session to answering so the
    /// user can try again.
    #[instrument(skip_all, fields(test_id = session.test_id()))]
    pub async fn submit(
        &self,
        session: &mut AttemptSession,
        confirm: &dyn Confirm,
    ) -> Result<SubmitOutcome, AttemptError> {
        session.ensure_answering()?;

        if let Some(prompt) = session.confirmation_prompt() {
            if !confirm.confirm(&prompt) {
                tracing::debug!("submit cancelled by user");
                return Ok(SubmitOutcome::Cancelled);
            }
        }

        session.state = SessionState::Submitting;
        let answers = session.build_submission();

        match self.api.submit_test(session.test_id, &answers).await {
            Ok(summary) => {
                session.state = SessionState::Submitted;
                session.selections.clear();
                tracing::info!(
                    obtained = summary.obtained_marks,
                    total = summary.total_marks,
                    "attempt submitted"
                );
                Ok(SubmitOutcome::Submitted(summary))
            }
            Err(e) => {
                session.state = SessionState::Answering;
                tracing::warn!("submit failed: {e}");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, TestSummary};

    fn question(id: u64, option_ids: &[u64]) -> Question {
        Question {
            id,
            text: format!("Question {id}"),
            marks: 1,
            options: option_ids
                .iter()
                .map(|&o| AnswerOption {
                    id: o,
                    text: format!("Option {o}"),
                    is_correct: None,
                })
                .collect(),
        }
    }

    fn session(n: u64) -> AttemptSession {
        let questions = (1..=n)
            .map(|i| question(i, &[i * 10 + 1, i * 10 + 2]))
            .collect();
        AttemptSession::new(
            7,
            TestAttempt {
                assignment_id: Some(1),
                test: TestSummary {
                    id: 7,
                    title: "Quiz".into(),
                    total_marks: n as u32,
                    ..Default::default()
                },
                attempt_number: 1,
                questions,
                due_at: None,
                started_at: None,
            },
        )
    }

    #[test]
    fn every_question_starts_unanswered() {
        let s = session(5);
        assert_eq!(s.selection_count(), 5);
        for q in s.questions() {
            assert_eq!(s.selection(q.id), Some(UNANSWERED));
            assert_eq!(s.answer_status(q.id), AnswerStatus::Unanswered);
        }
        assert_eq!(s.unanswered_count(), 5);
    }

    #[test]
    fn empty_attempt_has_no_selections() {
        let s = session(0);
        assert_eq!(s.selection_count(), 0);
        assert!(s.confirmation_prompt().is_none());
        assert!(s.build_submission().is_empty());
    }

    #[test]
    fn duplicate_question_ids_are_kept_once() {
        let mut attempt = session(2).attempt.clone();
        let mut repeated = question(1, &[91, 92]);
        repeated.text = "Repeated".into();
        attempt.questions.push(repeated);

        let mut s = AttemptSession::new(7, attempt);
        assert_eq!(s.questions().len(), 2);
        assert_eq!(s.selection_count(), 2);
        assert_eq!(s.questions()[0].text, "Question 1");
        assert!(matches!(
            s.select(1, 91),
            Err(AttemptError::UnknownOption { .. })
        ));

        s.select(1, 11).unwrap();
        let sub = s.build_submission();
        assert_eq!(sub.len(), s.selection_count());
        assert_eq!(s.unanswered_count(), 1);
    }

    #[test]
    fn select_validates_membership() {
        let mut s = session(2);
        s.select(1, 12).unwrap();
        assert_eq!(s.answer_status(1), AnswerStatus::Answered);

        assert!(matches!(
            s.select(9, 11),
            Err(AttemptError::UnknownQuestion(9))
        ));
        assert!(matches!(
            s.select(2, 11),
            Err(AttemptError::UnknownOption {
                question_id: 2,
                option_id: 11
            })
        ));

        s.clear(1).unwrap();
        assert_eq!(s.answer_status(1), AnswerStatus::Unanswered);
    }

    #[test]
    fn submission_covers_every_question_in_order() {
        let mut s = session(3);
        s.select(1, 11).unwrap();
        s.select(3, 32).unwrap();

        let sub = s.build_submission();
        assert_eq!(
            sub,
            vec![
                AnswerSubmission {
                    question_id: 1,
                    selected_option_id: 11
                },
                AnswerSubmission {
                    question_id: 2,
                    selected_option_id: UNANSWERED
                },
                AnswerSubmission {
                    question_id: 3,
                    selected_option_id: 32
                },
            ]
        );
    }

    #[test]
    fn prompt_counts_open_questions() {
        let mut s = session(3);
        s.select(1, 11).unwrap();
        s.select(2, 21).unwrap();
        let prompt = s.confirmation_prompt().unwrap();
        assert!(prompt.contains("1 unanswered questions"), "{prompt}");

        s.select(3, 31).unwrap();
        assert!(s.confirmation_prompt().is_none());
        assert_eq!(s.answered_count(), 3);
    }

    #[test]
    fn countdown_only_with_due_date() {
        let mut s = session(1);
        let now = Utc::now();
        assert!(s.countdown(now).is_none());

        s.attempt.due_at = Some(now - chrono::Duration::seconds(5));
        assert_eq!(s.countdown(now), Some(Countdown::Expired));
    }
}
