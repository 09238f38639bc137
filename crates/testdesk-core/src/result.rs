//! Result viewer: read-only projection of a graded attempt.

use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::error::ApiError;
use crate::model::{percentage, AssignmentStatus, StudentAnswer, TestResult};
use crate::traits::TestsApi;

const RESULTS_PENDING: &str =
    "Your test results are not available yet or this test has not been completed.";

/// Coarse grading band used to colour a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_percentage(pct: u32) -> Self {
        match pct {
            80.. => ScoreBand::Excellent,
            60..=79 => ScoreBand::Good,
            40..=59 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Per-question grading outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
}

impl fmt::Display for AnswerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerOutcome::Correct => f.write_str("Correct"),
            AnswerOutcome::Incorrect => f.write_str("Incorrect"),
        }
    }
}

/// Position in the per-question review, clamped to the answer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCursor {
    index: usize,
    len: usize,
}

impl ReviewCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.len == 0 || self.index == self.len - 1
    }

    pub fn next(&mut self) -> usize {
        if !self.is_last() {
            self.index += 1;
        }
        self.index
    }

    pub fn prev(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    /// Jump to `index`, clamped to the last answer.
    pub fn jump(&mut self, index: usize) -> usize {
        self.index = index.min(self.len.saturating_sub(1));
        self.index
    }
}

/// A graded attempt prepared for display.
#[derive(Debug, Clone)]
pub struct ResultView {
    result: TestResult,
}

impl ResultView {
    pub fn new(result: TestResult) -> Self {
        Self { result }
    }

    pub fn result(&self) -> &TestResult {
        &self.result
    }

    pub fn title(&self) -> &str {
        &self.result.test.title
    }

    pub fn attempt_number(&self) -> u32 {
        self.result.attempt_number
    }

    pub fn status(&self) -> &AssignmentStatus {
        &self.result.status
    }

    pub fn obtained_marks(&self) -> u32 {
        self.result.results.obtained_marks
    }

    /// Total marks, falling back to the test's total when the score block omits it.
    pub fn total_marks(&self) -> u32 {
        match self.result.results.total_marks {
            0 => self.result.test.total_marks,
            total => total,
        }
    }

    /// `obtained / total × 100`, rounded for display.
    pub fn percentage(&self) -> u32 {
        percentage(self.obtained_marks(), self.total_marks())
    }

    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage())
    }

    pub fn answers(&self) -> &[StudentAnswer] {
        &self.result.answers
    }

    pub fn question_count(&self) -> usize {
        self.result.answers.len()
    }

    pub fn correct_count(&self) -> usize {
        self.result.answers.iter().filter(|a| a.is_correct).count()
    }

    pub fn outcome(&self, index: usize) -> Option<AnswerOutcome> {
        self.result.answers.get(index).map(|a| {
            if a.is_correct {
                AnswerOutcome::Correct
            } else {
                AnswerOutcome::Incorrect
            }
        })
    }

    /// Correct option text to reveal, only for incorrect answers.
    pub fn correction(&self, index: usize) -> Option<&str> {
        self.result
            .answers
            .get(index)
            .filter(|a| !a.is_correct)
            .and_then(|a| a.correct_option_text.as_deref())
    }

    pub fn cursor(&self) -> ReviewCursor {
        ReviewCursor::new(self.question_count())
    }
}

/// What the result screen shows.
#[derive(Debug, Clone)]
pub enum ResultOutcome {
    Available(ResultView),
    /// `requires_login` is set when the session is gone and signing in again
    /// is the only way forward.
    NotAvailable {
        message: String,
        requires_login: bool,
    },
}

/// Fetches graded results. Never retries and never caches.
pub struct ResultViewer {
    api: Arc<dyn TestsApi>,
}

impl ResultViewer {
    pub fn new(api: Arc<dyn TestsApi>) -> Self {
        Self { api }
    }

    /// Load results; any failure becomes [`ResultOutcome::NotAvailable`].
    #[instrument(skip(self))]
    pub async fn load(&self, test_id: u64) -> ResultOutcome {
        match self.api.test_results(test_id).await {
            Ok(result) => ResultOutcome::Available(ResultView::new(result)),
            Err(e) => {
                tracing::warn!("results unavailable: {e}");
                ResultOutcome::NotAvailable {
                    message: not_available_message(&e),
                    requires_login: e.requires_login(),
                }
            }
        }
    }
}

fn not_available_message(err: &ApiError) -> String {
    match err {
        ApiError::Api { status: 400, .. } => RESULTS_PENDING.to_string(),
        other => other.user_message("load test results"),
    }
}
