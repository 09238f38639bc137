//! Core trait definitions for the LMS backend and user confirmation.
//!
//! `TestsApi` is implemented over HTTP by the `testdesk-client` crate; the
//! workflow types in this crate only ever talk to the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::model::{
    AnswerSubmission, AssignedTests, Assignment, RetakeResponse, SubmitSummary, TestAttempt,
    TestHistory, TestResult,
};

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Student-facing test endpoints of the LMS backend.
#[async_trait]
pub trait TestsApi: Send + Sync {
    /// Tests assigned to the signed-in student.
    async fn assigned_tests(&self) -> Result<AssignedTests, ApiError>;

    /// Open an attempt and fetch its question set.
    async fn start_test(&self, test_id: u64) -> Result<TestAttempt, ApiError>;

    /// Submit the finalized answer set for the current attempt.
    async fn submit_test(
        &self,
        test_id: u64,
        answers: &[AnswerSubmission],
    ) -> Result<SubmitSummary, ApiError>;

    /// Graded outcome of the latest completed attempt.
    async fn test_results(&self, test_id: u64) -> Result<TestResult, ApiError>;

    /// All attempts at a test.
    async fn test_history(&self, test_id: u64) -> Result<TestHistory, ApiError>;

    /// Ask the backend for a new attempt.
    async fn retake_test(
        &self,
        test_id: u64,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<RetakeResponse, ApiError>;

    /// A single attempt by number.
    async fn test_attempt(&self, test_id: u64, attempt_number: u32)
        -> Result<Assignment, ApiError>;
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Asks the user a yes/no question before an irreversible action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt with the same value.
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
