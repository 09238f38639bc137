//! In-memory backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use testdesk_core::model::{
    AnswerSubmission, AssignedTests, Assignment, AssignmentStatus, QuestionRef, ResultScores,
    RetakeResponse, StudentAnswer, SubmitSummary, TestAttempt, TestHistory, TestRef, TestResult,
    UNANSWERED,
};
use testdesk_core::traits::TestsApi;
use testdesk_core::ApiError;

/// Endpoint selector for injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Start,
    Submit,
    Results,
    History,
    Retake,
    Attempt,
}

/// A [`TestsApi`] that serves canned data and grades submissions locally.
///
/// Grading uses each option's `is_correct` flag. A successful submit stores
/// the graded result so a later `test_results` call returns it; a test with
/// no stored result answers 400 like an ungraded attempt on the backend.
#[derive(Default)]
pub struct MockTestsApi {
    assigned: AssignedTests,
    attempts: HashMap<u64, TestAttempt>,
    histories: HashMap<u64, TestHistory>,
    results: Mutex<HashMap<u64, TestResult>>,
    failures: HashMap<(Endpoint, u64), (u16, String)>,
    submit_failures: AtomicU32,
    submit_calls: AtomicU32,
    last_submission: Mutex<Option<Vec<AnswerSubmission>>>,
    retakes: Mutex<Vec<(u64, Option<DateTime<Utc>>)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockTestsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assigned(mut self, assigned: AssignedTests) -> Self {
        self.assigned = assigned;
        self
    }

    pub fn with_attempt(mut self, test_id: u64, attempt: TestAttempt) -> Self {
        self.attempts.insert(test_id, attempt);
        self
    }

    pub fn with_history(mut self, test_id: u64, history: TestHistory) -> Self {
        self.histories.insert(test_id, history);
        self
    }

    pub fn with_result(self, test_id: u64, result: TestResult) -> Self {
        lock(&self.results).insert(test_id, result);
        self
    }

    /// Answer every call to `endpoint` for `test_id` with an HTTP error.
    pub fn failing(mut self, endpoint: Endpoint, test_id: u64, status: u16, message: &str) -> Self {
        self.failures
            .insert((endpoint, test_id), (status, message.to_string()));
        self
    }

    /// Fail the next `n` submits with a 500.
    pub fn failing_submits(self, n: u32) -> Self {
        self.submit_failures.store(n, Ordering::Relaxed);
        self
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    pub fn last_submission(&self) -> Option<Vec<AnswerSubmission>> {
        lock(&self.last_submission).clone()
    }

    pub fn retakes(&self) -> Vec<(u64, Option<DateTime<Utc>>)> {
        lock(&self.retakes).clone()
    }

    fn check(&self, endpoint: Endpoint, test_id: u64) -> Result<(), ApiError> {
        match self.failures.get(&(endpoint, test_id)) {
            Some((status, message)) => Err(ApiError::from_status(*status, message.clone())),
            None => Ok(()),
        }
    }

    fn grade(attempt: &TestAttempt, answers: &[AnswerSubmission]) -> TestResult {
        let mut graded = Vec::with_capacity(attempt.questions.len());
        for (i, question) in attempt.questions.iter().enumerate() {
            let selected = answers
                .iter()
                .find(|a| a.question_id == question.id)
                .map_or(UNANSWERED, |a| a.selected_option_id);
            let correct = question.options.iter().find(|o| o.is_correct == Some(true));
            let chosen = question.options.iter().find(|o| o.id == selected);
            let is_correct = selected != UNANSWERED && correct.is_some_and(|c| c.id == selected);

            graded.push(StudentAnswer {
                id: i as u64 + 1,
                question: QuestionRef {
                    id: question.id,
                    text: question.text.clone(),
                },
                question_marks: question.marks,
                selected_option_text: chosen.map(|o| o.text.clone()),
                correct_option_text: correct.map(|o| o.text.clone()),
                is_correct,
                marks_obtained: if is_correct { question.marks } else { 0 },
            });
        }

        let obtained: u32 = graded.iter().map(|a| a.marks_obtained).sum();
        let total: u32 = attempt.questions.iter().map(|q| q.marks).sum();
        let percentage = if total == 0 {
            0.0
        } else {
            f64::from(obtained) / f64::from(total) * 100.0
        };

        TestResult {
            test: attempt.test.clone(),
            attempt_number: attempt.attempt_number,
            status: AssignmentStatus::Evaluated,
            results: ResultScores {
                obtained_marks: obtained,
                total_marks: total,
                percentage,
            },
            answers: graded,
        }
    }
}

#[async_trait]
impl TestsApi for MockTestsApi {
    async fn assigned_tests(&self) -> Result<AssignedTests, ApiError> {
        Ok(self.assigned.clone())
    }

    async fn start_test(&self, test_id: u64) -> Result<TestAttempt, ApiError> {
        self.check(Endpoint::Start, test_id)?;
        self.attempts
            .get(&test_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Test not found.".to_string()))
    }

    async fn submit_test(
        &self,
        test_id: u64,
        answers: &[AnswerSubmission],
    ) -> Result<SubmitSummary, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_submission) = Some(answers.to_vec());
        self.check(Endpoint::Submit, test_id)?;

        let pending = self.submit_failures.load(Ordering::Relaxed);
        if pending > 0 {
            self.submit_failures.store(pending - 1, Ordering::Relaxed);
            return Err(ApiError::from_status(
                500,
                "Internal server error".to_string(),
            ));
        }

        let attempt = self
            .attempts
            .get(&test_id)
            .ok_or_else(|| ApiError::NotFound("Test not found.".to_string()))?;
        let result = Self::grade(attempt, answers);
        let summary = SubmitSummary {
            message: "Test submitted successfully".to_string(),
            assignment_id: attempt.assignment_id.unwrap_or_default(),
            attempt_number: attempt.attempt_number,
            obtained_marks: result.results.obtained_marks,
            total_marks: result.results.total_marks,
            correct_answers: result.answers.iter().filter(|a| a.is_correct).count() as u32,
            total_questions: result.answers.len() as u32,
            percentage: result.results.percentage,
            evaluated_at: Some(Utc::now()),
        };
        lock(&self.results).insert(test_id, result);
        Ok(summary)
    }

    async fn test_results(&self, test_id: u64) -> Result<TestResult, ApiError> {
        self.check(Endpoint::Results, test_id)?;
        lock(&self.results)
            .get(&test_id)
            .cloned()
            .ok_or_else(|| ApiError::from_status(400, "Test not completed yet.".to_string()))
    }

    async fn test_history(&self, test_id: u64) -> Result<TestHistory, ApiError> {
        self.check(Endpoint::History, test_id)?;
        self.histories
            .get(&test_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("No attempts found for this test.".to_string()))
    }

    async fn retake_test(
        &self,
        test_id: u64,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<RetakeResponse, ApiError> {
        self.check(Endpoint::Retake, test_id)?;
        let mut retakes = lock(&self.retakes);
        retakes.push((test_id, due_at));

        let previous = self
            .histories
            .get(&test_id)
            .map_or(1, |h| h.attempts.len() as u32);
        let requested = retakes.iter().filter(|(id, _)| *id == test_id).count() as u32;
        let attempt_number = previous + requested;

        Ok(RetakeResponse {
            message: "Retake assigned successfully".to_string(),
            assignment: Assignment {
                id: 1000 + u64::from(attempt_number),
                student: "mock-student".to_string(),
                test: TestRef::Id(test_id),
                attempt_number,
                status: AssignmentStatus::Assigned,
                obtained_marks: None,
                total_marks: None,
                assigned_at: Utc::now(),
                started_at: None,
                submitted_at: None,
                evaluated_at: None,
                due_at,
            },
        })
    }

    async fn test_attempt(
        &self,
        test_id: u64,
        attempt_number: u32,
    ) -> Result<Assignment, ApiError> {
        self.check(Endpoint::Attempt, test_id)?;
        self.histories
            .get(&test_id)
            .and_then(|h| {
                h.attempts
                    .iter()
                    .find(|a| a.attempt_number == attempt_number)
            })
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Attempt not found.".to_string()))
    }
}
