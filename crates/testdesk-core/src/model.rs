//! Core data model types for testdesk.
//!
//! These mirror the JSON the LMS backend serves for the student test
//! workflow. Every record here is owned by the backend: the client reads
//! them and never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved `selected_option_id` meaning "no answer chosen".
pub const UNANSWERED: u64 = 0;

/// Lifecycle status of an [`Assignment`].
///
/// The chain `assigned → started → submitted → evaluated` is monotonic, with
/// `cancelled` reachable from `assigned` or `started`. Unknown wire values are
/// preserved in `Other` so they can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssignmentStatus {
    Assigned,
    Started,
    Submitted,
    Evaluated,
    Cancelled,
    Other(String),
}

impl AssignmentStatus {
    /// Position in the monotonic chain. `None` for `cancelled` and unknown values.
    pub fn rank(&self) -> Option<u8> {
        match self {
            AssignmentStatus::Assigned => Some(0),
            AssignmentStatus::Started => Some(1),
            AssignmentStatus::Submitted => Some(2),
            AssignmentStatus::Evaluated => Some(3),
            AssignmentStatus::Cancelled | AssignmentStatus::Other(_) => None,
        }
    }

    /// Whether the backend may legitimately move an assignment from `self` to `next`.
    pub fn can_advance_to(&self, next: &AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, Started)
                | (Started, Submitted)
                | (Submitted, Evaluated)
                | (Assigned, Cancelled)
                | (Started, Cancelled)
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Evaluated | AssignmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Started => "started",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Evaluated => "evaluated",
            AssignmentStatus::Cancelled => "cancelled",
            AssignmentStatus::Other(s) => s,
        }
    }
}

impl From<String> for AssignmentStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "assigned" => AssignmentStatus::Assigned,
            "started" => AssignmentStatus::Started,
            "submitted" => AssignmentStatus::Submitted,
            "evaluated" => AssignmentStatus::Evaluated,
            "cancelled" | "canceled" => AssignmentStatus::Cancelled,
            _ => AssignmentStatus::Other(s),
        }
    }
}

impl From<AssignmentStatus> for String {
    fn from(status: AssignmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for AssignmentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AssignmentStatus::from(s.to_string()))
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short description of a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub total_marks: u32,
    /// Course title, when the backend includes it.
    #[serde(default)]
    pub course: Option<String>,
    /// Chapter title, when the backend includes it.
    #[serde(default)]
    pub chapter: Option<String>,
}

/// A test reference: the backend serialises either the bare id or an embedded summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRef {
    Id(u64),
    Summary(TestSummary),
}

impl TestRef {
    pub fn id(&self) -> u64 {
        match self {
            TestRef::Id(id) => *id,
            TestRef::Summary(summary) => summary.id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            TestRef::Id(_) => None,
            TestRef::Summary(summary) => Some(summary.title.as_str()),
        }
    }
}

/// One student's instance of a test attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    #[serde(default)]
    pub student: String,
    pub test: TestRef,
    #[serde(default = "default_attempt")]
    pub attempt_number: u32,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub obtained_marks: Option<u32>,
    #[serde(default)]
    pub total_marks: Option<u32>,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Rounded score for an evaluated attempt with known marks.
    pub fn score_percent(&self) -> Option<u32> {
        if self.status != AssignmentStatus::Evaluated {
            return None;
        }
        match (self.obtained_marks, self.total_marks) {
            (Some(obtained), Some(total)) if total > 0 => Some(percentage(obtained, total)),
            _ => None,
        }
    }
}

fn default_attempt() -> u32 {
    1
}

fn default_marks() -> u32 {
    1
}

fn default_result_status() -> AssignmentStatus {
    AssignmentStatus::Evaluated
}

/// A multiple-choice option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: u64,
    pub text: String,
    /// Hidden from students until the attempt is graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub text: String,
    #[serde(default = "default_marks")]
    pub marks: u32,
    #[serde(default, alias = "answers")]
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn has_option(&self, option_id: u64) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    /// Option label in display order: A, B, C, ...
    pub fn option_letter(&self, option_id: u64) -> Option<char> {
        self.options
            .iter()
            .position(|o| o.id == option_id)
            .and_then(|i| u8::try_from(i).ok())
            .filter(|i| *i < 26)
            .map(|i| (b'A' + i) as char)
    }

    /// Resolve a display letter back to an option id.
    pub fn option_by_letter(&self, letter: char) -> Option<&AnswerOption> {
        let upper = letter.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        self.options.get((upper as u8 - b'A') as usize)
    }
}

/// Payload returned when a test attempt is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttempt {
    #[serde(default)]
    pub assignment_id: Option<u64>,
    #[serde(default)]
    pub test: TestSummary,
    #[serde(default = "default_attempt")]
    pub attempt_number: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// One entry of the submit body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: u64,
    pub selected_option_id: u64,
}

/// Score summary returned by the submit call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitSummary {
    pub message: String,
    pub assignment_id: u64,
    pub attempt_number: u32,
    pub obtained_marks: u32,
    pub total_marks: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// The question an answer refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub id: u64,
    #[serde(default)]
    pub text: String,
}

/// A graded answer. Produced by the backend and never mutated client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAnswer {
    #[serde(default)]
    pub id: u64,
    pub question: QuestionRef,
    #[serde(default = "default_marks")]
    pub question_marks: u32,
    #[serde(default)]
    pub selected_option_text: Option<String>,
    #[serde(default)]
    pub correct_option_text: Option<String>,
    pub is_correct: bool,
    #[serde(default)]
    pub marks_obtained: u32,
}

/// Aggregate marks for a graded attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultScores {
    pub obtained_marks: u32,
    pub total_marks: u32,
    pub percentage: f64,
}

/// Graded outcome of a completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub test: TestSummary,
    #[serde(default = "default_attempt")]
    pub attempt_number: u32,
    #[serde(default = "default_result_status")]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub results: ResultScores,
    #[serde(default)]
    pub answers: Vec<StudentAnswer>,
}

/// All attempts a student has made at one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestHistory {
    pub test: TestSummary,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub attempts: Vec<Assignment>,
}

/// Response of the assigned-tests listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignedTests {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// Response of the retake call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetakeResponse {
    #[serde(default)]
    pub message: String,
    pub assignment: Assignment,
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Admin,
}

/// The signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub is_profile_completed: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Access and refresh tokens as persisted by the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// Login credentials.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Login response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access.clone(),
            refresh_token: self.refresh.clone(),
        }
    }
}

/// `obtained / total × 100`, rounded half up. Zero when `total` is zero.
pub fn percentage(obtained: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (obtained as f64 / total as f64 * 100.0).round() as u32
}
