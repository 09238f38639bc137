//! History viewer: every attempt at a test with a display label per status.

use std::sync::Arc;

use tracing::instrument;

use crate::model::{Assignment, AssignmentStatus, TestHistory, TestSummary};
use crate::traits::TestsApi;

const HISTORY_MISSING: &str =
    "Test history is not available or you have not attempted this test yet.";

/// Icon shown next to a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Clock,
    Refresh,
    Check,
    Chart,
    Cross,
}

impl StatusIcon {
    /// Terminal glyph.
    pub fn glyph(&self) -> &'static str {
        match self {
            StatusIcon::Clock => "◷",
            StatusIcon::Refresh => "↻",
            StatusIcon::Check => "✓",
            StatusIcon::Chart => "▤",
            StatusIcon::Cross => "✗",
        }
    }
}

/// Display text and icon for a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabel {
    pub text: String,
    pub icon: Option<StatusIcon>,
}

impl StatusLabel {
    fn new(text: &str, icon: StatusIcon) -> Self {
        Self {
            text: text.to_string(),
            icon: Some(icon),
        }
    }

    /// Icon glyph followed by the text, or just the text.
    pub fn render(&self) -> String {
        match self.icon {
            Some(icon) => format!("{} {}", icon.glyph(), self.text),
            None => self.text.clone(),
        }
    }
}

/// Status → label lookup. Unknown statuses display verbatim without an icon.
pub fn status_label(status: &AssignmentStatus) -> StatusLabel {
    match status {
        AssignmentStatus::Assigned => StatusLabel::new("Not Started", StatusIcon::Clock),
        AssignmentStatus::Started => StatusLabel::new("In Progress", StatusIcon::Refresh),
        AssignmentStatus::Submitted => StatusLabel::new("Submitted", StatusIcon::Check),
        AssignmentStatus::Evaluated => StatusLabel::new("Evaluated", StatusIcon::Chart),
        AssignmentStatus::Cancelled => StatusLabel::new("Cancelled", StatusIcon::Cross),
        AssignmentStatus::Other(raw) => StatusLabel {
            text: raw.clone(),
            icon: None,
        },
    }
}

/// One-line description of an attempt.
pub fn status_detail(attempt: &Assignment) -> String {
    match &attempt.status {
        AssignmentStatus::Evaluated => match (attempt.obtained_marks, attempt.total_marks) {
            (Some(obtained), Some(total)) => match attempt.score_percent() {
                Some(pct) => format!("Score: {obtained} / {total} ({pct}%)"),
                None => format!("Score: {obtained} / {total}"),
            },
            _ => "Evaluated.".to_string(),
        },
        AssignmentStatus::Submitted => {
            "Your test has been submitted and is awaiting evaluation.".to_string()
        }
        AssignmentStatus::Started => {
            "You have started this attempt but not yet submitted it.".to_string()
        }
        AssignmentStatus::Assigned => "This attempt has been assigned to you.".to_string(),
        AssignmentStatus::Cancelled => "This attempt was cancelled.".to_string(),
        AssignmentStatus::Other(raw) => format!("Status: {raw}"),
    }
}

/// A test's attempt history prepared for display.
#[derive(Debug, Clone)]
pub struct HistoryView {
    history: TestHistory,
}

impl HistoryView {
    pub fn new(history: TestHistory) -> Self {
        Self { history }
    }

    pub fn test(&self) -> &TestSummary {
        &self.history.test
    }

    /// Attempt count as reported by the backend, or the list length if omitted.
    pub fn total_attempts(&self) -> u32 {
        match self.history.total_attempts {
            0 => self.history.attempts.len() as u32,
            n => n,
        }
    }

    pub fn attempts(&self) -> &[Assignment] {
        &self.history.attempts
    }

    /// A new attempt may not begin while another is in progress.
    pub fn can_start_new_attempt(&self) -> bool {
        !self
            .history
            .attempts
            .iter()
            .any(|a| a.status == AssignmentStatus::Started)
    }

    pub fn latest(&self) -> Option<&Assignment> {
        self.history.attempts.iter().max_by_key(|a| a.attempt_number)
    }
}

/// What the history screen shows.
#[derive(Debug, Clone)]
pub enum HistoryOutcome {
    Available(HistoryView),
    NotAvailable {
        message: String,
        requires_login: bool,
    },
}

/// Fetches attempt history.
pub struct HistoryViewer {
    api: Arc<dyn TestsApi>,
}

impl HistoryViewer {
    pub fn new(api: Arc<dyn TestsApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, test_id: u64) -> HistoryOutcome {
        match self.api.test_history(test_id).await {
            Ok(history) => HistoryOutcome::Available(HistoryView::new(history)),
            Err(e) => {
                tracing::warn!("history unavailable: {e}");
                let requires_login = e.requires_login();
                let message = match e {
                    crate::error::ApiError::NotFound(_) => HISTORY_MISSING.to_string(),
                    other => other.user_message("load test history"),
                };
                HistoryOutcome::NotAvailable {
                    message,
                    requires_login,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestRef;
    use chrono::{TimeZone, Utc};

    fn attempt(n: u32, status: AssignmentStatus, marks: Option<(u32, u32)>) -> Assignment {
        Assignment {
            id: n as u64,
            student: "s-1".into(),
            test: TestRef::Id(3),
            attempt_number: n,
            status,
            obtained_marks: marks.map(|m| m.0),
            total_marks: marks.map(|m| m.1),
            assigned_at: Utc.with_ymd_and_hms(2025, 1, n, 8, 0, 0).unwrap(),
            started_at: None,
            submitted_at: None,
            evaluated_at: None,
            due_at: None,
        }
    }

    #[test]
    fn labels_for_known_statuses() {
        assert_eq!(
            status_label(&AssignmentStatus::Assigned).text,
            "Not Started"
        );
        assert_eq!(
            status_label(&AssignmentStatus::Started).icon,
            Some(StatusIcon::Refresh)
        );
        assert_eq!(status_label(&AssignmentStatus::Submitted).text, "Submitted");
        assert_eq!(status_label(&AssignmentStatus::Evaluated).text, "Evaluated");
        assert_eq!(status_label(&AssignmentStatus::Cancelled).text, "Cancelled");
    }

    #[test]
    fn unknown_status_displays_verbatim() {
        let label = status_label(&AssignmentStatus::Other("archived".into()));
        assert_eq!(label.text, "archived");
        assert!(label.icon.is_none());
        assert_eq!(label.render(), "archived");
    }

    #[test]
    fn detail_shows_score_for_evaluated() {
        let a = attempt(1, AssignmentStatus::Evaluated, Some((3, 4)));
        assert_eq!(status_detail(&a), "Score: 3 / 4 (75%)");

        let b = attempt(2, AssignmentStatus::Submitted, None);
        assert!(status_detail(&b).contains("awaiting evaluation"));
    }

    #[test]
    fn new_attempt_blocked_while_one_is_started() {
        let view = HistoryView::new(TestHistory {
            test: TestSummary {
                id: 3,
                title: "Chemistry".into(),
                total_marks: 4,
                ..Default::default()
            },
            total_attempts: 0,
            attempts: vec![
                attempt(1, AssignmentStatus::Evaluated, Some((2, 4))),
                attempt(2, AssignmentStatus::Started, None),
            ],
        });
        assert!(!view.can_start_new_attempt());
        assert_eq!(view.total_attempts(), 2);
        assert_eq!(view.latest().map(|a| a.attempt_number), Some(2));
    }
}
