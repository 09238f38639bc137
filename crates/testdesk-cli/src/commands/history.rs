//! The `testdesk history` and `testdesk attempt` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use testdesk_core::history::{status_detail, status_label, HistoryOutcome, HistoryViewer};
use testdesk_core::model::AssignmentStatus;
use testdesk_core::traits::TestsApi;

use super::{api_error, connect, fmt_time, login_hint, require_login};

pub async fn execute(config: Option<PathBuf>, test_id: u64) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    let view = match HistoryViewer::new(client).load(test_id).await {
        HistoryOutcome::Available(view) => view,
        HistoryOutcome::NotAvailable {
            message,
            requires_login,
        } => {
            if requires_login {
                return Err(login_hint(&message));
            }
            println!("{message}");
            return Ok(());
        }
    };

    println!("{}: {} attempt(s)", view.test().title, view.total_attempts());

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Status", "Assigned", "Submitted", "Details"]);
    for a in view.attempts() {
        table.add_row(vec![
            Cell::new(a.attempt_number),
            Cell::new(status_label(&a.status).render()),
            Cell::new(fmt_time(Some(a.assigned_at))),
            Cell::new(fmt_time(a.submitted_at)),
            Cell::new(status_detail(a)),
        ]);
    }
    println!("{table}");

    if !view.can_start_new_attempt() {
        println!("An attempt is in progress. Finish it with `testdesk take {test_id}`.");
    } else if view.latest().is_some_and(|a| a.status.is_terminal()) {
        println!("Request another attempt with `testdesk retake {test_id}`.");
    }
    Ok(())
}

pub async fn attempt(config: Option<PathBuf>, test_id: u64, number: u32) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    let a = client
        .test_attempt(test_id, number)
        .await
        .map_err(|e| api_error(e, "load attempt"))?;

    println!(
        "{} attempt {}: {}",
        a.test.title().unwrap_or("Test"),
        a.attempt_number,
        status_label(&a.status).render()
    );
    println!("Assigned:  {}", fmt_time(Some(a.assigned_at)));
    println!("Started:   {}", fmt_time(a.started_at));
    println!("Submitted: {}", fmt_time(a.submitted_at));
    if a.status == AssignmentStatus::Evaluated {
        println!("Evaluated: {}", fmt_time(a.evaluated_at));
    }
    if a.due_at.is_some() {
        println!("Due:       {}", fmt_time(a.due_at));
    }
    println!("{}", status_detail(&a));
    Ok(())
}
