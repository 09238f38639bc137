//! The `testdesk retake` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};

use testdesk_core::traits::TestsApi;

use super::{api_error, connect, fmt_time, require_login};

pub async fn execute(
    config: Option<PathBuf>,
    test_id: u64,
    due_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    let response = client
        .retake_test(test_id, due_at)
        .await
        .map_err(|e| api_error(e, "request a retake"))?;

    if !response.message.is_empty() {
        println!("{}", response.message);
    }
    let assignment = &response.assignment;
    println!("Attempt {} assigned.", assignment.attempt_number);
    if assignment.due_at.is_some() {
        println!("Due: {}", fmt_time(assignment.due_at));
    }
    println!("Start it with `testdesk take {test_id}`.");
    Ok(())
}
