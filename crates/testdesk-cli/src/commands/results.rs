//! The `testdesk results` command.

use std::path::PathBuf;

use anyhow::Result;

use testdesk_core::history::status_label;
use testdesk_core::result::{ResultOutcome, ResultView, ResultViewer};
use testdesk_core::traits::TestsApi;

use super::{api_error, connect, login_hint, require_login};

pub async fn execute(
    config: Option<PathBuf>,
    test_id: u64,
    review: bool,
    question: Option<usize>,
    json: bool,
) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    if json {
        let result = client
            .test_results(test_id)
            .await
            .map_err(|e| api_error(e, "load test results"))?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let view = match ResultViewer::new(client).load(test_id).await {
        ResultOutcome::Available(view) => view,
        ResultOutcome::NotAvailable {
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

    println!("{} (attempt {})", view.title(), view.attempt_number());
    println!("Status: {}", status_label(view.status()).render());
    println!(
        "Score: {} / {} ({}%), {}",
        view.obtained_marks(),
        view.total_marks(),
        view.percentage(),
        view.score_band()
    );
    println!(
        "Correct answers: {} of {}",
        view.correct_count(),
        view.question_count()
    );

    if let Some(n) = question {
        let count = view.question_count();
        anyhow::ensure!(
            (1..=count).contains(&n),
            "question {n} is out of range (1-{count})"
        );
        let mut cursor = view.cursor();
        let index = cursor.jump(n - 1);
        print_answer(&view, index);

        let mut nav = Vec::new();
        if !cursor.is_first() {
            nav.push(format!("previous: --question {}", cursor.prev() + 1));
            cursor.next();
        }
        if !cursor.is_last() {
            nav.push(format!("next: --question {}", cursor.next() + 1));
        }
        if !nav.is_empty() {
            println!("\n({})", nav.join(", "));
        }
    } else if review {
        for index in 0..view.question_count() {
            print_answer(&view, index);
        }
    }
    Ok(())
}

fn print_answer(view: &ResultView, index: usize) {
    let Some(answer) = view.answers().get(index) else {
        return;
    };
    println!(
        "\nQuestion {} of {}: {}",
        index + 1,
        view.question_count(),
        answer.question.text
    );
    if let Some(outcome) = view.outcome(index) {
        println!(
            "  {outcome} ({}/{} marks)",
            answer.marks_obtained, answer.question_marks
        );
    }
    println!(
        "  Your answer: {}",
        answer
            .selected_option_text
            .as_deref()
            .unwrap_or("Not answered")
    );
    if let Some(correct) = view.correction(index) {
        println!("  Correct answer: {correct}");
    }
}
