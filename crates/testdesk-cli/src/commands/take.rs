//! The `testdesk take` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use testdesk_core::attempt::{
    AnswerStatus, AttemptController, AttemptError, AttemptSession, SubmitOutcome,
};
use testdesk_core::model::percentage;
use testdesk_core::traits::{AutoConfirm, Confirm};

use super::{api_error, connect, require_login};

/// Asks on stdin. End of input counts as "no".
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}

pub async fn execute(
    config: Option<PathBuf>,
    test_id: u64,
    answers: Option<String>,
    yes: bool,
) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    let controller = AttemptController::new(client);
    let mut session = controller
        .start(test_id)
        .await
        .map_err(|e| api_error(e, "load test"))?;

    let attempt = session.attempt();
    println!(
        "{} (attempt {}, {} questions, {} marks)",
        attempt.test.title,
        attempt.attempt_number,
        session.questions().len(),
        attempt.test.total_marks
    );
    if let Some(countdown) = session.countdown(Utc::now()) {
        println!("Time remaining: {countdown}");
    }

    match answers {
        Some(pairs) => apply_answers(&mut session, &pairs)?,
        None => answer_interactively(&mut session)?,
    }

    print_progress(&session);

    let auto = AutoConfirm(true);
    let ask = StdinConfirm;
    let confirm: &dyn Confirm = if yes { &auto } else { &ask };

    let outcome = controller
        .submit(&mut session, confirm)
        .await
        .map_err(|e| match e {
            AttemptError::Api(e) => api_error(e, "submit test"),
            other => anyhow::Error::new(other),
        })?;

    match outcome {
        SubmitOutcome::Submitted(summary) => {
            println!("{}", summary.message);
            println!(
                "Score: {} / {} ({}%)",
                summary.obtained_marks,
                summary.total_marks,
                percentage(summary.obtained_marks, summary.total_marks)
            );
            println!(
                "Correct answers: {} of {}",
                summary.correct_answers, summary.total_questions
            );
            println!("Review your answers with `testdesk results {test_id} --review`.");
        }
        SubmitOutcome::Cancelled => {
            println!("Submission cancelled. Your answers were not sent.");
        }
    }
    Ok(())
}

/// Apply `question_id=LETTER` pairs.
fn apply_answers(session: &mut AttemptSession, pairs: &str) -> Result<()> {
    for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (qid, letter) = pair
            .split_once('=')
            .with_context(|| format!("invalid answer '{pair}', expected QUESTION_ID=LETTER"))?;
        let qid: u64 = qid
            .trim()
            .parse()
            .with_context(|| format!("invalid question id in '{pair}'"))?;
        let option_id = resolve_letter(session, qid, letter.trim())?;
        session.select(qid, option_id)?;
    }
    Ok(())
}

fn resolve_letter(session: &AttemptSession, question_id: u64, letter: &str) -> Result<u64> {
    let question = session
        .questions()
        .iter()
        .find(|q| q.id == question_id)
        .ok_or(AttemptError::UnknownQuestion(question_id))?;

    let mut chars = letter.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        anyhow::bail!("'{letter}' is not an option letter");
    };
    question
        .option_by_letter(c)
        .map(|o| o.id)
        .with_context(|| format!("question {question_id} has no option {c}"))
}

fn answer_interactively(session: &mut AttemptSession) -> Result<()> {
    let questions = session.questions().to_vec();
    let total = questions.len();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    for (i, question) in questions.iter().enumerate() {
        println!(
            "\nQuestion {} of {} ({} marks)\n{}",
            i + 1,
            total,
            question.marks,
            question.text
        );
        for option in &question.options {
            let letter = question.option_letter(option.id).unwrap_or('?');
            println!("  {letter}) {}", option.text);
        }

        loop {
            print!("Answer (letter, Enter to skip): ");
            std::io::stdout().flush().ok();
            let Some(line) = lines.next() else {
                return Ok(());
            };
            let line = line.context("failed to read answer")?;
            let input = line.trim();
            if input.is_empty() {
                break;
            }
            match resolve_letter(session, question.id, input) {
                Ok(option_id) => {
                    session.select(question.id, option_id)?;
                    break;
                }
                Err(e) => println!("{e}"),
            }
        }
    }
    Ok(())
}

fn print_progress(session: &AttemptSession) {
    println!(
        "\nAnswered {} of {}",
        session.answered_count(),
        session.questions().len()
    );
    let open: Vec<String> = session
        .questions()
        .iter()
        .enumerate()
        .filter(|(_, q)| session.answer_status(q.id) == AnswerStatus::Unanswered)
        .map(|(i, _)| format!("Q{}", i + 1))
        .collect();
    if !open.is_empty() {
        println!("Unanswered: {}", open.join(", "));
    }
}
