//! testdesk CLI: take assigned tests from the terminal.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "testdesk",
    version,
    about = "Take assigned LMS tests from the terminal"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter testdesk.toml
    Init,

    /// Sign in with a student account
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget stored tokens
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List assigned tests
    Tests {
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Start a test, answer it, and submit
    Take {
        test_id: u64,

        /// Answers as "question_id=LETTER" pairs, e.g. "12=A,13=C"
        #[arg(long)]
        answers: Option<String>,

        /// Submit without asking about unanswered questions
        #[arg(long)]
        yes: bool,
    },

    /// Show the graded result of a completed test
    Results {
        test_id: u64,

        /// Walk through every answer
        #[arg(long)]
        review: bool,

        /// Show a single question (1-based)
        #[arg(long)]
        question: Option<usize>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// List every attempt at a test
    History { test_id: u64 },

    /// Show one attempt by number
    Attempt { test_id: u64, number: u32 },

    /// Request a new attempt at a test
    Retake {
        test_id: u64,

        /// Due date for the new attempt (RFC 3339)
        #[arg(long)]
        due_at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("testdesk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Login { email, password } => commands::auth::login(config, email, password).await,
        Commands::Logout => commands::auth::logout(config).await,
        Commands::Whoami => commands::auth::whoami(config).await,
        Commands::Tests { json } => commands::tests::execute(config, json).await,
        Commands::Take {
            test_id,
            answers,
            yes,
        } => commands::take::execute(config, test_id, answers, yes).await,
        Commands::Results {
            test_id,
            review,
            question,
            json,
        } => commands::results::execute(config, test_id, review, question, json).await,
        Commands::History { test_id } => commands::history::execute(config, test_id).await,
        Commands::Attempt { test_id, number } => {
            commands::history::attempt(config, test_id, number).await
        }
        Commands::Retake { test_id, due_at } => {
            commands::retake::execute(config, test_id, due_at).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
