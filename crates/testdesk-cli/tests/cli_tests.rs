//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn testdesk() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("testdesk").unwrap()
}

/// A command isolated from the user's config and tokens.
fn isolated(dir: &TempDir, api_url: &str) -> Command {
    let mut cmd = testdesk();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("TESTDESK_API_URL", api_url)
        .env("TESTDESK_TOKEN_FILE", dir.path().join("tokens.json"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_tokens(dir: &TempDir) {
    std::fs::write(
        dir.path().join("tokens.json"),
        r#"{"access_token": "acc", "refresh_token": "ref"}"#,
    )
    .unwrap();
}

fn token_file(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("tokens.json")
}

fn attempt_json() -> serde_json::Value {
    serde_json::json!({
        "assignment_id": 5,
        "test": {"id": 7, "title": "Geography Quiz", "total_marks": 2},
        "attempt_number": 1,
        "questions": [
            {"id": 1, "text": "Capital of France?", "marks": 1,
             "options": [{"id": 11, "text": "Paris"}, {"id": 12, "text": "Rome"}]},
            {"id": 2, "text": "Longest river?", "marks": 1,
             "options": [{"id": 21, "text": "Nile"}, {"id": 22, "text": "Thames"}]}
        ]
    })
}

#[test]
fn help_lists_commands() {
    testdesk()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("take"))
        .stdout(predicate::str::contains("results"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    testdesk()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created testdesk.toml"));

    assert!(dir.path().join("testdesk.toml").exists());

    testdesk()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_file_is_an_error() {
    testdesk()
        .args(["--config", "nonexistent.toml", "tests"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn commands_require_login() {
    let dir = TempDir::new().unwrap();
    isolated(&dir, "http://127.0.0.1:9")
        .args(["take", "7", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("testdesk login"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_then_list_tests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/student/login/"))
        .and(body_json(serde_json::json!({
            "email": "ada@example.com",
            "password": "pw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "acc",
            "refresh": "ref",
            "user": {"id": "u1", "name": "Ada", "email": "ada@example.com",
                     "role": "STUDENT", "is_profile_completed": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tests/student/my-tests/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 1,
            "assignments": [{
                "id": 5, "student": "u1",
                "test": {"id": 7, "title": "Geography Quiz", "total_marks": 2},
                "attempt_number": 1, "status": "assigned",
                "assigned_at": "2025-03-01T10:00:00Z"
            }]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    isolated(&dir, &server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "pw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ada"));
    assert!(token_file(&dir).exists());

    isolated(&dir, &server.uri())
        .arg("tests")
        .assert()
        .success()
        .stdout(predicate::str::contains("Geography Quiz"))
        .stdout(predicate::str::contains("Not Started"))
        .stdout(predicate::str::contains("1 assigned"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn take_submits_every_question() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/start/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(attempt_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tests/student/submit/7/"))
        .and(body_json(serde_json::json!([
            {"question_id": 1, "selected_option_id": 11},
            {"question_id": 2, "selected_option_id": 0}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Test submitted successfully",
            "assignment_id": 5,
            "attempt_number": 1,
            "obtained_marks": 1,
            "total_marks": 2,
            "correct_answers": 1,
            "total_questions": 2,
            "percentage": 50.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["take", "7", "--answers", "1=A", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Geography Quiz"))
        .stdout(predicate::str::contains("Unanswered: Q2"))
        .stdout(predicate::str::contains("Score: 1 / 2 (50%)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn declined_confirmation_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/start/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(attempt_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tests/student/submit/7/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["take", "7", "--answers", "1=A"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 unanswered questions"))
        .stdout(predicate::str::contains("Submission cancelled"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forbidden_start_shows_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/start/7/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": "Complete profile before starting test."
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["take", "7", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("complete your profile"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ungraded_results_are_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/result/7/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "Test not completed yet."})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["results", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not available yet"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn results_review_reveals_corrections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/result/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "test": {"id": 7, "title": "Geography Quiz", "total_marks": 2},
            "attempt_number": 1,
            "status": "evaluated",
            "results": {"obtained_marks": 1, "total_marks": 2, "percentage": 50.0},
            "answers": [
                {"id": 1, "question": {"id": 1, "text": "Capital of France?"}, "question_marks": 1,
                 "selected_option_text": "Paris", "correct_option_text": "Paris",
                 "is_correct": true, "marks_obtained": 1},
                {"id": 2, "question": {"id": 2, "text": "Longest river?"}, "question_marks": 1,
                 "selected_option_text": null, "correct_option_text": "Nile",
                 "is_correct": false, "marks_obtained": 0}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["results", "7", "--review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 1 / 2 (50%), fair"))
        .stdout(predicate::str::contains("Not answered"))
        .stdout(predicate::str::contains("Correct answer: Nile"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn history_shows_attempt_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/test/7/history/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "test": {"id": 7, "title": "Geography Quiz", "total_marks": 2},
            "total_attempts": 2,
            "attempts": [
                {"id": 5, "student": "u1", "test": 7, "attempt_number": 1, "status": "evaluated",
                 "obtained_marks": 2, "total_marks": 2, "assigned_at": "2025-03-01T10:00:00Z"},
                {"id": 6, "student": "u1", "test": 7, "attempt_number": 2, "status": "started",
                 "assigned_at": "2025-03-02T10:00:00Z"}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["history", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Geography Quiz: 2 attempt(s)"))
        .stdout(predicate::str::contains("Score: 2 / 2 (100%)"))
        .stdout(predicate::str::contains("In Progress"))
        .stdout(predicate::str::contains("An attempt is in progress"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_session_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/my-tests/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/token/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .arg("tests")
        .assert()
        .failure()
        .stderr(predicate::str::contains("session has expired"))
        .stderr(predicate::str::contains("testdesk login"));

    assert!(!Path::new(&token_file(&dir)).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_session_blocks_results_and_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/result/7/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tests/student/test/7/history/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/token/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["results", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session has expired"))
        .stderr(predicate::str::contains("testdesk login"));
    assert!(!token_file(&dir).exists());

    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["history", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("testdesk login"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attempt_shows_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tests/student/test/7/attempt/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 6, "student": "u1",
            "test": {"id": 7, "title": "Geography Quiz", "total_marks": 2},
            "attempt_number": 2, "status": "evaluated",
            "obtained_marks": 1, "total_marks": 2,
            "assigned_at": "2025-03-02T10:00:00Z",
            "evaluated_at": "2025-03-02T11:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tests/student/test/7/attempt/9/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "Attempt not found."
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["attempt", "7", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Geography Quiz attempt 2"))
        .stdout(predicate::str::contains("Evaluated: 2025-03-02 11:00"))
        .stdout(predicate::str::contains("Score: 1 / 2 (50%)"));

    isolated(&dir, &server.uri())
        .args(["attempt", "7", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not available"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retake_sends_due_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tests/student/retake/7/"))
        .and(body_json(serde_json::json!({"due_at": "2025-06-01T12:00:00Z"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "message": "Retake assigned successfully",
            "assignment": {
                "id": 9, "student": "u1", "test": 7, "attempt_number": 3,
                "status": "assigned", "assigned_at": "2025-05-20T09:00:00Z",
                "due_at": "2025-06-01T12:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .args(["retake", "7", "--due-at", "2025-06-01T12:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Retake assigned successfully"))
        .stdout(predicate::str::contains("Attempt 3 assigned."))
        .stdout(predicate::str::contains("Due: 2025-06-01 12:00"))
        .stdout(predicate::str::contains("testdesk take 7"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/logout/"))
        .and(body_json(serde_json::json!({"refresh": "ref"})))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_tokens(&dir);
    isolated(&dir, &server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));
    assert!(!token_file(&dir).exists());
}
