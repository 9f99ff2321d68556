use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{tempdir, TempDir};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JACOCO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<report name="app">
  <package name="org/demo">
    <sourcefile name="Main.java">
      <line nr="1" mi="0" ci="3" mb="0" cb="0"/>
      <line nr="2" mi="1" ci="0" mb="0" cb="0"/>
    </sourcefile>
  </package>
</report>
"#;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lays out `<tmp>/repo` with one JVM module and writes `<tmp>/cov-relay.yaml`.
fn workspace(extra_config: &str) -> TempDir {
    let tmp = tempdir().unwrap();
    let repo = tmp.path().join("repo");
    write(&repo.join("app/src/main/java/org/demo/Main.java"), "class Main {}\n");
    write(&repo.join("app/target/site/jacoco/jacoco.xml"), JACOCO);
    write(
        &tmp.path().join("cov-relay.yaml"),
        &format!(
            "base_dir: repo\nprojects:\n  - compile_source_roots: [app/src/main/java]\n    build:\n      directory: app/target\n      test_output_directory: app/target/test-classes\n{extra_config}"
        ),
    );
    tmp
}

fn cov_relay(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cov-relay").expect("Binary exists");
    cmd.current_dir(dir)
        .env("CODACY_PROJECT_TOKEN", "s3cr3t-value")
        .env_remove("CODACY_API_TOKEN")
        .env_remove("CODACY_URL")
        .env("RUST_LOG", "info");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn report_cli_happy_flow_submits_to_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/coverage/abc123/Java"))
        .and(query_param("partial", "false"))
        .and(header("project-token", "s3cr3t-value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = workspace("");
    cov_relay(tmp.path())
        .args(["report", "--config", "cov-relay.yaml", "--commit", "abc123"])
        .arg("--url")
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 report(s)"))
        .stdout(predicate::str::contains("Java: 1 report(s), 1 submitted, 0 failed"))
        .stderr(predicate::str::contains("s3cr3t-value").not());
}

#[test]
fn missing_config_file_fails() {
    let tmp = tempdir().unwrap();
    cov_relay(tmp.path())
        .args(["report", "--config", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn conflicting_credentials_fail_before_any_work() {
    let tmp = workspace("api_token: {username: acme, project_name: widgets, provider: gh}\n");
    cov_relay(tmp.path())
        .env("CODACY_API_TOKEN", "a-token")
        .args(["report", "--config", "cov-relay.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("both a project token and an API token"));
}

#[test]
fn missing_base_directory_fails() {
    let tmp = workspace("");
    cov_relay(tmp.path())
        .args(["report", "--config", "cov-relay.yaml", "--base-dir", "elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project base directory not found"));
}

#[test]
fn no_reports_is_a_no_op_when_not_required() {
    let tmp = workspace("fail_on_report_not_found: false\nreport_reject_list: [jacoco]\n");
    cov_relay(tmp.path())
        .args(["report", "--config", "cov-relay.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 0 report(s)"));

    let strict = workspace("report_reject_list: [jacoco]\n");
    cov_relay(strict.path())
        .args(["report", "--config", "cov-relay.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no coverage reports found"));
}

#[test]
fn missing_url_fails_with_configuration_error() {
    let tmp = workspace("");
    cov_relay(tmp.path())
        .args(["report", "--config", "cov-relay.yaml", "--commit", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coverage service URL is not configured"));
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use cov_relay::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Report {
            config: std::path::PathBuf::from("dummy.yaml"),
            url: None,
            base_dir: None,
            commit: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
