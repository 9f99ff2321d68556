use std::collections::BTreeMap;
use std::time::Duration;

use cov_relay::codacy::CodacyClient;
use cov_relay_core::contract::{
    CoverageService, RepositoryMetadata, SubmitEndRequest, SubmitRequest,
};
use cov_relay_core::coverage::{CoverageReport, FileCoverage};
use cov_relay_core::credential::{ApiTokenConfig, Credential};
use cov_relay_core::language::Language;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repository() -> RepositoryMetadata {
    RepositoryMetadata {
        commit: "c0ffee".into(),
        branch: Some("main".into()),
    }
}

fn report() -> CoverageReport {
    CoverageReport::new(vec![FileCoverage::new(
        "app/src/main/java/org/demo/Main.java",
        BTreeMap::from([(3, 1), (4, 0)]),
    )])
}

fn request(server: &MockServer, credential: Credential, partial: bool) -> SubmitRequest {
    SubmitRequest {
        credential,
        language: Language::Java,
        url: server.uri(),
        repository: repository(),
        partial,
        report: report(),
    }
}

#[tokio::test]
async fn project_token_report_is_posted_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/coverage/c0ffee/Java"))
        .and(query_param("partial", "false"))
        .and(header("project-token", "p-token"))
        .and(body_json(json!({
            "total": 50,
            "fileReports": [{
                "filename": "app/src/main/java/org/demo/Main.java",
                "total": 50,
                "coverage": {"3": 1, "4": 0}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "Coverage added"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = CodacyClient::new(None).unwrap();
    let result = client
        .submit(&request(&server, Credential::Token("p-token".into()), false))
        .await
        .expect("submission succeeds");

    assert!(result.success);
}

#[tokio::test]
async fn api_token_uses_repository_scoped_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/gh/acme/widgets/commit/c0ffee/coverage/Java"))
        .and(query_param("partial", "true"))
        .and(header("api-token", "a-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2.0/gh/acme/widgets/commit/c0ffee/coverageFinal"))
        .and(header("api-token", "a-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let credential = Credential::ApiToken(ApiTokenConfig {
        api_token: "a-token".into(),
        username: "acme".into(),
        project_name: "widgets".into(),
        provider: "gh".into(),
    });
    let client = CodacyClient::new(None).unwrap();

    let submitted = client
        .submit(&request(&server, credential.clone(), true))
        .await
        .unwrap();
    let finalized = client
        .submit_end(&SubmitEndRequest {
            credential,
            language: Language::Java,
            url: server.uri(),
            repository: repository(),
        })
        .await
        .unwrap();

    assert!(submitted.success && finalized.success);
}

#[tokio::test]
async fn project_token_end_call_targets_commit_final() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/commit/c0ffee/coverageFinal"))
        .and(header("project-token", "p-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = CodacyClient::new(None).unwrap();
    let result = client
        .submit_end(&SubmitEndRequest {
            credential: Credential::Token("p-token".into()),
            language: Language::Kotlin,
            url: format!("{}/", server.uri()),
            repository: repository(),
        })
        .await
        .unwrap();

    assert!(result.success);
}

#[tokio::test]
async fn error_status_is_a_failure_with_the_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let client = CodacyClient::new(None).unwrap();
    let err = client
        .submit(&request(&server, Credential::Token("p-token".into()), false))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("invalid token"), "{message}");
}

#[tokio::test]
async fn error_body_on_success_status_is_an_unsuccessful_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "commit not found"})))
        .mount(&server)
        .await;

    let client = CodacyClient::new(None).unwrap();
    let result = client
        .submit(&request(&server, Credential::Token("p-token".into()), false))
        .await
        .unwrap();

    assert!(!result.success);
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = CodacyClient::new(Some(Duration::from_millis(200))).unwrap();
    let outcome = client
        .submit(&request(&server, Credential::Token("p-token".into()), false))
        .await;

    assert!(outcome.is_err());
}
