//! Live [`CoverageService`] over HTTP.
//!
//! Two endpoint families exist, one per credential kind:
//!
//! | credential    | header          | report endpoint                                                         |
//! |---------------|-----------------|-------------------------------------------------------------------------|
//! | project token | `project-token` | `/2.0/coverage/{commit}/{language}?partial=`                            |
//! | API token     | `api-token`     | `/2.0/{provider}/{username}/{project}/commit/{commit}/coverage/{language}?partial=` |
//!
//! The end-of-submission call goes to `.../commit/{commit}/coverageFinal`
//! under the same prefix. Non-2xx responses are errors; a 2xx body carrying
//! an `error` field is an unsuccessful [`SubmissionResult`].

use std::time::Duration;

use async_trait::async_trait;
use cov_relay_core::contract::{
    CoverageService, ServiceError, SubmissionResult, SubmitEndRequest, SubmitRequest,
};
use cov_relay_core::credential::Credential;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

pub struct CodacyClient {
    http: Client,
}

impl CodacyClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let mut builder = Client::builder().user_agent(concat!("cov-relay/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        tracing::info!(?timeout, "Initialised coverage service client");
        Ok(Self { http })
    }

    fn post(&self, credential: &Credential, url: String) -> RequestBuilder {
        let (header, secret) = match credential {
            Credential::Token(token) => ("project-token", token.as_str()),
            Credential::ApiToken(config) => ("api-token", config.api_token.as_str()),
        };
        self.http.post(url).header(header, secret)
    }

    async fn send(&self, request: RequestBuilder) -> Result<SubmissionResult, ServiceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(%status, "Coverage service rejected request");
            return Err(format!("coverage service responded {status}: {body}").into());
        }

        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        match parsed.as_ref().and_then(|v| v.get("error")) {
            Some(error) => {
                tracing::warn!(%status, %error, "Coverage service reported an error");
                Ok(SubmissionResult { success: false })
            }
            None => Ok(SubmissionResult::ok()),
        }
    }
}

/// Path prefix under which `commit/{commit}/...` lives for API-token credentials,
/// or `None` for project-token credentials.
fn scoped_prefix(base: &str, credential: &Credential) -> Option<String> {
    match credential {
        Credential::Token(_) => None,
        Credential::ApiToken(config) => Some(format!(
            "{base}/2.0/{}/{}/{}",
            config.provider, config.username, config.project_name
        )),
    }
}

pub fn report_url(req: &SubmitRequest) -> String {
    let base = req.url.trim_end_matches('/');
    let commit = &req.repository.commit;
    let language = req.language.id();
    match scoped_prefix(base, &req.credential) {
        Some(prefix) => format!(
            "{prefix}/commit/{commit}/coverage/{language}?partial={}",
            req.partial
        ),
        None => format!("{base}/2.0/coverage/{commit}/{language}?partial={}", req.partial),
    }
}

pub fn final_url(req: &SubmitEndRequest) -> String {
    let base = req.url.trim_end_matches('/');
    let commit = &req.repository.commit;
    match scoped_prefix(base, &req.credential) {
        Some(prefix) => format!("{prefix}/commit/{commit}/coverageFinal"),
        None => format!("{base}/2.0/commit/{commit}/coverageFinal"),
    }
}

#[async_trait]
impl CoverageService for CodacyClient {
    async fn submit(&self, req: &SubmitRequest) -> Result<SubmissionResult, ServiceError> {
        let url = report_url(req);
        tracing::info!(
            language = %req.language,
            partial = req.partial,
            files = req.report.file_reports.len(),
            total = req.report.total,
            "Uploading coverage report"
        );
        let request = self.post(&req.credential, url).json(&req.report);
        self.send(request).await
    }

    async fn submit_end(&self, req: &SubmitEndRequest) -> Result<SubmissionResult, ServiceError> {
        let url = final_url(req);
        tracing::info!(language = %req.language, "Finalising partial coverage upload");
        let request = self.post(&req.credential, url);
        self.send(request).await
    }
}
