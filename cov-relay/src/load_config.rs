//! `load_config` module: reads the YAML run configuration and the credential
//! secrets from the environment, producing a [`RelayConfig`].
//!
//! This is the only place where user-supplied YAML is parsed and mapped to
//! the core's strongly-typed [`ProcessorConfig`].
//!
//! # Sources
//! - The YAML file holds everything that is not secret: base directory,
//!   projects, policy switches, reject list, timeout and the non-secret
//!   parts of a structured API token.
//! - Secrets come from the environment only: [`PROJECT_TOKEN_ENV`] or
//!   [`API_TOKEN_ENV`]. [`URL_ENV`] supplies the service URL when the file
//!   has none.
//!
//! A relative `base_dir` is resolved against the directory containing the
//! config file. Project paths stay relative to `base_dir`.
//!
//! # Errors
//! All errors are `anyhow::Error` with context, surfaced at the CLI boundary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cov_relay_core::credential::{ApiTokenConfig, Credential};
use cov_relay_core::discovery::Project;
use cov_relay_core::policy::FailurePolicy;
use cov_relay_core::ProcessorConfig;
use serde::Deserialize;
use tracing::{error, info};

pub const PROJECT_TOKEN_ENV: &str = "CODACY_PROJECT_TOKEN";
pub const API_TOKEN_ENV: &str = "CODACY_API_TOKEN";
pub const URL_ENV: &str = "CODACY_URL";

/// Non-secret half of a structured API token.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenSection {
    pub username: String,
    pub project_name: String,
    pub provider: String,
}

/// The YAML file as written by the user.
#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(flatten)]
    pub policy: FailurePolicy,
    #[serde(default = "default_true")]
    pub ignore_test_build_directory: bool,
    #[serde(default)]
    pub report_reject_list: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub api_token: Option<ApiTokenSection>,
}

fn default_true() -> bool {
    true
}

/// Everything the CLI needs for one run.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub processor: ProcessorConfig,
    /// HTTP timeout for every call to the coverage service.
    pub timeout: Option<Duration>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RelayConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let file: FileConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let config_dir = path_ref.parent().unwrap_or_else(|| Path::new(""));
    let relay = from_file(file, config_dir)?;
    info!(
        config_path = ?path_ref,
        base_dir = %relay.processor.base_dir.display(),
        projects = relay.processor.projects.len(),
        credential = relay.processor.credential.kind(),
        url_set = relay.processor.url.is_some(),
        "Configuration loaded"
    );
    Ok(relay)
}

/// Combines a parsed file with the environment.
pub fn from_file(file: FileConfig, config_dir: &Path) -> Result<RelayConfig> {
    let credential = credential_from_env(file.api_token)?;

    let base_dir = if file.base_dir.is_absolute() {
        file.base_dir
    } else {
        config_dir.join(file.base_dir)
    };
    let url = file.url.or_else(|| env_value(URL_ENV));

    Ok(RelayConfig {
        processor: ProcessorConfig {
            credential,
            url,
            projects: file.projects,
            base_dir,
            policy: file.policy,
            ignore_test_build_directory: file.ignore_test_build_directory,
            report_reject_list: file.report_reject_list,
        },
        timeout: file.timeout_secs.map(Duration::from_secs),
    })
}

fn credential_from_env(section: Option<ApiTokenSection>) -> Result<Credential> {
    let token = env_value(PROJECT_TOKEN_ENV);
    let api_token = match (env_value(API_TOKEN_ENV), section) {
        (Some(secret), Some(section)) => Some(ApiTokenConfig {
            api_token: secret,
            username: section.username,
            project_name: section.project_name,
            provider: section.provider,
        }),
        (Some(_), None) => {
            return Err(anyhow!(
                "{API_TOKEN_ENV} is set but the config file has no api_token section \
                 (username, project_name, provider)"
            ))
        }
        (None, _) => None,
    };
    Credential::from_parts(token, api_token).context("Invalid coverage service credential")
}

/// Reads an environment variable, treating blank values as unset.
fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
