//! Live [`RepositoryLocator`] backed by the `git` executable.

use std::path::Path;
use std::process::Command;

use cov_relay_core::contract::{RepositoryLocator, RepositoryMetadata, ServiceError};

/// Reads HEAD of the repository containing the base directory.
///
/// A commit given up front (e.g. from CI) takes precedence over `git rev-parse`.
#[derive(Debug, Clone, Default)]
pub struct GitCliLocator {
    commit_override: Option<String>,
}

impl GitCliLocator {
    pub fn new(commit_override: Option<String>) -> Self {
        Self { commit_override }
    }
}

fn rev_parse(dir: &Path, args: &[&str]) -> Result<String, ServiceError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .arg("rev-parse")
        .args(args)
        .output()
        .map_err(|e| format!("failed to run git in {}: {e}", dir.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "git rev-parse {} failed in {}: {}",
            args.join(" "),
            dir.display(),
            stderr.trim()
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl RepositoryLocator for GitCliLocator {
    fn locate(&self, base_dir: &Path) -> Result<RepositoryMetadata, ServiceError> {
        let commit = match &self.commit_override {
            Some(commit) => commit.clone(),
            None => rev_parse(base_dir, &["HEAD"])?,
        };
        if commit.is_empty() {
            return Err("git reported an empty commit".into());
        }

        // Detached HEAD reports the literal "HEAD".
        let branch = match rev_parse(base_dir, &["--abbrev-ref", "HEAD"]) {
            Ok(branch) if branch != "HEAD" && !branch.is_empty() => Some(branch),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Could not determine branch");
                None
            }
        };

        tracing::info!(commit = %commit, branch = ?branch, "Located repository HEAD");
        Ok(RepositoryMetadata { commit, branch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_outside_a_repository_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("not-a-repo");
        let err = GitCliLocator::default().locate(&missing).unwrap_err();
        assert!(err.to_string().contains("not-a-repo"));
    }

    #[test]
    fn commit_override_skips_rev_parse() {
        let tmp = tempfile::tempdir().unwrap();
        let meta = GitCliLocator::new(Some("deadbeef".into()))
            .locate(tmp.path())
            .unwrap();
        assert_eq!(meta.commit, "deadbeef");
    }
}
