//! Source-control metadata for the current checkout.
//!
//! Every record of a run shares the same commit hash, commit date and
//! branch, so they are resolved once before any test result is accepted.
//! A checkout that can't provide them is a configuration error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Result type for source-control lookups.
pub type GitResult<T> = Result<T, GitError>;

/// Errors resolving source-control metadata.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Not a git checkout: {0}")]
    NotARepository(String),

    #[error("Repository has no commits")]
    NoCommits,

    #[error("HEAD is detached; set a branch explicitly")]
    DetachedHead,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Invalid commit date '{0}': {1}")]
    InvalidDate(String, chrono::ParseError),

    #[error("Unexpected git output: {0}")]
    UnexpectedOutput(String),

    #[error("git timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Commit and branch of the checkout being tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    pub commit: String,
    pub commit_date: DateTime<Utc>,
    pub branch: String,
}

impl GitInfo {
    /// Commit date in seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.commit_date.timestamp()
    }
}

/// Reads commit and branch information by shelling out to `git`.
pub struct GitResolver {
    working_dir: Option<PathBuf>,
    branch_override: Option<String>,
    timeout: Duration,
}

impl GitResolver {
    pub fn new() -> Self {
        Self {
            working_dir: None,
            branch_override: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Uses this branch name instead of asking git. Needed on CI runners
    /// that check out a detached HEAD.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch_override = Some(branch.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves commit hash, commit date and branch.
    pub async fn resolve(&self) -> GitResult<GitInfo> {
        let log = self.git(&["log", "-1", "--format=%H%n%cI"]).await?;
        let (commit, commit_date) = parse_log_output(&log)?;

        let branch = match &self.branch_override {
            Some(branch) => branch.clone(),
            None => {
                let name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
                parse_branch_output(&name)?
            }
        };

        debug!("Resolved git metadata: {} on {} ({})", commit, branch, commit_date);

        Ok(GitInfo {
            commit,
            commit_date,
            branch,
        })
    }

    /// Resolves only the branch name.
    pub async fn branch(&self) -> GitResult<String> {
        if let Some(branch) = &self.branch_override {
            return Ok(branch.clone());
        }
        let name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        parse_branch_output(&name)
    }

    async fn git(&self, args: &[&str]) -> GitResult<String> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Running git {:?}", args);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| GitError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(&args.join(" "), stderr, self.working_dir.as_deref()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for GitResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_failure(command: &str, stderr: String, dir: Option<&Path>) -> GitError {
    if stderr.contains("not a git repository") {
        let location = dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        GitError::NotARepository(location)
    } else if stderr.contains("does not have any commits")
        || stderr.contains("unknown revision")
        || stderr.contains("ambiguous argument 'HEAD'")
    {
        GitError::NoCommits
    } else {
        GitError::CommandFailed {
            command: command.to_string(),
            stderr,
        }
    }
}

/// Parses `git log -1 --format=%H%n%cI` output.
pub fn parse_log_output(output: &str) -> GitResult<(String, DateTime<Utc>)> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

    let commit = lines
        .next()
        .ok_or(GitError::NoCommits)?
        .to_string();
    let date = lines
        .next()
        .ok_or_else(|| GitError::UnexpectedOutput(output.to_string()))?;

    Ok((commit, parse_commit_date(date)?))
}

/// Parses a strict ISO 8601 commit date (`%cI`) into UTC.
pub fn parse_commit_date(date: &str) -> GitResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| GitError::InvalidDate(date.to_string(), e))
}

/// Parses `git rev-parse --abbrev-ref HEAD` output.
pub fn parse_branch_output(output: &str) -> GitResult<String> {
    match output.trim() {
        "" => Err(GitError::UnexpectedOutput(output.to_string())),
        "HEAD" => Err(GitError::DetachedHead),
        branch => Ok(branch.to_string()),
    }
}
