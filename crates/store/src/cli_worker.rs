//! Worker around the external `skillshub` publishing CLI.
//!
//! The store only depends on the process contract: status lookup (installed,
//! logged in, username) and a publish invocation with bump/changelog/tags.

use std::path::Path;

use {
    async_trait::async_trait,
    serde::Deserialize,
    tokio::process::Command,
};

use {crate::error::CliError, skilldeck_skills::version::BumpKind};

/// Transient status of the publishing tool. Recomputed on demand, never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct CliStatus {
    pub installed: bool,
    pub logged_in: bool,
    pub username: Option<String>,
    pub error: Option<String>,
}

/// Publish-tool contract consumed by the store.
#[async_trait]
pub trait PublishCli: Send + Sync {
    /// Check whether the tool is installed and logged in. Never errors;
    /// failures are folded into the returned status.
    async fn fetch_status(&self) -> CliStatus;

    /// Publish a skill folder. The ledger update on success is the store's
    /// job, not the worker's.
    async fn publish(
        &self,
        skill_dir: &Path,
        published_version: Option<&str>,
        bump: BumpKind,
        changelog: &str,
        tags: &[String],
    ) -> Result<(), CliError>;
}

#[derive(Deserialize)]
struct WhoamiOutput {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "loggedIn")]
    logged_in: bool,
}

/// Concrete worker invoking the `skillshub` binary from PATH.
pub struct SkillshubCli {
    program: String,
}

impl SkillshubCli {
    pub fn new() -> Self {
        Self {
            program: "skillshub".to_string(),
        }
    }

    /// Use a different binary name or path (tests, custom installs).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SkillshubCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PublishCli for SkillshubCli {
    async fn fetch_status(&self) -> CliStatus {
        let output = match Command::new(&self.program)
            .args(["whoami", "--json"])
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CliStatus::default();
            },
            Err(e) => {
                return CliStatus {
                    installed: true,
                    error: Some(e.to_string()),
                    ..CliStatus::default()
                };
            },
        };

        if !output.status.success() {
            // The tool is present but e.g. not logged in.
            return CliStatus {
                installed: true,
                logged_in: false,
                username: None,
                error: stderr_message(&output.stderr),
            };
        }

        match serde_json::from_slice::<WhoamiOutput>(&output.stdout) {
            Ok(whoami) => CliStatus {
                installed: true,
                logged_in: whoami.logged_in,
                username: whoami.username,
                error: None,
            },
            Err(e) => CliStatus {
                installed: true,
                logged_in: false,
                username: None,
                error: Some(format!("unexpected whoami output: {e}")),
            },
        }
    }

    async fn publish(
        &self,
        skill_dir: &Path,
        published_version: Option<&str>,
        bump: BumpKind,
        changelog: &str,
        tags: &[String],
    ) -> Result<(), CliError> {
        let mut command = Command::new(&self.program);
        command
            .arg("publish")
            .arg(skill_dir)
            .args(["--bump", &bump.to_string()]);
        if let Some(version) = published_version {
            command.args(["--version", version]);
        }
        if !changelog.is_empty() {
            command.args(["--changelog", changelog]);
        }
        for tag in tags {
            command.args(["--tag", tag]);
        }

        let output = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CliError::NotInstalled
            } else {
                CliError::Process(e.to_string())
            }
        })?;

        if output.status.success() {
            tracing::info!(dir = %skill_dir.display(), %bump, "published skill");
            return Ok(());
        }

        let message =
            stderr_message(&output.stderr).unwrap_or_else(|| "publish failed".to_string());
        if message.to_lowercase().contains("not logged in") {
            return Err(CliError::NotLoggedIn);
        }
        Err(CliError::Process(message))
    }
}

fn stderr_message(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_status_missing_binary() {
        let cli = SkillshubCli::with_program("skilldeck-definitely-not-a-binary");
        let status = cli.fetch_status().await;
        assert!(!status.installed);
        assert!(!status.logged_in);
        assert!(status.username.is_none());
    }

    #[tokio::test]
    async fn test_publish_missing_binary_is_not_installed() {
        let cli = SkillshubCli::with_program("skilldeck-definitely-not-a-binary");
        let err = cli
            .publish(Path::new("/tmp"), None, BumpKind::Patch, "", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::NotInstalled));
    }

    #[tokio::test]
    async fn test_publish_nonzero_exit_is_process_error() {
        // `false` ignores its arguments and exits non-zero with no output.
        let cli = SkillshubCli::with_program("false");
        let err = cli
            .publish(Path::new("/tmp"), None, BumpKind::Patch, "notes", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Process(_)));
    }
}
