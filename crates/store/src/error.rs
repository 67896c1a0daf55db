use thiserror::Error;

/// Failures from the remote skill registry. Propagate to the caller of an
/// install/update operation; no partial installation is left behind.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("skill '{0}' not found in registry")]
    NotFound(String),

    #[error("registry request failed: {0}")]
    Network(String),

    #[error("registry download failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        RegistryError::Network(e.to_string())
    }
}

/// Failures from the external publishing tool. The publish ledger is never
/// touched on any of these paths.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("the skillshub CLI is not installed")]
    NotInstalled,

    #[error("not logged in to skillshub; run `skillshub login`")]
    NotLoggedIn,

    #[error("skillshub failed: {0}")]
    Process(String),
}
