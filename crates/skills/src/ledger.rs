//! Persisted publish-state ledger: one JSON record per skill slug recording
//! the last-published content digest and timestamp. Grounds the
//! "needs publish" indicator across process restarts.

use std::path::PathBuf;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Last-published record for one slug. Overwritten on each publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishState {
    pub last_published_hash: String,
    pub last_published_at: DateTime<Utc>,
}

/// Per-slug record store under the per-user state directory.
pub struct PublishLedger {
    dir: PathBuf,
}

impl PublishLedger {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default ledger location: `<state dir>/skill-state/`.
    pub fn default_dir() -> PathBuf {
        skilldeck_config::state_dir().join("skill-state")
    }

    /// Load the record for a slug. Missing or corrupt records read as
    /// "never published".
    pub fn load(&self, slug: &str) -> Option<PublishState> {
        let content = std::fs::read_to_string(self.record_path(slug)).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(%slug, error = %e, "corrupt publish-state record, treating as never published");
                None
            },
        }
    }

    /// Record a successful publish with the given digest, timestamped now.
    /// The write is atomic (temp file + rename) and the ledger directory is
    /// created on first use.
    pub fn save(&self, slug: &str, digest: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let state = PublishState {
            last_published_hash: digest.to_string(),
            last_published_at: Utc::now(),
        };
        let path = self.record_path(slug);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&state)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn record_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.json"))
    }
}

impl Default for PublishLedger {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = PublishLedger::new(tmp.path().join("skill-state"));
        assert!(ledger.load("nope").is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = PublishLedger::new(tmp.path().join("skill-state"));

        ledger.save("pdf-tools", "digest-1").unwrap();
        let state = ledger.load("pdf-tools").unwrap();
        assert_eq!(state.last_published_hash, "digest-1");

        // Overwritten, never appended.
        ledger.save("pdf-tools", "digest-2").unwrap();
        let state = ledger.load("pdf-tools").unwrap();
        assert_eq!(state.last_published_hash, "digest-2");
    }

    #[test]
    fn test_corrupt_record_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("skill-state");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();

        let ledger = PublishLedger::new(dir);
        assert!(ledger.load("broken").is_none());
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = PublishLedger::new(tmp.path().to_path_buf());
        ledger.save("slug", "abc").unwrap();

        let raw = std::fs::read_to_string(tmp.path().join("slug.json")).unwrap();
        assert!(raw.contains("lastPublishedHash"));
        assert!(raw.contains("lastPublishedAt"));
    }
}
