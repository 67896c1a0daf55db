use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relative path of the registry-provenance sidecar inside a skill folder.
/// Its presence is the sole signal that a skill was installed from the
/// registry rather than authored locally.
pub const ORIGIN_SIDECAR: &str = ".skillshub/origin.json";

// ── Platforms ────────────────────────────────────────────────────────────────

/// The fixed set of installation targets, each with its own skill root.
///
/// `ALL` doubles as the preference order used when the same slug is
/// installed under several platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Codex,
    Claude,
    Opencode,
    Copilot,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Codex,
        Platform::Claude,
        Platform::Opencode,
        Platform::Copilot,
    ];

    /// Stable key used in skill ids and install destinations.
    pub fn storage_key(self) -> &'static str {
        match self {
            Platform::Codex => "codex",
            Platform::Claude => "claude",
            Platform::Opencode => "opencode",
            Platform::Copilot => "copilot",
        }
    }

    /// Human-readable platform name.
    pub fn label(self) -> &'static str {
        match self {
            Platform::Codex => "Codex",
            Platform::Claude => "Claude Code",
            Platform::Opencode => "OpenCode",
            Platform::Copilot => "GitHub Copilot",
        }
    }

    /// The skill root directory for this platform.
    pub fn root_dir(self) -> PathBuf {
        let home = skilldeck_config::home_dir();
        match self {
            Platform::Codex => home.join(".codex/skills/public"),
            Platform::Claude => home.join(".claude/skills"),
            Platform::Opencode => home.join(".config/opencode/skill"),
            Platform::Copilot => home.join(".copilot/skills"),
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Platform> {
        Platform::ALL.into_iter().find(|p| p.storage_key() == key)
    }
}

// ── Catalog entities ─────────────────────────────────────────────────────────

/// A markdown document under a skill's `references/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillReference {
    /// Absolute file path, doubling as the reference id.
    pub id: String,
    /// Formatted display name derived from the file stem.
    pub name: String,
    pub path: PathBuf,
}

/// Entry counts for a skill's sibling directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillStats {
    pub references: usize,
    pub assets: usize,
    pub scripts: usize,
    pub templates: usize,
}

/// One discovered skill installation. Created fresh on every catalog scan
/// and replaced wholesale on rescan, never mutated in place.
#[derive(Debug, Clone)]
pub struct Skill {
    /// `{storage_key}:{folder_name}` — unique per platform + slug.
    pub id: String,
    /// Canonical slug, shared across platform installations.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub platform: Platform,
    pub folder: PathBuf,
    pub manifest_path: PathBuf,
    pub references: Vec<SkillReference>,
    pub stats: SkillStats,
}

// ── Registry provenance ──────────────────────────────────────────────────────

/// Sidecar record written when a skill is installed from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    pub slug: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl Origin {
    /// Read the origin sidecar from a skill folder.
    /// Missing or corrupt sidecar means the skill is locally authored.
    pub fn read_from(skill_dir: &Path) -> Option<Origin> {
        let content = std::fs::read_to_string(skill_dir.join(ORIGIN_SIDECAR)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_storage_key_roundtrip() {
        for platform in Platform::ALL {
            assert_eq!(
                Platform::from_storage_key(platform.storage_key()),
                Some(platform)
            );
        }
        assert_eq!(Platform::from_storage_key("vscode"), None);
    }

    #[test]
    fn test_origin_read_missing_and_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Origin::read_from(tmp.path()).is_none());

        std::fs::create_dir_all(tmp.path().join(".skillshub")).unwrap();
        std::fs::write(tmp.path().join(ORIGIN_SIDECAR), "not json").unwrap();
        assert!(Origin::read_from(tmp.path()).is_none());
    }

    #[test]
    fn test_origin_read_valid() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".skillshub")).unwrap();
        std::fs::write(
            tmp.path().join(ORIGIN_SIDECAR),
            r#"{"slug":"pdf-tools","version":"1.2.0"}"#,
        )
        .unwrap();
        let origin = Origin::read_from(tmp.path()).unwrap();
        assert_eq!(origin.slug, "pdf-tools");
        assert_eq!(origin.version.as_deref(), Some("1.2.0"));
    }
}
