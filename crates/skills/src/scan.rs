//! Filesystem discovery of installed skills.
//!
//! Each platform root is scanned one level deep: every non-hidden child
//! directory containing a `SKILL.md` manifest becomes one [`Skill`].
//! Blocking I/O throughout; callers run this off the owning thread.

use std::path::Path;

use anyhow::Context;

use crate::{
    parse,
    types::{Platform, Skill, SkillReference, SkillStats},
};

const MANIFEST_NAME: &str = "SKILL.md";
const DEFAULT_DESCRIPTION: &str = "No description available";

/// Scan one platform root for skills.
///
/// A directory without a manifest is filtered out, and a directory whose
/// manifest cannot be read is skipped with a warning. The scan as a whole
/// fails only when the root itself cannot be listed.
pub fn scan_root(root: &Path, platform: Platform) -> anyhow::Result<Vec<Skill>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("cannot list skill root {}", root.display()))?;

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let folder = entry.path();
        if is_hidden(&folder) || !folder.is_dir() {
            continue;
        }
        let manifest_path = folder.join(MANIFEST_NAME);
        if !manifest_path.is_file() {
            continue;
        }

        let markdown = match std::fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %manifest_path.display(), error = %e, "skipping unreadable manifest");
                continue;
            },
        };

        let folder_name = entry.file_name().to_string_lossy().to_string();
        let meta = parse::parse_metadata(&markdown);
        let display_name =
            parse::format_title(meta.name.as_deref().unwrap_or(folder_name.as_str()));

        skills.push(Skill {
            id: format!("{}:{}", platform.storage_key(), folder_name),
            name: folder_name,
            display_name,
            description: meta
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            platform,
            references: reference_files(&folder.join("references")),
            stats: SkillStats {
                references: count_entries(&folder.join("references")),
                assets: count_entries(&folder.join("assets")),
                scripts: count_entries(&folder.join("scripts")),
                templates: count_entries(&folder.join("templates")),
            },
            manifest_path,
            folder,
        });
    }

    Ok(skills)
}

/// List `references/*.md` documents, sorted case-insensitively by display
/// name. A missing or unreadable directory yields an empty list.
pub fn reference_files(dir: &Path) -> Vec<SkillReference> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut references: Vec<SkillReference> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if is_hidden(&path) || !path.is_file() {
                return None;
            }
            let is_markdown = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
            if !is_markdown {
                return None;
            }
            let stem = path.file_stem()?.to_string_lossy().to_string();
            Some(SkillReference {
                id: path.to_string_lossy().to_string(),
                name: parse::format_title(&stem),
                path,
            })
        })
        .collect();

    references.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    references
}

/// Count non-hidden entries in a directory; missing directory counts zero.
pub fn count_entries(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|entry| !is_hidden(&entry.path()))
            .count(),
        Err(_) => 0,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(root: &Path, folder: &str, manifest: &str) {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), manifest).unwrap();
    }

    #[test]
    fn test_scan_filters_dirs_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "foo", "---\nname: Foo\n---\nBody\n");
        std::fs::create_dir_all(tmp.path().join("not-a-skill")).unwrap();
        std::fs::write(tmp.path().join("loose-file.md"), "x").unwrap();

        let skills = scan_root(tmp.path(), Platform::Codex).unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].display_name, "Foo");
        assert_eq!(skills[0].name, "foo");
        assert_eq!(skills[0].id, "codex:foo");
    }

    #[test]
    fn test_scan_skips_hidden_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), ".hidden", "---\nname: h\n---\n");
        write_skill(tmp.path(), "visible", "# Visible\n");

        let skills = scan_root(tmp.path(), Platform::Claude).unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "visible");
    }

    #[test]
    fn test_scan_missing_root_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan_root(&tmp.path().join("nope"), Platform::Codex).is_err());
    }

    #[test]
    fn test_scan_display_name_falls_back_to_folder() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "pdf-tools", "just a body, no metadata\n");

        let skills = scan_root(tmp.path(), Platform::Codex).unwrap();
        assert_eq!(skills[0].display_name, "Pdf Tools");
        // First paragraph line becomes the description.
        assert_eq!(skills[0].description, "just a body, no metadata");
    }

    #[test]
    fn test_scan_default_description() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "empty", "");

        let skills = scan_root(tmp.path(), Platform::Codex).unwrap();
        assert_eq!(skills[0].description, "No description available");
    }

    #[test]
    fn test_scan_collects_references_and_stats() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "full", "---\nname: full\n---\n");
        let dir = tmp.path().join("full");
        std::fs::create_dir_all(dir.join("references")).unwrap();
        std::fs::write(dir.join("references/zz-topic.md"), "z").unwrap();
        std::fs::write(dir.join("references/api-guide.md"), "a").unwrap();
        std::fs::write(dir.join("references/notes.txt"), "skip").unwrap();
        std::fs::create_dir_all(dir.join("assets")).unwrap();
        std::fs::write(dir.join("assets/logo.png"), [0u8]).unwrap();
        std::fs::create_dir_all(dir.join("scripts")).unwrap();

        let skills = scan_root(tmp.path(), Platform::Codex).unwrap();
        let skill = &skills[0];
        assert_eq!(skill.references.len(), 2);
        // Sorted by display name, case-insensitively.
        assert_eq!(skill.references[0].name, "Api Guide");
        assert_eq!(skill.references[1].name, "Zz Topic");
        assert_eq!(skill.stats.references, 3);
        assert_eq!(skill.stats.assets, 1);
        assert_eq!(skill.stats.scripts, 0);
        assert_eq!(skill.stats.templates, 0);
    }

    #[test]
    fn test_count_entries_missing_dir_is_zero() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(count_entries(&tmp.path().join("absent")), 0);
    }
}
