//! Multi-destination installation of downloaded skill archives.
//!
//! The archive (a gzip tarball) is unpacked once into a staging directory
//! with path sanitization, then copied into `<root>/<slug>` for every
//! requested destination. Each installed copy gets the registry-provenance
//! sidecar so the catalog can tell it apart from locally authored skills.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};

use skilldeck_skills::types::{ORIGIN_SIDECAR, Origin};

/// One install target: a platform root plus its storage key.
#[derive(Debug, Clone)]
pub struct InstallDestination {
    pub root: PathBuf,
    pub storage_key: String,
}

/// Install an archive into every destination, returning the skill id the
/// catalog should select after the next rescan (first destination wins —
/// callers pass destinations in platform preference order).
///
/// Fails before any I/O when `destinations` is empty.
pub async fn install_archive(
    archive: &Path,
    slug: &str,
    version: Option<&str>,
    destinations: &[InstallDestination],
) -> anyhow::Result<Option<String>> {
    if destinations.is_empty() {
        bail!("no install destinations selected");
    }

    let staging = tempfile::tempdir().context("cannot create staging directory")?;
    let archive = archive.to_path_buf();
    let staging_root = staging.path().to_path_buf();
    tokio::task::spawn_blocking(move || unpack_archive(&archive, &staging_root)).await??;

    let content_root = skill_content_root(staging.path());
    if !content_root.join("SKILL.md").is_file() {
        bail!("archive for '{slug}' contains no SKILL.md");
    }

    for destination in destinations {
        let target = destination.root.join(slug);
        let content_root = content_root.clone();
        let target_for_copy = target.clone();
        tokio::task::spawn_blocking(move || install_into(&content_root, &target_for_copy))
            .await?
            .with_context(|| format!("install into {} failed", target.display()))?;

        write_origin(&target, slug, version)?;
        tracing::info!(%slug, target = %target.display(), "installed skill");
    }

    let selected = destinations
        .first()
        .map(|destination| format!("{}:{slug}", destination.storage_key));
    Ok(selected)
}

/// Unpack a gzip tarball, skipping links and rejecting escaping paths.
fn unpack_archive(archive: &Path, target: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("cannot open archive {}", archive.display()))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);

    for entry in tar.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            tracing::warn!(archive = %archive.display(), "skipping link entry in archive");
            continue;
        }

        let path = entry.path()?.into_owned();
        let sanitized = sanitize_entry_path(&path)?;
        let dest = target.join(&sanitized);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if entry_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            entry.unpack(&dest)?;
        }
    }
    Ok(())
}

/// Reject absolute paths and parent-directory traversal in archive entries.
fn sanitize_entry_path(path: &Path) -> anyhow::Result<PathBuf> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("archive contains unsafe path component: {}", path.display());
            },
        }
    }
    Ok(path.to_path_buf())
}

/// Registry archives may pack the skill at the tarball root or under one
/// top-level folder; descend when there is a single directory and no
/// manifest at the root.
fn skill_content_root(staging: &Path) -> PathBuf {
    if staging.join("SKILL.md").is_file() {
        return staging.to_path_buf();
    }
    let entries: Vec<PathBuf> = std::fs::read_dir(staging)
        .map(|entries| entries.flatten().map(|entry| entry.path()).collect())
        .unwrap_or_default();
    match entries.as_slice() {
        [single] if single.is_dir() => single.clone(),
        _ => staging.to_path_buf(),
    }
}

/// Replace `target` with a copy of the staged skill content.
fn install_into(content_root: &Path, target: &Path) -> anyhow::Result<()> {
    if target.exists() {
        std::fs::remove_dir_all(target)
            .with_context(|| format!("cannot replace {}", target.display()))?;
    }
    copy_dir(content_root, target)
}

fn copy_dir(src: &Path, dst: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

fn write_origin(skill_dir: &Path, slug: &str, version: Option<&str>) -> anyhow::Result<()> {
    let origin = Origin {
        slug: slug.to_string(),
        version: version.map(str::to_string),
    };
    let path = skill_dir.join(ORIGIN_SIDECAR);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(&origin)?)?;
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tar.gz containing one skill, optionally nested under a
    /// top-level folder like registry archives produce.
    fn make_archive(dir: &Path, nested: Option<&str>) -> PathBuf {
        let archive_path = dir.join("skill.tar.gz");
        let file = std::fs::File::create(&archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let prefix = nested.map(|n| format!("{n}/")).unwrap_or_default();
        let mut add_file = |name: &str, contents: &str| {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(
                    &mut header,
                    format!("{prefix}{name}"),
                    contents.as_bytes(),
                )
                .unwrap();
        };
        add_file("SKILL.md", "---\nname: packed\n---\nBody\n");
        add_file("references/guide.md", "# Guide\n");

        builder.into_inner().unwrap().finish().unwrap();
        archive_path
    }

    fn dest(root: &Path, key: &str) -> InstallDestination {
        InstallDestination {
            root: root.to_path_buf(),
            storage_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_install_empty_destinations_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = make_archive(tmp.path(), None);
        assert!(
            install_archive(&archive, "packed", Some("1.0.0"), &[])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_install_flat_archive_to_two_destinations() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = make_archive(tmp.path(), None);
        let root_a = tmp.path().join("codex-root");
        let root_b = tmp.path().join("claude-root");

        let selected = install_archive(
            &archive,
            "packed",
            Some("2.1.0"),
            &[dest(&root_a, "codex"), dest(&root_b, "claude")],
        )
        .await
        .unwrap();

        assert_eq!(selected.as_deref(), Some("codex:packed"));
        for root in [&root_a, &root_b] {
            let skill_dir = root.join("packed");
            assert!(skill_dir.join("SKILL.md").is_file());
            assert!(skill_dir.join("references/guide.md").is_file());
            let origin = Origin::read_from(&skill_dir).unwrap();
            assert_eq!(origin.slug, "packed");
            assert_eq!(origin.version.as_deref(), Some("2.1.0"));
        }
    }

    #[tokio::test]
    async fn test_install_nested_archive_strips_top_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = make_archive(tmp.path(), Some("packed-1.0.0"));
        let root = tmp.path().join("root");

        install_archive(&archive, "packed", None, &[dest(&root, "codex")])
            .await
            .unwrap();

        assert!(root.join("packed/SKILL.md").is_file());
        assert!(!root.join("packed/packed-1.0.0").exists());
    }

    #[tokio::test]
    async fn test_install_replaces_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = make_archive(tmp.path(), None);
        let root = tmp.path().join("root");
        let stale = root.join("packed/old-file.txt");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "stale").unwrap();

        install_archive(&archive, "packed", None, &[dest(&root, "codex")])
            .await
            .unwrap();

        assert!(!stale.exists());
        assert!(root.join("packed/SKILL.md").is_file());
    }

    #[tokio::test]
    async fn test_install_archive_without_manifest_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("bad.tar.gz");
        let file = std::fs::File::create(&archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "README", b"hi".as_slice()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let root = tmp.path().join("root");
        assert!(
            install_archive(&archive_path, "bad", None, &[dest(&root, "codex")])
                .await
                .is_err()
        );
    }

    #[test]
    fn test_sanitize_entry_path_rejects_traversal() {
        assert!(sanitize_entry_path(Path::new("../etc/passwd")).is_err());
        assert!(sanitize_entry_path(Path::new("/abs/path")).is_err());
        assert!(sanitize_entry_path(Path::new("ok/nested/file.md")).is_ok());
    }
}
