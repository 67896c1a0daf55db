//! Content digest of a skill folder, used for publish change detection.
//!
//! Files are enumerated in canonical sorted order of their relative paths,
//! so two folders with byte-identical content and identical layout always
//! produce the same digest regardless of directory-listing order.

use std::path::Path;

use {
    anyhow::Context,
    sha2::{Digest, Sha256},
    walkdir::WalkDir,
};

/// Compute the SHA-256 content digest of a folder, hex-encoded.
///
/// Any file content or file-set change changes the digest. Only the
/// equality relation between two digests is meaningful to callers.
pub fn digest_dir(root: &Path) -> anyhow::Result<String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("cannot walk {}", root.display()))?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            files.push((relative, entry.into_path()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, path) in files {
        let contents =
            std::fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
        hasher.update(relative.as_bytes());
        hasher.update([0]);
        hasher.update(&contents);
        hasher.update([0]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "hello").unwrap();
        std::fs::create_dir_all(tmp.path().join("references")).unwrap();
        std::fs::write(tmp.path().join("references/a.md"), "ref").unwrap();

        let first = digest_dir(tmp.path()).unwrap();
        let second = digest_dir(tmp.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_digest_identical_content_identical_digest() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for dir in [a.path(), b.path()] {
            std::fs::write(dir.join("SKILL.md"), "same").unwrap();
            std::fs::create_dir_all(dir.join("scripts")).unwrap();
            std::fs::write(dir.join("scripts/run.sh"), "#!/bin/sh\n").unwrap();
        }
        assert_eq!(digest_dir(a.path()).unwrap(), digest_dir(b.path()).unwrap());
    }

    #[test]
    fn test_digest_changes_on_content_edit() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "v1").unwrap();
        let before = digest_dir(tmp.path()).unwrap();

        std::fs::write(tmp.path().join("SKILL.md"), "v2").unwrap();
        let after = digest_dir(tmp.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_digest_changes_on_file_set_change() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "body").unwrap();
        let before = digest_dir(tmp.path()).unwrap();

        std::fs::write(tmp.path().join("extra.md"), "new file").unwrap();
        let after = digest_dir(tmp.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_digest_missing_dir_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(digest_dir(&tmp.path().join("gone")).is_err());
    }
}
