//! Skill catalog primitives: discovery, parsing, hashing, versioning, and
//! the publish-state ledger.
//!
//! A skill is a directory containing a `SKILL.md` manifest with optional
//! YAML-ish frontmatter, optional `references/*.md` documents, and optional
//! `assets/`, `scripts/`, `templates/` subdirectories. Skills are installed
//! under one root per supported agent platform.

pub mod hash;
pub mod ledger;
pub mod parse;
pub mod scan;
pub mod types;
pub mod version;
