//! The skill store: unified catalog, load/selection state machines, and the
//! install/update/publish workflows.
//!
//! One task owns the store and drives its `&mut self` operations; display
//! layers read the published state between operations. Every operation that
//! touches the filesystem, network, or a subprocess suspends off the owning
//! task and rejoins it only to publish a state transition, so observers
//! never see a torn intermediate state.

use std::path::PathBuf;

use anyhow::{Context, bail};

use {
    crate::{
        cli_worker::{CliStatus, PublishCli},
        install::{self, InstallDestination},
        registry::RegistryClient,
    },
    skilldeck_skills::{
        hash,
        ledger::PublishLedger,
        parse, scan,
        types::{ORIGIN_SIDECAR, Origin, Platform, Skill, SkillReference},
        version::BumpKind,
    },
};

/// Catalog load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Load state for the selected skill body and the selected reference body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Idle,
    Loading,
    Loaded,
    /// The file recorded at scan time no longer resolves to a readable
    /// file — deleted externally between scan and read.
    Missing,
    Failed(String),
}

/// One slug grouped across every platform it is installed under.
#[derive(Debug, Clone)]
pub struct SkillGroup {
    /// Id of the preferred platform's installation.
    pub id: String,
    /// Representative content, chosen by platform preference order.
    pub skill: Skill,
    /// Platforms the slug is installed under, in preference order.
    pub installed_platforms: Vec<Platform>,
    /// Ids of every installation of the slug, for bulk delete.
    pub delete_ids: Vec<String>,
}

enum BodyError {
    Missing,
    Failed(String),
}

/// Owner of the unified skill catalog and its observable state.
pub struct SkillStore {
    skills: Vec<Skill>,
    list_state: ListState,
    detail_state: DetailState,
    reference_state: DetailState,
    selected_skill_id: Option<String>,
    selected_markdown: String,
    selected_reference_id: Option<String>,
    selected_reference_markdown: String,

    roots: Vec<(Platform, PathBuf)>,
    ledger: PublishLedger,

    // Request generations for last-call-wins semantics: a finishing older
    // load may not publish over the result of a newer one. Direct callers
    // are already serialized by `&mut self`, so these checks only bite when
    // the store is driven from a command loop that dispatches operations as
    // tasks and applies their results as they complete.
    catalog_generation: u64,
    detail_generation: u64,
    reference_generation: u64,
}

impl SkillStore {
    /// Store over the default platform roots and ledger location.
    pub fn new() -> Self {
        let roots = Platform::ALL
            .into_iter()
            .map(|platform| (platform, platform.root_dir()))
            .collect();
        Self::with_roots(roots, PublishLedger::default())
    }

    /// Store over explicit roots and ledger (tests, custom layouts).
    pub fn with_roots(roots: Vec<(Platform, PathBuf)>, ledger: PublishLedger) -> Self {
        Self {
            skills: Vec::new(),
            list_state: ListState::Idle,
            detail_state: DetailState::Idle,
            reference_state: DetailState::Idle,
            selected_skill_id: None,
            selected_markdown: String::new(),
            selected_reference_id: None,
            selected_reference_markdown: String::new(),
            roots,
            ledger,
            catalog_generation: 0,
            detail_generation: 0,
            reference_generation: 0,
        }
    }

    // ── Published state ──────────────────────────────────────────────────

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn list_state(&self) -> &ListState {
        &self.list_state
    }

    pub fn detail_state(&self) -> &DetailState {
        &self.detail_state
    }

    pub fn reference_state(&self) -> &DetailState {
        &self.reference_state
    }

    pub fn selected_skill_id(&self) -> Option<&str> {
        self.selected_skill_id.as_deref()
    }

    pub fn selected_skill(&self) -> Option<&Skill> {
        let id = self.selected_skill_id.as_deref()?;
        self.skills.iter().find(|skill| skill.id == id)
    }

    pub fn selected_markdown(&self) -> &str {
        &self.selected_markdown
    }

    pub fn selected_reference(&self) -> Option<&SkillReference> {
        let id = self.selected_reference_id.as_deref()?;
        self.selected_skill()?
            .references
            .iter()
            .find(|reference| reference.id == id)
    }

    pub fn selected_reference_markdown(&self) -> &str {
        &self.selected_reference_markdown
    }

    // ── Catalog loading ──────────────────────────────────────────────────

    /// Rescan every platform root and replace the catalog wholesale.
    ///
    /// On any root-level scan failure the previous catalog is kept and
    /// `ListState::Failed` is published. Selection is preserved across
    /// reload when the previously selected id survives, otherwise it falls
    /// back to the first entry (or none for an empty catalog).
    pub async fn load_catalog(&mut self) {
        self.catalog_generation += 1;
        let generation = self.catalog_generation;
        self.list_state = ListState::Loading;
        self.detail_state = DetailState::Idle;
        self.reference_state = DetailState::Idle;

        let mut merged = Vec::new();
        for (platform, root) in self.roots.clone() {
            let scanned =
                tokio::task::spawn_blocking(move || scan::scan_root(&root, platform)).await;
            let scanned = match scanned {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("scan task failed: {e}")),
            };
            match scanned {
                Ok(skills) => merged.extend(skills),
                Err(e) => {
                    if generation == self.catalog_generation {
                        tracing::warn!(error = %e, "catalog scan failed");
                        self.list_state = ListState::Failed(e.to_string());
                    }
                    return;
                },
            }
        }

        if generation != self.catalog_generation {
            // A newer reload superseded this one.
            return;
        }

        merged.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        self.skills = merged;
        self.list_state = ListState::Loaded;

        let selection_alive = self
            .selected_skill_id
            .as_deref()
            .is_some_and(|id| self.skills.iter().any(|skill| skill.id == id));
        if !selection_alive {
            self.selected_skill_id = self.skills.first().map(|skill| skill.id.clone());
        }

        self.normalize_selection_to_preferred_platform();
        self.load_selected_body().await;
    }

    /// Change the selection and load the newly selected skill's body.
    /// `None` clears the selection.
    pub async fn select_skill(&mut self, id: Option<String>) {
        self.selected_skill_id = id;
        self.load_selected_body().await;
    }

    /// Load the selected skill's manifest body (frontmatter stripped).
    pub async fn load_selected_body(&mut self) {
        self.detail_generation += 1;
        let generation = self.detail_generation;

        let Some(skill) = self.selected_skill() else {
            self.detail_state = DetailState::Idle;
            self.selected_markdown.clear();
            self.reference_state = DetailState::Idle;
            self.selected_reference_id = None;
            self.selected_reference_markdown.clear();
            return;
        };
        let manifest_path = skill.manifest_path.clone();

        self.detail_state = DetailState::Loading;
        self.reference_state = DetailState::Idle;
        self.selected_reference_id = None;
        self.selected_reference_markdown.clear();

        let result = read_body(manifest_path).await;
        if generation != self.detail_generation {
            // Superseded by a newer selection while the read was in flight.
            return;
        }
        match result {
            Ok(raw) => {
                self.selected_markdown = parse::strip_frontmatter(&raw).to_string();
                self.detail_state = DetailState::Loaded;
            },
            Err(BodyError::Missing) => {
                self.selected_markdown.clear();
                self.detail_state = DetailState::Missing;
            },
            Err(BodyError::Failed(message)) => {
                self.selected_markdown.clear();
                self.detail_state = DetailState::Failed(message);
            },
        }
    }

    /// Select a reference of the current skill, or toggle it off when it is
    /// already selected.
    pub async fn select_reference(&mut self, reference_id: &str) {
        if self.selected_reference_id.as_deref() == Some(reference_id) {
            self.selected_reference_id = None;
            self.reference_state = DetailState::Idle;
            self.selected_reference_markdown.clear();
            return;
        }
        self.selected_reference_id = Some(reference_id.to_string());
        self.load_selected_reference_body().await;
    }

    /// Load the selected reference's body (frontmatter stripped).
    pub async fn load_selected_reference_body(&mut self) {
        self.reference_generation += 1;
        let generation = self.reference_generation;

        let Some(reference) = self.selected_reference() else {
            self.reference_state = DetailState::Idle;
            self.selected_reference_markdown.clear();
            return;
        };
        let path = reference.path.clone();

        self.reference_state = DetailState::Loading;

        let result = read_body(path).await;
        if generation != self.reference_generation {
            return;
        }
        match result {
            Ok(raw) => {
                self.selected_reference_markdown = parse::strip_frontmatter(&raw).to_string();
                self.reference_state = DetailState::Loaded;
            },
            Err(BodyError::Missing) => {
                self.selected_reference_markdown.clear();
                self.reference_state = DetailState::Missing;
            },
            Err(BodyError::Failed(message)) => {
                self.selected_reference_markdown.clear();
                self.reference_state = DetailState::Failed(message);
            },
        }
    }

    /// Delete skill folders best-effort (per-id failures are swallowed),
    /// then rescan the catalog.
    pub async fn delete_skills(&mut self, ids: &[String]) {
        for id in ids {
            let Some(skill) = self.skills.iter().find(|skill| &skill.id == id) else {
                continue;
            };
            if let Err(e) = tokio::fs::remove_dir_all(&skill.folder).await {
                tracing::warn!(%id, error = %e, "failed to delete skill folder");
            }
        }
        self.load_catalog().await;
    }

    // ── Install / update ─────────────────────────────────────────────────

    /// Download a skill archive from the registry and install it into every
    /// requested platform. Fails before touching the registry when
    /// `destinations` is empty. Rescans and selects the installed skill.
    pub async fn install_or_update(
        &mut self,
        slug: &str,
        version: Option<&str>,
        destinations: &[Platform],
        client: &dyn RegistryClient,
    ) -> anyhow::Result<()> {
        if destinations.is_empty() {
            bail!("no install destinations selected for '{slug}'");
        }

        let archive = client.download(slug, version).await?;
        let ordered = self.ordered_destinations(destinations);
        let installed_id = install::install_archive(&archive, slug, version, &ordered).await?;
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            tracing::debug!(error = %e, "could not remove downloaded archive");
        }

        self.load_catalog().await;
        if let Some(id) = installed_id
            && self.skills.iter().any(|skill| skill.id == id)
        {
            self.select_skill(Some(id)).await;
        }
        Ok(())
    }

    /// Update an installed slug in place, across every platform it is
    /// currently installed under. No-op when it is installed nowhere.
    pub async fn update_installed(
        &mut self,
        slug: &str,
        version: Option<&str>,
        client: &dyn RegistryClient,
    ) -> anyhow::Result<()> {
        let destinations = self.installed_platforms(slug);
        if destinations.is_empty() {
            return Ok(());
        }
        self.install_or_update(slug, version, &destinations, client).await
    }

    // ── Publish ──────────────────────────────────────────────────────────

    /// Does the skill's current content differ from its last published
    /// state? Conservative: hashing failures and absent ledger records both
    /// answer true.
    pub async fn check_needs_publish(&self, skill: &Skill) -> bool {
        let folder = skill.folder.clone();
        let digest = match tokio::task::spawn_blocking(move || hash::digest_dir(&folder)).await {
            Ok(Ok(digest)) => digest,
            Ok(Err(e)) => {
                tracing::warn!(skill = %skill.name, error = %e, "hash failed, assuming needs publish");
                return true;
            },
            Err(e) => {
                tracing::warn!(skill = %skill.name, error = %e, "hash task failed, assuming needs publish");
                return true;
            },
        };
        match self.ledger.load(&skill.name) {
            Some(state) => state.last_published_hash != digest,
            None => true,
        }
    }

    /// Publish through the CLI worker, then record the published digest in
    /// the ledger. A worker failure propagates and leaves the ledger
    /// untouched.
    pub async fn publish(
        &self,
        skill: &Skill,
        bump: BumpKind,
        changelog: &str,
        tags: &[String],
        published_version: Option<&str>,
        cli: &dyn PublishCli,
    ) -> anyhow::Result<()> {
        cli.publish(&skill.folder, published_version, bump, changelog, tags)
            .await?;

        let folder = skill.folder.clone();
        let digest = tokio::task::spawn_blocking(move || hash::digest_dir(&folder))
            .await
            .context("hash task failed")??;
        self.ledger.save(&skill.name, &digest)?;
        Ok(())
    }

    /// Status of the external publishing tool. Never errors.
    pub async fn fetch_cli_status(&self, cli: &dyn PublishCli) -> CliStatus {
        cli.fetch_status().await
    }

    // ── Pure catalog queries ─────────────────────────────────────────────

    /// A skill is owned (authored locally) iff no registry-provenance
    /// sidecar exists in its folder. Checked on the filesystem each call so
    /// external edits are never masked by cached state.
    pub fn is_owned(&self, skill: &Skill) -> bool {
        !skill.folder.join(ORIGIN_SIDECAR).exists()
    }

    /// Registry provenance of an installed skill, when present.
    pub fn origin(&self, skill: &Skill) -> Option<Origin> {
        Origin::read_from(&skill.folder)
    }

    pub fn is_installed(&self, slug: &str) -> bool {
        self.skills.iter().any(|skill| skill.name == slug)
    }

    pub fn is_installed_on(&self, slug: &str, platform: Platform) -> bool {
        self.skills
            .iter()
            .any(|skill| skill.name == slug && skill.platform == platform)
    }

    /// Platforms a slug is installed under, in preference order.
    pub fn installed_platforms(&self, slug: &str) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.is_installed_on(slug, *platform))
            .collect()
    }

    /// Group the catalog by slug. Each group's representative content comes
    /// from the most preferred platform the slug is installed under; the
    /// full platform set and all ids are kept for display and bulk delete.
    pub fn grouped_skills(&self) -> Vec<SkillGroup> {
        let mut slugs: Vec<&str> = self.skills.iter().map(|skill| skill.name.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();

        let mut groups: Vec<SkillGroup> = slugs
            .into_iter()
            .filter_map(|slug| {
                let members: Vec<&Skill> =
                    self.skills.iter().filter(|skill| skill.name == slug).collect();
                let representative = Platform::ALL
                    .into_iter()
                    .find_map(|platform| {
                        members.iter().find(|skill| skill.platform == platform)
                    })
                    .or(members.first())?;
                Some(SkillGroup {
                    id: representative.id.clone(),
                    skill: (*representative).clone(),
                    installed_platforms: self.installed_platforms(slug),
                    delete_ids: members.iter().map(|skill| skill.id.clone()).collect(),
                })
            })
            .collect();

        groups.sort_by(|a, b| {
            a.skill
                .display_name
                .to_lowercase()
                .cmp(&b.skill.display_name.to_lowercase())
                .then_with(|| a.skill.display_name.cmp(&b.skill.display_name))
        });
        groups
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// When the selected slug exists under several platforms, move the
    /// selection to the most preferred platform's installation.
    fn normalize_selection_to_preferred_platform(&mut self) {
        let Some(selected) = self.selected_skill() else {
            return;
        };
        let slug = selected.name.clone();
        let candidates: Vec<&Skill> =
            self.skills.iter().filter(|skill| skill.name == slug).collect();
        if candidates.len() < 2 {
            return;
        }

        let preferred = Platform::ALL
            .into_iter()
            .find_map(|platform| candidates.iter().find(|skill| skill.platform == platform))
            .or(candidates.first());
        if let Some(preferred) = preferred
            && self.selected_skill_id.as_deref() != Some(preferred.id.as_str())
        {
            self.selected_skill_id = Some(preferred.id.clone());
        }
    }

    /// Requested platforms as install destinations, in preference order.
    fn ordered_destinations(&self, requested: &[Platform]) -> Vec<InstallDestination> {
        Platform::ALL
            .into_iter()
            .filter(|platform| requested.contains(platform))
            .filter_map(|platform| {
                let root = self
                    .roots
                    .iter()
                    .find(|(p, _)| *p == platform)
                    .map(|(_, root)| root.clone())?;
                Some(InstallDestination {
                    root,
                    storage_key: platform.storage_key().to_string(),
                })
            })
            .collect()
    }
}

impl Default for SkillStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a manifest or reference body, distinguishing a vanished file from
/// other read failures.
async fn read_body(path: PathBuf) -> Result<String, BodyError> {
    let outcome = tokio::task::spawn_blocking(move || {
        if !path.is_file() {
            return Err(BodyError::Missing);
        }
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BodyError::Missing
            } else {
                BodyError::Failed(e.to_string())
            }
        })
    })
    .await;
    match outcome {
        Ok(result) => result,
        Err(e) => Err(BodyError::Failed(format!("read task failed: {e}"))),
    }
}
