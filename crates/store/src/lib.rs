//! Skill-store orchestration: the observable catalog state machine plus the
//! registry, install, and publish workflows it composes.
//!
//! The store is owned by a single task; display layers read its published
//! state between operations and never mutate it. All filesystem scanning,
//! hashing, archive unpacking, and subprocess work runs off that task.

pub mod cli_worker;
pub mod error;
pub mod install;
pub mod registry;
pub mod store;

pub use {
    cli_worker::{CliStatus, PublishCli, SkillshubCli},
    error::{CliError, RegistryError},
    install::InstallDestination,
    registry::{HttpRegistryClient, RegistryClient},
    store::{DetailState, ListState, SkillGroup, SkillStore},
};
