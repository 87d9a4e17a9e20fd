//! Declarative module vendoring and task orchestration.
//!
//! A `quack.yaml` names external git repositories ("modules") and profiles of
//! ordered tasks.  Running a profile places pinned snapshots of those
//! repositories into the working tree, runs raw commands, and recurses into
//! nested quack projects.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: the YAML document model, pin-policy resolution and
//!   first-run scaffolding
//! - **[`resources`]**: idempotent working-tree primitives (tree copy, removal,
//!   ignore list)
//! - **[`git`]**: clone, checkout and repository bookkeeping
//! - **[`tasks`]**: the task interpreter, module synchroniser and nested
//!   dispatcher
//! - **[`commands`]**: the orchestrator and its [`commands::Request`]
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod git;
pub mod logging;
pub mod resources;
pub mod tasks;
