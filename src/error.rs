//! Domain-specific error types for the quack engine.
//!
//! Internal modules return typed errors while the orchestrator and `main`
//! work with [`anyhow::Error`] and convert through the standard `?` operator.
//!
//! ```text
//! ConfigError  - reading and parsing quack.yaml
//! ModuleError  - per-module pin policy and placement problems
//! GitError     - clone, checkout and repository bookkeeping
//! TaskError    - task tokens and nested invocations
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise while loading the configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the quack schema.
    #[error("Invalid YAML in {path}: {source}")]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying deserialisation error.
        source: serde_yaml::Error,
    },
}

/// Per-module problems.  None of these abort a synchronisation pass; the
/// module is reported and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// No `repository` URL is configured.
    #[error("{0}: please configure a repository url")]
    MissingRepository(String),

    /// None of `branch`, `tag` or `hexsha` is configured.
    #[error("{0}: must have at least branch or tag or hexsha")]
    MissingPin(String),

    /// Both `tag` and `hexsha` are configured.
    #[error("{0}: cannot be both tag and hexsha")]
    ConflictingPin(String),

    /// The module name would place content outside the project root.
    #[error("{0}: destination must be a relative path inside the project")]
    UnsafeDestination(String),

    /// The configured `path` does not exist in the checked-out repository.
    #[error("{module}: {path} folder does not exist, skipped")]
    SubpathMissing {
        /// Module name.
        module: String,
        /// Configured subpath inside the source repository.
        path: String,
    },
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Cloning the repository failed.
    #[error("failed to clone {url}: {source}")]
    Clone {
        /// Repository URL.
        url: String,
        /// Underlying libgit2 error.
        source: git2::Error,
    },

    /// Resolving or checking out a reference failed.
    #[error("failed to check out {reference}: {source}")]
    Checkout {
        /// Tag ref or commit id that was requested.
        reference: String,
        /// Underlying libgit2 error.
        source: git2::Error,
    },

    /// Reading `HEAD` of a fresh clone failed.
    #[error("failed to resolve HEAD: {0}")]
    Head(#[source] git2::Error),

    /// Initialising a repository failed.
    #[error("failed to initialise repository at {path}: {source}")]
    Init {
        /// Directory that was being initialised.
        path: PathBuf,
        /// Underlying libgit2 error.
        source: git2::Error,
    },

    /// Updating the index of the project repository failed.
    #[error("failed to update index: {0}")]
    Index(#[source] git2::Error),
}

/// Errors that arise while interpreting tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The token does not name any known task kind.
    #[error("unknown task '{0}'")]
    UnknownTask(String),

    /// Nested quack references recursed too deeply (likely a cycle).
    #[error("nested quack depth limit of {0} exceeded")]
    NestingTooDeep(usize),
}
