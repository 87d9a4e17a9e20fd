//! The orchestrator: one [`Request`] per invocation, threaded through every
//! run, top-level or nested.
pub mod run;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::config::profiles::DEFAULT_PROFILE;
use crate::tasks::nested::QuackRef;

pub use run::run;

/// What to do when cloning, checking out or placing a module fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run on the first failure.
    #[default]
    FailFast,
    /// Report the failure, record the module as failed and carry on.
    ContinueOnError,
}

/// How nested quack references are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NestedMode {
    /// Recursive call into the orchestrator within this process.
    #[default]
    InProcess,
    /// Re-execute the `quack` binary inside the nested directory.
    Isolated,
}

/// Everything a run needs to know about its invocation.
///
/// Built once from the command line and derived (never mutated) for each
/// nested run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Project root; module destinations and commands are relative to it.
    pub root: PathBuf,
    /// Configuration file, relative to `root` unless absolute.
    pub config_file: PathBuf,
    /// Profile to run.
    pub profile: String,
    /// Module failure handling.
    pub failure_policy: FailurePolicy,
    /// Execution of nested references.
    pub nested_mode: NestedMode,
    /// Nesting level, zero for the top-level run.
    pub depth: usize,
    /// Whether a missing configuration may be scaffolded interactively.
    pub interactive: bool,
}

impl Request {
    /// A non-interactive request for the default config and profile at
    /// `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            profile: DEFAULT_PROFILE.to_string(),
            failure_policy: FailurePolicy::default(),
            nested_mode: NestedMode::default(),
            depth: 0,
            interactive: false,
        }
    }

    /// Build the top-level request from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if `--root` is absent and the current directory
    /// cannot be determined.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("determining the current directory")?,
        };
        Ok(Self {
            root,
            config_file: cli.yaml.clone(),
            profile: cli.profile.clone(),
            failure_policy: if cli.keep_going {
                FailurePolicy::ContinueOnError
            } else {
                FailurePolicy::FailFast
            },
            nested_mode: if cli.isolated {
                NestedMode::Isolated
            } else {
                NestedMode::InProcess
            },
            depth: cli.depth,
            interactive: true,
        })
    }

    /// Location of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        if self.config_file.is_absolute() {
            self.config_file.clone()
        } else {
            self.root.join(&self.config_file)
        }
    }

    /// The request for a nested run of `reference`.
    ///
    /// Policies are inherited; config and profile fall back to the defaults
    /// rather than to the parent's, and the child never prompts.
    #[must_use]
    pub fn nested(&self, reference: &QuackRef) -> Self {
        Self {
            root: self.root.join(&reference.subdir),
            config_file: PathBuf::from(
                reference.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
            ),
            profile: reference
                .profile
                .clone()
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            failure_policy: self.failure_policy,
            nested_mode: self.nested_mode,
            depth: self.depth + 1,
            interactive: false,
        }
    }

    /// Command-line arguments reproducing this request in a child process
    /// started in [`Request::root`].
    #[must_use]
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.profile.clone(),
            "-y".to_string(),
            path_arg(&self.config_file),
            "--depth".to_string(),
            self.depth.to_string(),
        ];
        if self.failure_policy == FailurePolicy::ContinueOnError {
            args.push("--keep-going".to_string());
        }
        if self.nested_mode == NestedMode::Isolated {
            args.push("--isolated".to_string());
        }
        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
