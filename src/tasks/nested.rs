//! Nested quack references: `[subdir/][config][:profile]`.
use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};

use super::{Context, RunStats};
use crate::commands::{self, NestedMode};
use crate::error::TaskError;
use crate::git;
use crate::resources::fs;

/// Deepest allowed chain of nested runs.
pub const MAX_NESTING_DEPTH: usize = 16;

/// A parsed nested quack reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuackRef {
    /// Directory of the nested project, relative to the parent root.
    pub subdir: String,
    /// Alternate configuration file name, `None` for the default.
    pub config: Option<String>,
    /// Profile to run, `None` for the default.
    pub profile: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn is_config_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

impl QuackRef {
    /// Parse a compact reference.  Returns `None` for an empty reference.
    ///
    /// ```
    /// use quack::tasks::QuackRef;
    ///
    /// let r = QuackRef::parse("sub/cfg.yaml:release").unwrap();
    /// assert_eq!(r.subdir, "sub");
    /// assert_eq!(r.config.as_deref(), Some("cfg.yaml"));
    /// assert_eq!(r.profile.as_deref(), Some("release"));
    /// ```
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let (location, profile) = reference
            .split_once(':')
            .map_or((reference, None), |(location, profile)| {
                (location, non_empty(profile))
            });
        let (subdir, config) = match location.rsplit_once('/') {
            Some((dir, file)) => (dir, non_empty(file)),
            None if is_config_file(location) => ("", Some(location.to_string())),
            None => (location, None),
        };
        let subdir = non_empty(subdir).unwrap_or_else(|| ".".to_string());
        Some(Self {
            subdir,
            config,
            profile,
        })
    }
}

/// Result of a nested dispatch.  Never an error for the parent run.
#[derive(Debug, Clone)]
pub enum NestedOutcome {
    /// In-process run finished; `stats` is `None` when the nested project has
    /// no configuration.
    Completed {
        /// Nested project directory as referenced.
        subdir: String,
        /// Statistics of the nested run.
        stats: Option<RunStats>,
    },
    /// Isolated run exited.
    Exited {
        /// Nested project directory as referenced.
        subdir: String,
        /// Exit code of the child process, `None` if killed by a signal.
        code: Option<i32>,
    },
    /// The nested run could not be started or aborted.
    Failed {
        /// Nested project directory as referenced.
        subdir: String,
        /// Rendered error chain.
        reason: String,
    },
}

/// Gives a nested project a repository of its own for the duration of the
/// run.  Only a `.git` created here is removed again.
#[derive(Debug)]
struct GitScope {
    created: Option<PathBuf>,
}

impl GitScope {
    fn enter(dir: &Path) -> Result<Self> {
        let git_dir = dir.join(".git");
        if git_dir.exists() {
            return Ok(Self { created: None });
        }
        git::init(dir)?;
        Ok(Self {
            created: Some(git_dir),
        })
    }
}

impl Drop for GitScope {
    fn drop(&mut self) {
        if let Some(git_dir) = &self.created {
            fs::remove_path(git_dir).ok();
        }
    }
}

/// Run the project `reference` points to.
///
/// Failures are logged and returned as [`NestedOutcome::Failed`]; they never
/// abort the parent.
pub fn dispatch(ctx: &Context, reference: &QuackRef) -> NestedOutcome {
    ctx.log.stage(&format!("Quack..{}", reference.subdir));
    run_nested(ctx, reference).unwrap_or_else(|e| {
        let reason = format!("{e:#}");
        ctx.log
            .error(&format!("quack {}: {reason}", reference.subdir));
        NestedOutcome::Failed {
            subdir: reference.subdir.clone(),
            reason,
        }
    })
}

fn run_nested(ctx: &Context, reference: &QuackRef) -> Result<NestedOutcome> {
    if ctx.request.depth >= MAX_NESTING_DEPTH {
        return Err(TaskError::NestingTooDeep(MAX_NESTING_DEPTH).into());
    }
    let child = ctx.request.nested(reference);
    if !child.root.is_dir() {
        bail!("{} is not a directory", child.root.display());
    }

    let _scope = GitScope::enter(&child.root)?;
    let subdir = reference.subdir.clone();
    match ctx.request.nested_mode {
        NestedMode::InProcess => {
            let stats = commands::run(&child, ctx.log.clone(), ctx.executor.clone())?;
            Ok(NestedOutcome::Completed { subdir, stats })
        }
        NestedMode::Isolated => {
            let exe = std::env::current_exe().context("locating the quack executable")?;
            let result = ctx
                .executor
                .run_in(&child.root, &exe.to_string_lossy(), &child.cli_args())?;
            Ok(NestedOutcome::Exited {
                subdir,
                code: result.code,
            })
        }
    }
}
