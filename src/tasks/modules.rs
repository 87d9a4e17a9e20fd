//! Module synchronisation (clone → checkout → place) and cleaning.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::Context;
use crate::commands::FailurePolicy;
use crate::config::{PinPolicy, ResolvedModule, modules::is_safe_destination};
use crate::error::ModuleError;
use crate::git;
use crate::logging::TaskStatus;
use crate::resources::fs;
use crate::resources::ignore::{IGNORE_FILE, IgnoreList};

/// Scratch root for transient clones, relative to the project root.
pub const SCRATCH_DIR: &str = ".quack/modules";

/// Native submodule metadata purged at the start of every pass.
const NATIVE_MODULES_DIR: &str = ".git/modules";

/// Legacy submodule declaration removed after a module is placed.
const LEGACY_SUBMODULES_FILE: &str = ".gitmodules";

/// What a synchronisation pass did, by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Modules placed at their destination.
    pub synced: Vec<String>,
    /// Modules skipped for configuration or placement problems.
    pub skipped: Vec<String>,
    /// Modules whose clone/checkout/copy failed under
    /// [`FailurePolicy::ContinueOnError`].
    pub failed: Vec<String>,
}

/// The `.quack/modules` scratch root for one pass.
///
/// Created fresh on entry; removed (together with `.quack` when it is left
/// empty) when dropped, whether the pass succeeded or not.
#[derive(Debug)]
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn prepare(root: &Path) -> Result<Self> {
        let path = root.join(SCRATCH_DIR);
        fs::remove_path(&path)?;
        fs::remove_path(&root.join(NATIVE_MODULES_DIR))?;
        std::fs::create_dir_all(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        Ok(Self { path })
    }

    fn workspace(&self, module: &str) -> CloneWorkspace {
        CloneWorkspace {
            path: self.path.join(module),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        fs::remove_path(&self.path).ok();
        if let Some(parent) = self.path.parent() {
            std::fs::remove_dir(parent).ok();
        }
    }
}

/// Temporary clone of a single module, destroyed on drop.
#[derive(Debug)]
struct CloneWorkspace {
    path: PathBuf,
}

impl Drop for CloneWorkspace {
    fn drop(&mut self) {
        fs::remove_path(&self.path).ok();
    }
}

/// Fetch every configured module, or only `only`.
///
/// Configuration and placement problems are reported and the module is
/// skipped.  Clone, checkout and copy errors follow the request's
/// [`FailurePolicy`].
///
/// # Errors
///
/// Returns the first module failure under [`FailurePolicy::FailFast`], or an
/// error if the scratch directory or ignore file cannot be prepared.
pub fn sync(ctx: &Context, only: Option<&str>) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let modules = &ctx.config.modules;
    if modules.is_empty() {
        ctx.log.info("No modules found.");
        return Ok(report);
    }
    if let Some(name) = only
        && ctx.config.module(name).is_none()
    {
        ctx.log.warn(&format!("module '{name}' is not configured"));
        return Ok(report);
    }

    let scratch = ScratchDir::prepare(ctx.root())?;
    let mut ignore = if ctx.config.gitignore {
        Some(IgnoreList::load(&ctx.root().join(IGNORE_FILE))?)
    } else {
        None
    };

    for (name, spec) in modules {
        if only.is_some_and(|o| o != name) {
            continue;
        }

        let module = match spec.resolve(name) {
            Ok(module) => module,
            Err(e) => {
                skip(ctx, &mut report, name, &e);
                continue;
            }
        };

        match sync_module(ctx, &scratch, &module) {
            Ok(Placement::Placed) => {
                ctx.log.record_task(name, TaskStatus::Ok, None);
                report.synced.push(name.clone());
                if let Some(list) = ignore.as_mut()
                    && list.track(name)?
                {
                    ctx.log.debug(&format!("added {name} to {IGNORE_FILE}"));
                }
            }
            Ok(Placement::SubpathMissing(e)) => skip(ctx, &mut report, name, &e),
            Err(e) => match ctx.request.failure_policy {
                FailurePolicy::FailFast => {
                    return Err(e.context(format!("synchronising module {name}")));
                }
                FailurePolicy::ContinueOnError => {
                    ctx.log.error(&format!("{name}: {e:#}"));
                    ctx.log
                        .record_task(name, TaskStatus::Failed, Some(&format!("{e:#}")));
                    report.failed.push(name.clone());
                }
            },
        }
    }

    Ok(report)
}

fn skip(ctx: &Context, report: &mut SyncReport, name: &str, error: &ModuleError) {
    let message = error.to_string();
    ctx.log.warn(&message);
    ctx.log
        .record_task(name, TaskStatus::Skipped, Some(&message));
    report.skipped.push(name.to_string());
}

enum Placement {
    Placed,
    SubpathMissing(ModuleError),
}

fn sync_module(ctx: &Context, scratch: &ScratchDir, module: &ResolvedModule) -> Result<Placement> {
    ctx.log.info(&format!("Cloning: {}", module.repository));
    let workspace = scratch.workspace(&module.name);
    fs::ensure_parent_dir(&workspace.path)?;

    let repo = git::clone(
        &module.repository,
        &workspace.path,
        module.branch.as_deref(),
        matches!(module.pin, PinPolicy::Tag(_)),
    )?;
    let label = match &module.pin {
        PinPolicy::Tag(tag) => {
            git::checkout_detached(&repo, &format!("refs/tags/{tag}"))?;
            tag.clone()
        }
        PinPolicy::Commit(sha) => {
            git::checkout_detached(&repo, sha)?;
            sha.clone()
        }
        PinPolicy::Branch(_) => git::head_commit(&repo)?,
    };
    drop(repo);

    let source = module.source_in(&workspace.path);
    if !source.exists() {
        return Ok(Placement::SubpathMissing(ModuleError::SubpathMissing {
            module: module.name.clone(),
            path: module.subpath.clone().unwrap_or_default(),
        }));
    }

    let destination = ctx.root().join(&module.name);
    fs::remove_path(&destination)?;
    if module.is_file {
        fs::copy_file(&source, &destination)?;
    } else {
        fs::ensure_parent_dir(&destination)?;
        fs::copy_dir_recursive(&source, &destination, module.pin.is_pinned())?;
    }
    drop(workspace);

    remove_legacy_submodules(ctx);
    ctx.log.info(&format!("Cloned: {} ({label})", module.name));
    Ok(Placement::Placed)
}

/// Migration aid: drop `.gitmodules` from the working tree and the index.
fn remove_legacy_submodules(ctx: &Context) {
    let path = ctx.root().join(LEGACY_SUBMODULES_FILE);
    if !path.is_file() {
        return;
    }
    if let Err(e) = fs::remove_path(&path) {
        ctx.log.debug(&format!("could not remove {LEGACY_SUBMODULES_FILE}: {e:#}"));
        return;
    }
    match git::untrack(ctx.root(), Path::new(LEGACY_SUBMODULES_FILE)) {
        Ok(_) => ctx
            .log
            .debug(&format!("removed legacy {LEGACY_SUBMODULES_FILE}")),
        Err(e) => ctx.log.debug(&format!("{e}")),
    }
}

/// Remove the destination of every configured module, or only `only`.
///
/// Destinations that do not exist are skipped silently.
///
/// # Errors
///
/// Returns an error if an existing destination cannot be removed.
pub fn clean(ctx: &Context, only: Option<&str>) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for (name, _) in &ctx.config.modules {
        if only.is_some_and(|o| o != name) {
            continue;
        }
        if !is_safe_destination(name) {
            ctx.log
                .warn(&ModuleError::UnsafeDestination(name.clone()).to_string());
            continue;
        }
        if fs::remove_path(&ctx.root().join(name))? {
            ctx.log.info(&format!("Cleaned {name}"));
            removed.push(name.clone());
        }
    }
    Ok(removed)
}
