//! Running a profile: configuration, dependencies, tasks, status line.
use anyhow::Result;
use std::sync::Arc;

use super::Request;
use crate::config::{self, profiles, scaffold};
use crate::exec::Executor;
use crate::logging::Log;
use crate::tasks::{self, Context, RunStats};

/// Run the requested profile.
///
/// Loads the configuration (offering to scaffold one when it is missing and
/// the request is interactive), runs the profile's dependencies then its
/// tasks, and reports the status line.  Returns `None` when there was no
/// configuration to run.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or parsed, or a
/// module operation fails under
/// [`FailurePolicy::FailFast`](super::FailurePolicy::FailFast).
pub fn run(
    request: &Request,
    log: Arc<dyn Log>,
    executor: Arc<dyn Executor>,
) -> Result<Option<RunStats>> {
    let path = request.config_path();
    log.debug(&format!("configuration: {}", path.display()));

    let config = match config::load(&path)? {
        Some(config) => config,
        None if request.interactive => {
            let stdin = std::io::stdin();
            let created =
                scaffold::prompt_to_create(&path, &mut stdin.lock(), &mut std::io::stdout())?;
            let Some(config) = created else {
                return Ok(None);
            };
            log.info(&format!("created {}", path.display()));
            config
        }
        None => {
            log.warn(&format!("no quack configuration found at {}", path.display()));
            return Ok(None);
        }
    };

    if let Some(name) = &config.name {
        log.debug(&format!("project: {name}"));
    }
    let (profile, found) = profiles::select(&config, &request.profile);
    if !found {
        log.warn(&format!("profile '{}' not found", request.profile));
    }
    log.debug(&format!(
        "profile {}: {} task(s), {} dependencies",
        request.profile,
        profile.tasks.len(),
        profile.dependencies.len()
    ));

    let ctx = Context::new(request.clone(), Arc::new(config), Arc::clone(&log), executor);
    let stats = tasks::run_profile(&ctx, &profile)?;

    log.info(&format!(
        "{} task(s) completed with {} dependencies.",
        stats.tasks_run, stats.dependencies_run
    ));
    Ok(Some(stats))
}
