use std::path::Path;
use std::sync::Arc;

use crate::commands::Request;
use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;

/// Shared context for one profile run.
pub struct Context {
    /// The invocation this run serves (root, profile, policies, depth).
    pub request: Request,
    /// Configuration loaded from the request's config file.
    pub config: Arc<Config>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Process runner for `cmd:` tasks and isolated nested runs.
    pub executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("config", &"<Config>")
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .finish()
    }
}

impl Context {
    /// Creates a new context for a profile run.
    #[must_use]
    pub fn new(
        request: Request,
        config: Arc<Config>,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            request,
            config,
            log,
            executor,
        }
    }

    /// Project root; every module destination is relative to it.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.request.root
    }
}
