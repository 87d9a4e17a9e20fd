//! The task interpreter: profile tokens parsed into typed tasks and
//! dispatched in order.
mod context;
pub mod modules;
pub mod nested;

pub use context::Context;
pub use modules::SyncReport;
pub use nested::{NestedOutcome, QuackRef};

use anyhow::Result;

use crate::config::Profile;
use crate::error::TaskError;
use crate::exec::ExecResult;

/// What a task token asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// `modules`: every configured module.
    AllModules,
    /// `modules:<name>`: a single module.
    Module(String),
    /// `quack:<reference>`: a nested run.
    Nested(QuackRef),
    /// `cmd:<command>`: a raw command.
    Command(String),
    /// Anything else.
    Unknown,
}

/// A parsed profile task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskToken {
    /// Leading `-`: clean instead of fetch.  Only meaningful for module kinds.
    pub negated: bool,
    /// The operation.
    pub kind: TaskKind,
}

impl TaskToken {
    /// Classify a raw task string.  Never fails; unrecognised input becomes
    /// [`TaskKind::Unknown`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (negated, body) = raw
            .strip_prefix('-')
            .map_or((false, raw), |rest| (true, rest.trim_start()));

        let kind = if body == "modules" {
            TaskKind::AllModules
        } else if let Some(name) = body.strip_prefix("modules:") {
            let name = name.trim();
            if name.is_empty() {
                TaskKind::AllModules
            } else {
                TaskKind::Module(name.to_string())
            }
        } else if let Some(reference) = body.strip_prefix("quack:") {
            QuackRef::parse(reference).map_or(TaskKind::Unknown, TaskKind::Nested)
        } else if let Some(command) = body.strip_prefix("cmd:") {
            TaskKind::Command(command.trim().to_string())
        } else {
            TaskKind::Unknown
        };

        Self { negated, kind }
    }

    /// `Some(only)` for module directives, where `only` narrows the
    /// operation to one module.
    #[must_use]
    pub fn module_target(&self) -> Option<Option<&str>> {
        match &self.kind {
            TaskKind::AllModules => Some(None),
            TaskKind::Module(name) => Some(Some(name)),
            _ => None,
        }
    }
}

/// Result of a raw command task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The command as written.
    pub command: String,
    /// Exit status; `None` if the command was empty or could not be started.
    pub result: Option<ExecResult>,
}

/// What one task did.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Modules fetched.
    Fetched(SyncReport),
    /// Module destinations removed.
    Cleaned(Vec<String>),
    /// A raw command ran (or failed to start).
    Command(CommandOutcome),
    /// A nested run was dispatched.
    Nested(NestedOutcome),
    /// The token was not recognised.
    Unknown(String),
}

/// Aggregate of one profile run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Task tokens processed, whatever their kind or result.
    pub tasks_run: usize,
    /// Dependency entries processed, whatever their result.
    pub dependencies_run: usize,
    /// One outcome per task, in order.
    pub outcomes: Vec<TaskOutcome>,
    /// One outcome per dispatched dependency.
    pub dependencies: Vec<NestedOutcome>,
}

/// Run `profile`: every dependency, then every task in listed order.
///
/// Unknown tokens, command failures and nested-run failures are reported and
/// the run continues.
///
/// # Errors
///
/// Returns an error only when a module operation fails under
/// [`FailurePolicy::FailFast`](crate::commands::FailurePolicy::FailFast) or
/// the working tree cannot be prepared.
pub fn run_profile(ctx: &Context, profile: &Profile) -> Result<RunStats> {
    let mut stats = RunStats::default();

    for (name, reference) in &profile.dependencies {
        ctx.log.debug(&format!("dependency {name}: {reference}"));
        stats.dependencies_run += 1;
        match QuackRef::parse(reference) {
            Some(reference) => stats.dependencies.push(nested::dispatch(ctx, &reference)),
            None => ctx
                .log
                .warn(&format!("dependency '{name}' has an empty quack reference")),
        }
    }

    if profile.tasks.is_empty() {
        ctx.log.info("No tasks found.");
        return Ok(stats);
    }

    for raw in &profile.tasks {
        let token = TaskToken::parse(raw);
        let outcome = execute(ctx, raw, &token)?;
        stats.tasks_run += 1;
        stats.outcomes.push(outcome);
    }

    Ok(stats)
}

fn execute(ctx: &Context, raw: &str, token: &TaskToken) -> Result<TaskOutcome> {
    if let Some(only) = token.module_target() {
        return Ok(if token.negated {
            ctx.log.stage("Cleaning modules");
            TaskOutcome::Cleaned(modules::clean(ctx, only)?)
        } else {
            ctx.log.stage("Fetching modules");
            TaskOutcome::Fetched(modules::sync(ctx, only)?)
        });
    }

    if token.negated {
        ctx.log
            .debug(&format!("negation has no effect on '{raw}'"));
    }
    Ok(match &token.kind {
        TaskKind::Nested(reference) => TaskOutcome::Nested(nested::dispatch(ctx, reference)),
        TaskKind::Command(command) => TaskOutcome::Command(run_command(ctx, command)),
        _ => {
            ctx.log
                .error(&TaskError::UnknownTask(raw.to_string()).to_string());
            TaskOutcome::Unknown(raw.to_string())
        }
    })
}

/// Run a whitespace-split command in the project root.  No shell is
/// involved; the exit status is reported but never fails the run.
fn run_command(ctx: &Context, command: &str) -> CommandOutcome {
    let mut outcome = CommandOutcome {
        command: command.to_string(),
        result: None,
    };
    let mut words = command.split_whitespace();
    let Some(program) = words.next() else {
        ctx.log.warn("empty command");
        return outcome;
    };
    let args: Vec<String> = words.map(String::from).collect();

    ctx.log.info(&format!("Running: {command}"));
    match ctx.executor.run_in(ctx.root(), program, &args) {
        Ok(result) => {
            if !result.success {
                let code = result
                    .code
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
                ctx.log
                    .debug(&format!("'{command}' exited with {code}"));
            }
            outcome.result = Some(result);
        }
        Err(e) => ctx.log.warn(&format!("{e:#}")),
    }
    outcome
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::commands::Request;
    use crate::config::Config;
    use crate::exec::MockExecutor;
    use crate::logging::{Level, MemoryLog};
    use std::path::Path;
    use std::sync::Arc;

    fn context(root: &Path, executor: MockExecutor) -> (Context, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::new(
            Request::new(root.to_path_buf()),
            Arc::new(Config::default()),
            log.clone(),
            Arc::new(executor),
        );
        (ctx, log)
    }

    fn profile(tasks: &[&str]) -> Profile {
        Profile {
            tasks: tasks.iter().map(|t| (*t).to_string()).collect(),
            dependencies: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // TaskToken::parse
    // -----------------------------------------------------------------------

    #[test]
    fn parse_module_directives() {
        assert_eq!(TaskToken::parse("modules").kind, TaskKind::AllModules);
        assert_eq!(TaskToken::parse("modules:").kind, TaskKind::AllModules);
        assert_eq!(
            TaskToken::parse("modules:vendor/lib").kind,
            TaskKind::Module("vendor/lib".into())
        );
        let negated = TaskToken::parse("-modules:lib");
        assert!(negated.negated);
        assert_eq!(negated.module_target(), Some(Some("lib")));
    }

    #[test]
    fn parse_command_and_nested() {
        assert_eq!(
            TaskToken::parse("cmd: make  all").kind,
            TaskKind::Command("make  all".into())
        );
        assert_eq!(
            TaskToken::parse("quack:sub:release").kind,
            TaskKind::Nested(QuackRef {
                subdir: "sub".into(),
                config: None,
                profile: Some("release".into()),
            })
        );
        assert_eq!(TaskToken::parse("quack:").kind, TaskKind::Unknown);
    }

    #[test]
    fn parse_unknown_tokens() {
        for raw in ["build", "module", "modulesfoo", "-", ""] {
            assert_eq!(TaskToken::parse(raw).kind, TaskKind::Unknown, "{raw:?}");
        }
        assert_eq!(TaskToken::parse("cmd:ls").module_target(), None);
    }

    // -----------------------------------------------------------------------
    // run_profile
    // -----------------------------------------------------------------------

    #[test]
    fn empty_profile_reports_no_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = context(dir.path(), MockExecutor::new());
        let stats = run_profile(&ctx, &Profile::default()).unwrap();
        assert_eq!(stats.tasks_run, 0);
        assert_eq!(stats.dependencies_run, 0);
        assert_eq!(log.messages(Level::Info), vec!["No tasks found."]);
    }

    #[test]
    fn command_exit_status_is_exposed_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor
            .expect_run_in()
            .withf(|_, program, args| {
                program == "false" && args.iter().map(String::as_str).eq(["--flag", "x"])
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(ExecResult {
                    success: false,
                    code: Some(3),
                })
            });
        let (ctx, _log) = context(dir.path(), executor);

        let stats = run_profile(&ctx, &profile(&["cmd:false --flag x"])).unwrap();

        assert_eq!(stats.tasks_run, 1);
        let TaskOutcome::Command(outcome) = &stats.outcomes[0] else {
            panic!("expected a command outcome");
        };
        assert_eq!(outcome.result.map(|r| r.code), Some(Some(3)));
    }

    #[test]
    fn spawn_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor
            .expect_run_in()
            .returning(|_, _, _| Err(anyhow::anyhow!("failed to execute: nope")));
        let (ctx, log) = context(dir.path(), executor);

        let stats = run_profile(&ctx, &profile(&["cmd:nope", "cmd:"])).unwrap();

        assert_eq!(stats.tasks_run, 2);
        assert_eq!(
            log.messages(Level::Warn),
            vec!["failed to execute: nope", "empty command"]
        );
    }

    #[test]
    fn unknown_tokens_are_reported_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = context(dir.path(), MockExecutor::new());

        let stats = run_profile(&ctx, &profile(&["build", "-deploy"])).unwrap();

        assert_eq!(stats.tasks_run, 2);
        assert_eq!(
            log.messages(Level::Error),
            vec!["unknown task 'build'", "unknown task '-deploy'"]
        );
        assert!(matches!(&stats.outcomes[0], TaskOutcome::Unknown(t) if t == "build"));
    }

    #[test]
    fn negated_command_still_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor.expect_run_in().times(1).returning(|_, _, _| {
            Ok(ExecResult {
                success: true,
                code: Some(0),
            })
        });
        let (ctx, log) = context(dir.path(), executor);

        run_profile(&ctx, &profile(&["-cmd:true"])).unwrap();

        assert!(log.contains("negation has no effect on '-cmd:true'"));
    }

    #[test]
    fn negated_modules_clean_instead_of_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::new(
            Request::new(dir.path().to_path_buf()),
            Arc::new(Config::from_yaml("modules:\n  lib:\n    repository: x\n    tag: v1\n").unwrap()),
            log.clone(),
            Arc::new(MockExecutor::new()),
        );

        let stats = run_profile(&ctx, &profile(&["-modules"])).unwrap();

        assert!(!dir.path().join("lib").exists());
        assert!(matches!(&stats.outcomes[0], TaskOutcome::Cleaned(names) if names == &["lib"]));
        assert!(!log.contains("Cloning:"));
    }

    #[test]
    fn dependencies_run_first_and_count_regardless_of_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _log) = context(dir.path(), MockExecutor::new());
        let profile = Profile {
            tasks: Vec::new(),
            dependencies: vec![
                ("missing".into(), "does-not-exist".into()),
                ("blank".into(), "  ".into()),
            ],
        };

        let stats = run_profile(&ctx, &profile).unwrap();

        assert_eq!(stats.dependencies_run, 2);
        assert_eq!(stats.tasks_run, 0);
        assert!(matches!(
            stats.dependencies.as_slice(),
            [NestedOutcome::Failed { subdir, .. }] if subdir == "does-not-exist"
        ));
    }
}
