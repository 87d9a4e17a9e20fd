// Shared helpers for integration tests.
//
// Provides local git repositories to vendor from and a temporary project
// directory with a fluent builder, so each integration test runs against an
// isolated environment with no network access.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{IndexAddOption, Oid, Repository, Signature};

use quack::commands::{self, Request};
use quack::exec::SystemExecutor;
use quack::logging::MemoryLog;
use quack::tasks::RunStats;

/// A source repository to vendor modules from.
pub struct SourceRepo {
    /// Temporary directory holding the repository.
    pub dir: tempfile::TempDir,
    repo: Repository,
}

impl SourceRepo {
    /// Create an empty repository.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create source dir");
        let repo = Repository::init(dir.path()).expect("init source repo");
        Self { dir, repo }
    }

    /// URL (local path) to clone from.
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Write `content` to `relative` in the working tree.
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source parent");
        }
        std::fs::write(path, content).expect("write source file");
        self
    }

    /// Commit everything in the working tree on the current branch.
    pub fn commit(&self, message: &str) -> Oid {
        let mut index = self.repo.index().expect("open index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("stage files");
        index.write().expect("write index");
        let tree = self
            .repo
            .find_tree(index.write_tree().expect("write tree"))
            .expect("find tree");
        let sig = Signature::now("quack", "quack@example.invalid").expect("signature");
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit")
    }

    /// Lightweight tag on `commit`.
    pub fn tag(&self, name: &str, commit: Oid) {
        let object = self.repo.find_object(commit, None).expect("find commit");
        self.repo
            .tag_lightweight(name, &object, false)
            .expect("create tag");
    }

    /// Create branch `name` at `commit`.
    pub fn branch(&self, name: &str, commit: Oid) {
        let commit = self.repo.find_commit(commit).expect("find commit");
        self.repo.branch(name, &commit, false).expect("create branch");
    }
}

/// The standard two-commit source: `v1.0` tags a tree with `VERSION=1`,
/// the branch tip has `VERSION=2` and an extra `docs/` directory.
pub fn versioned_source() -> (SourceRepo, Oid, Oid) {
    let source = SourceRepo::new();
    source
        .write("VERSION", "1")
        .write("include/lib.h", "int lib(void);")
        .write(".gitmodules", "[submodule \"inner\"]");
    let first = source.commit("first");
    source.tag("v1.0", first);
    source.write("VERSION", "2").write("docs/readme.md", "docs");
    let second = source.commit("second");
    (source, first, second)
}

/// An isolated project directory backed by a [`tempfile::TempDir`].
pub struct Project {
    /// Temporary project root.
    pub root: tempfile::TempDir,
}

impl Project {
    /// Path to the project root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Path of `relative` inside the project.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    /// Replace `quack.yaml`.
    pub fn set_config(&self, yaml: &str) {
        std::fs::write(self.join("quack.yaml"), yaml).expect("write quack.yaml");
    }

    /// Read a project file.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.join(relative)).expect("read project file")
    }

    /// A request for `profile` with the default configuration file.
    pub fn request(&self, profile: &str) -> Request {
        let mut request = Request::new(self.path().to_path_buf());
        request.profile = profile.to_string();
        request
    }

    /// Run `request`, capturing log output.
    pub fn run_request(&self, request: &Request) -> (anyhow::Result<Option<RunStats>>, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let result = commands::run(request, log.clone(), Arc::new(SystemExecutor));
        (result, log)
    }

    /// Run `profile` and expect it to succeed with a configuration present.
    pub fn run(&self, profile: &str) -> (RunStats, Arc<MemoryLog>) {
        let (result, log) = self.run_request(&self.request(profile));
        let stats = result.expect("run succeeds").expect("configuration present");
        (stats, log)
    }
}

/// Fluent builder for [`Project`].
pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    /// Begin building an empty project.
    pub fn new() -> Self {
        Self {
            project: Project {
                root: tempfile::tempdir().expect("create project dir"),
            },
        }
    }

    /// Write `quack.yaml`.
    pub fn with_config(self, yaml: &str) -> Self {
        self.project.set_config(yaml);
        self
    }

    /// Write an arbitrary file.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.project.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write file");
        self
    }

    /// Make the project root a git repository.
    pub fn with_git(self) -> Self {
        Repository::init(self.project.path()).expect("init project repo");
        self
    }

    /// Finish building.
    pub fn build(self) -> Project {
        self.project
    }
}

/// `true` if `dir` contains any entry whose name starts with `.git`, at any
/// depth.
pub fn contains_git_metadata(dir: &Path) -> bool {
    std::fs::read_dir(dir).expect("read dir").any(|entry| {
        let entry = entry.expect("dir entry");
        entry.file_name().to_string_lossy().starts_with(".git")
            || (entry.path().is_dir() && contains_git_metadata(&entry.path()))
    })
}
