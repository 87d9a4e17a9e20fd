//! File-system primitives used when placing and cleaning modules.
use anyhow::{Context as _, Result};
use std::path::Path;

/// `true` for entries that belong to git's own bookkeeping (`.git`,
/// `.gitmodules`, `.gitignore`, `.gitattributes`, ...).
fn is_git_metadata(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with(".git")
}

/// Recursively copy a directory tree.
///
/// When `skip_git` is `true`, every entry whose name starts with `.git` is
/// skipped at any depth, so a pinned snapshot carries no repository
/// metadata.
///
/// Symlinks within the source tree are *followed*: directory symlinks are
/// recursed into and their contents materialised.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path, skip_git: bool) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        if skip_git && is_git_metadata(&entry.file_name()) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, skip_git)?;
        } else {
            std::fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directories.
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the copy fails.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst)?;
    std::fs::copy(src, dst)
        .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove whatever exists at `path`: a directory tree, a file, or a
/// (possibly broken) symlink.
///
/// Returns `false` when nothing was there.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_path(path: &Path) -> Result<bool> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(false);
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn source_with_git_metadata() -> tempfile::TempDir {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("file.txt"), b"content").unwrap();
        std::fs::write(src.path().join(".gitmodules"), b"[submodule]").unwrap();
        std::fs::create_dir(src.path().join(".git")).unwrap();
        std::fs::write(src.path().join(".git/HEAD"), b"ref: refs/heads/main").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/.gitignore"), b"target").unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();
        src
    }

    #[test]
    fn copies_files_and_subdirectories() {
        let src = source_with_git_metadata();
        let dst = tempfile::tempdir().unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target, false).unwrap();

        assert_eq!(std::fs::read(target.join("file.txt")).unwrap(), b"content");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn skips_git_metadata_at_any_depth_when_flag_set() {
        let src = source_with_git_metadata();
        let dst = tempfile::tempdir().unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target, true).unwrap();

        assert!(target.join("file.txt").exists());
        assert!(target.join("sub/b.txt").exists());
        assert!(!target.join(".git").exists(), ".git should be skipped");
        assert!(!target.join(".gitmodules").exists());
        assert!(!target.join("sub/.gitignore").exists());
    }

    #[test]
    fn copies_git_metadata_when_flag_not_set() {
        let src = source_with_git_metadata();
        let dst = tempfile::tempdir().unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target, false).unwrap();

        assert!(target.join(".git/HEAD").exists(), ".git should be copied");
        assert!(target.join(".gitmodules").exists());
    }

    #[test]
    fn copy_file_creates_parents() {
        let src = tempfile::tempdir().unwrap();
        let file = src.path().join("settings.json");
        std::fs::write(&file, b"{}").unwrap();

        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("conf/deep/settings.json");
        copy_file(&file, &target).unwrap();

        assert_eq!(std::fs::read(target).unwrap(), b"{}");
    }

    #[test]
    fn remove_path_handles_files_dirs_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        let tree = dir.path().join("tree/nested");
        std::fs::write(&file, b"x").unwrap();
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("g.txt"), b"y").unwrap();

        assert!(remove_path(&file).unwrap());
        assert!(remove_path(&dir.path().join("tree")).unwrap());
        assert!(!file.exists());
        assert!(!dir.path().join("tree").exists());
        assert!(!remove_path(&dir.path().join("absent")).unwrap());
    }
}
