//! Module specifications and pin-policy resolution.
use std::path::{Component, Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::error::ModuleError;

/// Raw module entry from `quack.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleSpec {
    /// Clone URL (or local path) of the source repository.
    #[serde(default, deserialize_with = "scalar")]
    pub repository: Option<String>,
    /// Branch to clone; the remote default branch when absent.
    #[serde(default, deserialize_with = "scalar")]
    pub branch: Option<String>,
    /// Tag to pin to.
    #[serde(default, deserialize_with = "scalar")]
    pub tag: Option<String>,
    /// Commit to pin to.
    #[serde(default, deserialize_with = "scalar")]
    pub hexsha: Option<String>,
    /// Subpath inside the source repository; the repository root when absent.
    #[serde(default, deserialize_with = "scalar")]
    pub path: Option<String>,
    /// Place a single file instead of a directory tree.
    #[serde(default)]
    pub isfile: bool,
}

/// Accept any YAML scalar as text, so `hexsha: 1234567` or `tag: 2.5` is
/// not rejected as a number.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(D::Error::custom("expected a scalar value")),
    }
}

/// Which exact content of the repository is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinPolicy {
    /// Tip of the cloned branch.
    Branch(String),
    /// A tag, checked out detached.
    Tag(String),
    /// A specific commit, checked out detached.
    Commit(String),
}

impl PinPolicy {
    /// Tag and commit pins are detached snapshots and carry no git metadata.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        matches!(self, Self::Tag(_) | Self::Commit(_))
    }
}

/// A module whose configuration has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Module name, which is also its destination relative to the project root.
    pub name: String,
    /// Repository to clone.
    pub repository: String,
    /// Branch to clone, if one was requested.
    pub branch: Option<String>,
    /// Content selection.
    pub pin: PinPolicy,
    /// Subpath inside the clone.
    pub subpath: Option<String>,
    /// Copy a single file rather than a tree.
    pub is_file: bool,
}

impl ResolvedModule {
    /// Path of the content to place, inside a clone at `clone_dir`.
    #[must_use]
    pub fn source_in(&self, clone_dir: &Path) -> PathBuf {
        self.subpath
            .as_deref()
            .map_or_else(|| clone_dir.to_path_buf(), |sub| clone_dir.join(sub))
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// `true` if `name` is a relative path that stays inside the project root
/// and names something below it.  `.` and `./.` name the root itself.
#[must_use]
pub fn is_safe_destination(name: &str) -> bool {
    let mut names_entry = false;
    let stays_inside = Path::new(name).components().all(|c| match c {
        Component::Normal(_) => {
            names_entry = true;
            true
        }
        Component::CurDir => true,
        _ => false,
    });
    stays_inside && names_entry && !name.trim().is_empty()
}

impl ModuleSpec {
    /// Validate this entry and derive its pin policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] naming the module when the repository URL is
    /// missing, no pin is configured, both `tag` and `hexsha` are set, or the
    /// name is not a safe destination.
    pub fn resolve(&self, name: &str) -> Result<ResolvedModule, ModuleError> {
        let repository = non_empty(self.repository.as_ref())
            .ok_or_else(|| ModuleError::MissingRepository(name.to_string()))?;
        let branch = non_empty(self.branch.as_ref());
        let tag = non_empty(self.tag.as_ref());
        let hexsha = non_empty(self.hexsha.as_ref());

        let pin = match (branch, tag, hexsha) {
            (_, Some(_), Some(_)) => return Err(ModuleError::ConflictingPin(name.to_string())),
            (_, Some(tag), None) => PinPolicy::Tag(tag.to_string()),
            (_, None, Some(sha)) => PinPolicy::Commit(sha.to_string()),
            (Some(branch), None, None) => PinPolicy::Branch(branch.to_string()),
            (None, None, None) => return Err(ModuleError::MissingPin(name.to_string())),
        };

        if !is_safe_destination(name) {
            return Err(ModuleError::UnsafeDestination(name.to_string()));
        }

        Ok(ResolvedModule {
            name: name.to_string(),
            repository: repository.to_string(),
            branch: branch.map(str::to_string),
            pin,
            subpath: non_empty(self.path.as_ref()).map(str::to_string),
            is_file: self.isfile,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn spec(repository: Option<&str>) -> ModuleSpec {
        ModuleSpec {
            repository: repository.map(String::from),
            ..ModuleSpec::default()
        }
    }

    const URL: &str = "https://example.invalid/lib.git";

    #[test]
    fn missing_repository_is_reported_first() {
        let s = ModuleSpec {
            tag: Some("v1".into()),
            hexsha: Some("abc".into()),
            ..spec(None)
        };
        assert_eq!(
            s.resolve("lib"),
            Err(ModuleError::MissingRepository("lib".into()))
        );
    }

    #[test]
    fn blank_repository_counts_as_missing() {
        let s = ModuleSpec {
            branch: Some("main".into()),
            ..spec(Some("  "))
        };
        assert_eq!(
            s.resolve("lib"),
            Err(ModuleError::MissingRepository("lib".into()))
        );
    }

    #[test]
    fn no_pin_is_rejected() {
        assert_eq!(
            spec(Some(URL)).resolve("lib"),
            Err(ModuleError::MissingPin("lib".into()))
        );
    }

    #[test]
    fn tag_and_hexsha_conflict() {
        let s = ModuleSpec {
            branch: Some("main".into()),
            tag: Some("v1.0".into()),
            hexsha: Some("abc1234".into()),
            ..spec(Some(URL))
        };
        assert_eq!(
            s.resolve("lib"),
            Err(ModuleError::ConflictingPin("lib".into()))
        );
    }

    #[test]
    fn branch_only_tracks_branch_tip() {
        let s = ModuleSpec {
            branch: Some("develop".into()),
            ..spec(Some(URL))
        };
        let m = s.resolve("lib").unwrap();
        assert_eq!(m.pin, PinPolicy::Branch("develop".into()));
        assert_eq!(m.branch.as_deref(), Some("develop"));
        assert!(!m.pin.is_pinned());
    }

    #[test]
    fn tag_with_branch_clones_branch_and_pins_tag() {
        let s = ModuleSpec {
            branch: Some("release".into()),
            tag: Some("v2.1".into()),
            ..spec(Some(URL))
        };
        let m = s.resolve("lib").unwrap();
        assert_eq!(m.pin, PinPolicy::Tag("v2.1".into()));
        assert_eq!(m.branch.as_deref(), Some("release"));
        assert!(m.pin.is_pinned());
    }

    #[test]
    fn hexsha_pins_commit() {
        let s = ModuleSpec {
            hexsha: Some("0123abcd".into()),
            path: Some("include".into()),
            isfile: false,
            ..spec(Some(URL))
        };
        let m = s.resolve("vendor/lib").unwrap();
        assert_eq!(m.pin, PinPolicy::Commit("0123abcd".into()));
        assert_eq!(m.branch, None);
        assert_eq!(
            m.source_in(Path::new("/tmp/clone")),
            PathBuf::from("/tmp/clone/include")
        );
    }

    #[test]
    fn source_defaults_to_clone_root() {
        let m = ModuleSpec {
            tag: Some("v1".into()),
            ..spec(Some(URL))
        }
        .resolve("lib")
        .unwrap();
        assert_eq!(
            m.source_in(Path::new("/tmp/clone")),
            PathBuf::from("/tmp/clone")
        );
    }

    #[test]
    fn numeric_pins_are_read_as_text() {
        let spec: ModuleSpec =
            serde_yaml::from_str("repository: /src/lib\nhexsha: 1234567\n").unwrap();
        assert_eq!(
            spec.resolve("lib").unwrap().pin,
            PinPolicy::Commit("1234567".into())
        );

        let spec: ModuleSpec = serde_yaml::from_str("repository: /src/lib\ntag: 2.5\n").unwrap();
        assert_eq!(spec.resolve("lib").unwrap().pin, PinPolicy::Tag("2.5".into()));
    }

    #[test]
    fn non_scalar_pin_is_a_parse_error() {
        let err = serde_yaml::from_str::<ModuleSpec>("repository: x\ntag: [a, b]\n").unwrap_err();
        assert!(err.to_string().contains("expected a scalar value"));
    }

    #[test]
    fn escaping_destinations_are_rejected() {
        let s = ModuleSpec {
            tag: Some("v1".into()),
            ..spec(Some(URL))
        };
        for name in ["../outside", "/etc/lib", "a/../../b", "", ".", "./", "./."] {
            assert_eq!(
                s.resolve(name),
                Err(ModuleError::UnsafeDestination(name.into())),
                "{name} should be rejected"
            );
        }
        assert!(is_safe_destination("vendor/lib"));
        assert!(is_safe_destination("./lib"));
        assert!(is_safe_destination("lib/."));
    }
}
