//! The `quack.yaml` document model and loader.
pub mod modules;
pub mod profiles;
pub mod scaffold;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

pub use modules::{ModuleSpec, PinPolicy, ResolvedModule};
pub use profiles::Profile;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "quack.yaml";

/// A loaded `quack.yaml`.  Immutable for the duration of a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Project name.
    #[serde(default)]
    pub name: Option<String>,
    /// Keep `.gitignore` in sync with placed modules.
    #[serde(default)]
    pub gitignore: bool,
    /// Modules in document order.
    #[serde(default, deserialize_with = "ordered_map")]
    pub modules: Vec<(String, ModuleSpec)>,
    /// Profiles in document order.
    #[serde(default, deserialize_with = "ordered_map")]
    pub profiles: Vec<(String, Profile)>,
}

impl Config {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns the underlying YAML error if the document does not match the
    /// schema.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document is null, which serde_yaml refuses as a struct.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Look up a profile by name.
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|(profile, _)| profile == name)
            .map(|(_, profile)| profile)
    }

    /// Look up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleSpec> {
        self.modules
            .iter()
            .find(|(module, _)| module == name)
            .map(|(_, spec)| spec)
    }
}

/// Load the configuration at `path`.
///
/// Returns `Ok(None)` if the file does not exist so the caller can decide
/// whether to scaffold one.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_yaml(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Deserialize a YAML mapping into `(key, value)` pairs, keeping document
/// order.  A null or missing mapping yields an empty list.
pub(crate) fn ordered_map<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error as _;

    let Some(mapping) = Option::<serde_yaml::Mapping>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    mapping
        .into_iter()
        .map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "mapping keys must be strings, found {other:?}"
                    )));
                }
            };
            let value = serde_yaml::from_value(value)
                .map_err(|e| D::Error::custom(format!("{key}: {e}")))?;
            Ok((key, value))
        })
        .collect()
}
