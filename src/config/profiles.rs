//! Profile definitions: named task pipelines.
use serde::{Deserialize, Deserializer};

use super::Config;

/// Profile used when none is requested.
pub const DEFAULT_PROFILE: &str = "init";

/// A named pipeline: dependencies first, then tasks in listed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// Raw task tokens in execution order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<String>,
    /// Nested quack references keyed by dependency name.
    #[serde(default, deserialize_with = "super::ordered_map")]
    pub dependencies: Vec<(String, String)>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Select the profile called `name`.
///
/// A missing profile is not an error: the run proceeds with an empty
/// profile, which only reports that there is nothing to do.  The second
/// element is `false` in that case so the caller can warn.
#[must_use]
pub fn select(config: &Config, name: &str) -> (Profile, bool) {
    config
        .profile(name)
        .map_or_else(|| (Profile::default(), false), |p| (p.clone(), true))
}
