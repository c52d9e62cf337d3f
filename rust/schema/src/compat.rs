//! Engine SDK version handling.
//!
//! Some field types and index types only exist in newer engine SDK releases.
//! [`EngineCompat`] captures the installed version once and answers "is this
//! available" questions for the rest of the pipeline. It is immutable and cheap
//! to clone, so one value can be shared across any number of validations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

/// Version assumed when the caller does not say which SDK is installed.
pub const DEFAULT_ENGINE_VERSION: &str = "2.6.0";

/// Name of the SDK used in requirement messages and in the document section
/// that pins supported versions.
pub const ENGINE_SDK_NAME: &str = "pymilvus";

const OPTIONAL_TYPE_MIN_VERSIONS: &[(&str, &[u64])] = &[
    ("float16_vector", &[2, 6, 0]),
    ("bfloat16_vector", &[2, 6, 0]),
    ("int8_vector", &[2, 6, 0]),
];

const OPTIONAL_INDEX_MIN_VERSIONS: &[(&str, &[u64])] = &[
    ("GPU_CAGRA", &[2, 6, 0]),
    ("GPU_BRUTE_FORCE", &[2, 6, 0]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version string '{0}'")]
pub struct VersionParseError(pub String);

/// A version as an ordered tuple of integers.
///
/// Parsing keeps the leading run of numeric components separated by `.`, `+`
/// or `-`. A component with a non-numeric suffix contributes its numeric
/// prefix and ends the run, so `2.6.0rc1` is `(2, 6, 0)`. Comparison is
/// lexicographic, which makes `(2, 6)` sort before `(2, 6, 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(components: impl Into<Vec<u64>>) -> Self {
        Version(components.into())
    }

    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let mut components = Vec::new();
        for part in raw.trim().split(['.', '+', '-']) {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            let value = digits
                .parse::<u64>()
                .map_err(|_| VersionParseError(raw.to_string()))?;
            components.push(value);
            if digits.len() != part.len() {
                break;
            }
        }
        if components.is_empty() {
            return Err(VersionParseError(raw.to_string()));
        }
        Ok(Version(components))
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

pub fn version_eq(current: &Version, required: &Version) -> bool {
    current.cmp(required) == Ordering::Equal
}

pub fn version_at_least(current: &Version, minimum: &Version) -> bool {
    current >= minimum
}

pub fn version_at_most(current: &Version, maximum: &Version) -> bool {
    current <= maximum
}

fn requirement_text(min_version: &[u64]) -> String {
    format!(
        "Requires {}>={}",
        ENGINE_SDK_NAME,
        Version::new(min_version.to_vec())
    )
}

fn lookup<'a>(table: &'a [(&str, &[u64])], name: &str) -> Option<&'a [u64]> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, min_version)| *min_version)
}

/// Feature availability for one installed engine SDK version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCompat {
    raw_version: String,
    version: Version,
}

impl EngineCompat {
    pub fn new(raw_version: &str) -> Result<Self, VersionParseError> {
        Ok(EngineCompat {
            raw_version: raw_version.to_string(),
            version: Version::parse(raw_version)?,
        })
    }

    /// The version string exactly as it was supplied.
    pub fn raw_version(&self) -> &str {
        &self.raw_version
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    fn meets(&self, min_version: &[u64]) -> bool {
        version_at_least(&self.version, &Version::new(min_version.to_vec()))
    }

    /// Whether the type name is gated behind a minimum SDK version at all.
    pub fn is_optional_type(&self, type_name: &str) -> bool {
        lookup(OPTIONAL_TYPE_MIN_VERSIONS, type_name).is_some()
    }

    pub fn is_optional_index(&self, index_type: &str) -> bool {
        lookup(OPTIONAL_INDEX_MIN_VERSIONS, index_type).is_some()
    }

    /// True unless the type is gated and the installed version is too old.
    pub fn supports_type(&self, type_name: &str) -> bool {
        lookup(OPTIONAL_TYPE_MIN_VERSIONS, type_name).map_or(true, |min| self.meets(min))
    }

    pub fn supports_index(&self, index_type: &str) -> bool {
        lookup(OPTIONAL_INDEX_MIN_VERSIONS, index_type).map_or(true, |min| self.meets(min))
    }

    /// "Requires pymilvus>=X" for every gated type, supported or not.
    pub fn type_requirement(&self, type_name: &str) -> Option<String> {
        lookup(OPTIONAL_TYPE_MIN_VERSIONS, type_name).map(requirement_text)
    }

    pub fn index_requirement(&self, index_type: &str) -> Option<String> {
        lookup(OPTIONAL_INDEX_MIN_VERSIONS, index_type).map(requirement_text)
    }

    /// Gated index types that the installed version supports.
    pub fn supported_optional_indexes(&self) -> impl Iterator<Item = &'static str> + '_ {
        OPTIONAL_INDEX_MIN_VERSIONS
            .iter()
            .filter(|(_, min)| self.meets(min))
            .map(|(name, _)| *name)
    }
}

impl Default for EngineCompat {
    fn default() -> Self {
        EngineCompat {
            raw_version: DEFAULT_ENGINE_VERSION.to_string(),
            version: Version::new(vec![2, 6, 0]),
        }
    }
}
