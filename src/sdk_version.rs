use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Havok SDK version as written in a tag file's `sdkversion` attribute,
/// e.g. `hk_2011.3.0-r1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SdkVersion {
    pub year: u32,
    pub minor: u32,
    pub patch: u32,
    pub release: Option<u32>,
}

impl SdkVersion {
    pub fn new(year: u32, minor: u32, patch: u32) -> Self {
        Self { year, minor, patch, release: None }
    }

    pub fn with_release(mut self, release: u32) -> Self {
        self.release = Some(release);
        self
    }

    /// Same SDK line, ignoring the release suffix
    pub fn same_line(&self, other: &SdkVersion) -> bool {
        self.year == other.year && self.minor == other.minor && self.patch == other.patch
    }
}

fn sdk_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^hk_(\d+)\.(\d+)\.(\d+)(?:-r(\d+))?$").expect("SDK version pattern is valid")
    })
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hk_{}.{}.{}", self.year, self.minor, self.patch)?;
        if let Some(release) = self.release {
            write!(f, "-r{}", release)?;
        }
        Ok(())
    }
}

impl FromStr for SdkVersion {
    type Err = SdkVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SdkVersionError::InvalidFormat(s.to_string());
        let captures = sdk_version_pattern().captures(s.trim()).ok_or_else(invalid)?;

        let number = |index: usize| -> Result<u32, SdkVersionError> {
            captures[index].parse().map_err(|_| invalid())
        };
        let year = number(1)?;
        let minor = number(2)?;
        let patch = number(3)?;
        let release = match captures.get(4) {
            Some(m) => Some(m.as_str().parse().map_err(|_| invalid())?),
            None => None,
        };

        Ok(SdkVersion { year, minor, patch, release })
    }
}

impl TryFrom<String> for SdkVersion {
    type Error = SdkVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SdkVersion> for String {
    fn from(version: SdkVersion) -> Self {
        version.to_string()
    }
}

impl PartialOrd for SdkVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SdkVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.year.cmp(&other.year)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.patch.cmp(&other.patch))
            .then_with(|| self.release.cmp(&other.release))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SdkVersionError {
    #[error("Invalid SDK version format: {0}")]
    InvalidFormat(String),
}
