//! Semantic version parsing, precedence and increments.
//!
//! Versions follow semver 2.0.0:
//! - `major.minor.patch` are non-negative integers without leading zeroes
//! - an optional `-prerelease` of dot-separated identifiers lowers precedence
//! - an optional `+build` is kept for display but never affects ordering
//!
//! Range bounds additionally use *floor* versions: the lowest possible version
//! of a `major.minor.patch`, below every one of its prereleases. Floors cannot
//! be parsed and render like the plain stable version.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use modsolve_util::errors::ModError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MUST_BEGIN_WITH_DIGITS: &str = "Version numbers MUST begin with three dot-separated numbers";
const NO_LEADING_ZEROES: &str = "Version numbers MUST NOT contain leading zeroes";
const PRE_EMPTY: &str = "Prerelease identifiers MUST NOT be empty";
const PRE_CHARSET: &str = "Prerelease identifiers MUST use only ASCII alphanumerics and hyphens";
const PRE_LEADING_ZEROES: &str = "Prerelease identifiers MUST NOT contain leading zeroes";
const BUILD_EMPTY: &str = "Build identifiers MUST NOT be empty";
const BUILD_CHARSET: &str = "Build identifiers MUST use only ASCII alphanumerics and hyphens";
const NUMERIC_OVERFLOW: &str = "Numeric identifiers MUST fit in 64 bits";

/// One dot-separated prerelease identifier.
///
/// Variant order matters: numeric identifiers always have lower precedence
/// than alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{n}"),
            Identifier::AlphaNumeric(s) => f.write_str(s),
        }
    }
}

/// The version component bumped by [`Version::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Major,
    Minor,
    Patch,
}

/// A parsed semantic version.
#[derive(Debug, Clone)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    /// `None` for stable versions, `Some(vec![])` for floors.
    pre: Option<Vec<Identifier>>,
    build: Vec<String>,
}

impl Version {
    /// The lowest version there is: the floor of `0.0.0`.
    pub const MIN: Version = Version::floor_of(0, 0, 0);

    /// A stable version with no prerelease or build metadata.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: Vec::new(),
        }
    }

    pub(crate) const fn floor_of(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Some(Vec::new()),
            build: Vec::new(),
        }
    }

    /// Parse a version string, rejecting anything outside the semver grammar.
    pub fn parse(text: &str) -> Result<Self, ModError> {
        let malformed = |reason: &str| ModError::MalformedVersion {
            input: text.to_string(),
            reason: reason.to_string(),
        };

        let (rest, build) = match text.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (text, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3
            || parts
                .iter()
                .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(malformed(MUST_BEGIN_WITH_DIGITS));
        }
        if parts.iter().any(|p| p.len() > 1 && p.starts_with('0')) {
            return Err(malformed(NO_LEADING_ZEROES));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| malformed(NUMERIC_OVERFLOW))?;
        }

        let pre = pre.map(parse_prerelease).transpose().map_err(malformed)?;
        let build = match build {
            Some(build) => parse_build(build).map_err(malformed)?,
            None => Vec::new(),
        };

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
            build,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The dot-joined prerelease identifiers, if any.
    pub fn prerelease(&self) -> Option<String> {
        match &self.pre {
            Some(ids) if !ids.is_empty() => Some(join(ids)),
            _ => None,
        }
    }

    /// The dot-joined build identifiers, if any.
    pub fn build(&self) -> Option<String> {
        if self.build.is_empty() {
            None
        } else {
            Some(self.build.join("."))
        }
    }

    pub fn is_stable(&self) -> bool {
        self.pre.is_none()
    }

    /// A new version with `level` incremented and everything below it reset.
    /// `None` if that component is already `u64::MAX`.
    pub fn next(&self, level: Level) -> Option<Version> {
        let next = match level {
            Level::Major => Version::new(self.major.checked_add(1)?, 0, 0),
            Level::Minor => Version::new(self.major, self.minor.checked_add(1)?, 0),
            Level::Patch => Version::new(self.major, self.minor, self.patch.checked_add(1)?),
        };
        Some(next)
    }

    /// The floor of a stable version; prereleases are returned unchanged.
    pub(crate) fn floor(&self) -> Version {
        if self.is_stable() {
            Version::floor_of(self.major, self.minor, self.patch)
        } else {
            self.clone()
        }
    }

    pub(crate) fn is_floor(&self) -> bool {
        matches!(&self.pre, Some(ids) if ids.is_empty())
    }

    /// True for real prereleases (not stable, not a floor).
    pub(crate) fn has_prerelease(&self) -> bool {
        matches!(&self.pre, Some(ids) if !ids.is_empty())
    }

    /// The immediate successor of a prerelease: `1.0.0-rc` becomes `1.0.0-rc.0`.
    pub(crate) fn prerelease_successor(&self) -> Version {
        let mut ids = self.pre.clone().unwrap_or_default();
        ids.push(Identifier::Numeric(0));
        Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            pre: Some(ids),
            build: Vec::new(),
        }
    }

    /// The inverse of [`Version::prerelease_successor`], if this version is one.
    pub(crate) fn prerelease_predecessor(&self) -> Option<Version> {
        let ids = self.pre.as_ref()?;
        if ids.len() < 2 || ids.last() != Some(&Identifier::Numeric(0)) {
            return None;
        }
        Some(Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            pre: Some(ids[..ids.len() - 1].to_vec()),
            build: self.build.clone(),
        })
    }
}

fn join(ids: &[Identifier]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn is_identifier_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

fn parse_prerelease(text: &str) -> Result<Vec<Identifier>, &'static str> {
    let mut ids = Vec::new();
    for part in text.split('.') {
        if part.is_empty() {
            return Err(PRE_EMPTY);
        }
        if !part.bytes().all(is_identifier_char) {
            return Err(PRE_CHARSET);
        }
        if part.bytes().all(|b| b.is_ascii_digit()) {
            if part.len() > 1 && part.starts_with('0') {
                return Err(PRE_LEADING_ZEROES);
            }
            let n = part.parse().map_err(|_| NUMERIC_OVERFLOW)?;
            ids.push(Identifier::Numeric(n));
        } else {
            ids.push(Identifier::AlphaNumeric(part.to_string()));
        }
    }
    Ok(ids)
}

fn parse_build(text: &str) -> Result<Vec<String>, &'static str> {
    let mut ids = Vec::new();
    for part in text.split('.') {
        if part.is_empty() {
            return Err(BUILD_EMPTY);
        }
        if !part.bytes().all(is_identifier_char) {
            return Err(BUILD_CHARSET);
        }
        ids.push(part.to_string());
    }
    Ok(ids)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = self.prerelease() {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = self.build() {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ModError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre.hash(state);
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
