//! Version range parsing, membership and intersection.
//!
//! Every accepted syntax reduces to a single interval `[lower, upper)` over
//! [`Version`]s, so two ranges always intersect to exactly one range. Stable
//! bounds are stored as floors, which means `1.2.3` also admits `1.2.3-rc`;
//! callers that prefer stable releases filter candidates themselves.
//!
//! Supported forms:
//! - exact and partial versions: `1.2.3`, `1.2.3-pre`, `1.2`, `1.2.x`, `1`, `1.x`, `*`
//! - inequalities: `>1.0.0`, `>=1.0.0`, `<2.0`, `<=1.0.0-rc`
//! - approximate versions: `~1.2`, `~>1.2.3`, `~1.2.3-alpha`
//! - caret versions: `^1.2.3`, `^0.2`
//! - inclusive ranges: `1.0.0 - 1.3.9`
//! - intersections: `>1.0.0 <=2.3.0`

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use modsolve_util::errors::ModError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::version::{Level, Version};

const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "~", "^"];

/// The upper end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Upper {
    Unbounded,
    Exclusive(Version),
    Inclusive(Version),
}

impl Upper {
    pub fn version(&self) -> Option<&Version> {
        match self {
            Upper::Unbounded => None,
            Upper::Exclusive(v) | Upper::Inclusive(v) => Some(v),
        }
    }

    fn admits(&self, version: &Version) -> bool {
        match self {
            Upper::Unbounded => true,
            Upper::Exclusive(end) => version < end,
            Upper::Inclusive(end) => version <= end,
        }
    }

    /// The tighter of two upper bounds; on equal versions the exclusive one.
    fn min(&self, other: &Upper) -> Upper {
        let (a, b) = match (self.version(), other.version()) {
            (None, _) => return other.clone(),
            (_, None) => return self.clone(),
            (Some(a), Some(b)) => (a, b),
        };
        match a.cmp(b) {
            Ordering::Less => self.clone(),
            Ordering::Greater => other.clone(),
            Ordering::Equal => {
                if matches!(self, Upper::Exclusive(_)) {
                    self.clone()
                } else {
                    other.clone()
                }
            }
        }
    }
}

/// A half-open interval of versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    lower: Version,
    upper: Upper,
}

impl VersionRange {
    /// A range that matches no versions.
    pub const EMPTY: VersionRange = VersionRange {
        lower: Version::MIN,
        upper: Upper::Exclusive(Version::MIN),
    };

    /// A range that matches every version.
    pub const ANY: VersionRange = VersionRange {
        lower: Version::MIN,
        upper: Upper::Unbounded,
    };

    fn new(lower: Version, upper: Upper) -> Self {
        if upper.admits(&lower) {
            Self { lower, upper }
        } else {
            Self::EMPTY
        }
    }

    /// Parse a range expression.
    pub fn parse(expr: &str) -> Result<Self, ModError> {
        parse_expression(&normalize(expr)).ok_or_else(|| ModError::MalformedRange {
            input: expr.to_string(),
        })
    }

    pub fn lower(&self) -> &Version {
        &self.lower
    }

    pub fn upper(&self) -> &Upper {
        &self.upper
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Whether `version` falls inside this range.
    pub fn includes(&self, version: &Version) -> bool {
        self.lower <= *version && self.upper.admits(version)
    }

    /// The common subset of two ranges, [`VersionRange::EMPTY`] if disjoint.
    pub fn intersection(&self, other: &VersionRange) -> VersionRange {
        let lower = self.lower.clone().max(other.lower.clone());
        VersionRange::new(lower, self.upper.min(&other.upper))
    }
}

/// Drop whitespace that follows an operator so `> = 1.0` reads as `>=1.0`.
fn normalize(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    for ch in expr.chars() {
        let after_operator = out.ends_with(['>', '<', '=', '~', '^']);
        if ch.is_whitespace() && after_operator {
            continue;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

fn parse_expression(expr: &str) -> Option<VersionRange> {
    let tokens: Vec<&str> = expr.split_whitespace().collect();
    let mut parts = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "-" {
            return None;
        }
        if tokens.get(i + 1) == Some(&"-") {
            let finish = tokens.get(i + 2)?;
            parts.push(parse_hyphen(tokens[i], finish)?);
            i += 3;
        } else {
            parts.push(parse_simple(tokens[i])?);
            i += 1;
        }
    }
    parts.into_iter().reduce(|a, b| a.intersection(&b))
}

fn parse_simple(token: &str) -> Option<VersionRange> {
    let op = OPERATORS
        .iter()
        .find(|op| token.starts_with(**op))
        .copied()
        .unwrap_or("");
    let operand = &token[op.len()..];

    if matches!(op, "" | "=") && matches!(operand, "*" | "x" | "X") {
        return Some(VersionRange::ANY);
    }

    let (first, next) = loose(operand)?;
    let pre = first.has_prerelease();
    let range = match op {
        "" | "=" => VersionRange::new(first.floor(), upper_of(next)),
        ">" if pre => VersionRange::new(first.prerelease_successor(), Upper::Unbounded),
        ">" => VersionRange::new(next.floor(), Upper::Unbounded),
        ">=" => VersionRange::new(first.floor(), Upper::Unbounded),
        "<" => VersionRange::new(Version::MIN, Upper::Exclusive(first.floor())),
        "<=" if pre => VersionRange::new(Version::MIN, Upper::Inclusive(first)),
        "<=" => VersionRange::new(Version::MIN, Upper::Exclusive(next.floor())),
        "~" | "~>" => tilde(first, next)?,
        "^" if first.major() > 0 => {
            let end = first.next(Level::Major)?.floor();
            VersionRange::new(first.floor(), Upper::Exclusive(end))
        }
        "^" => tilde(first, next)?,
        _ => return None,
    };
    Some(range)
}

fn tilde(first: Version, next: Version) -> Option<VersionRange> {
    let range = if first.has_prerelease() {
        let end = first.next(Level::Patch)?.floor();
        VersionRange::new(first, Upper::Exclusive(end))
    } else {
        VersionRange::new(first.floor(), Upper::Exclusive(next.floor()))
    };
    Some(range)
}

fn parse_hyphen(start: &str, finish: &str) -> Option<VersionRange> {
    let (first, _) = loose(start)?;
    let (_, next) = loose(finish)?;
    Some(VersionRange::new(first.floor(), upper_of(next)))
}

/// Stable ends are exclusive floors; a prerelease end is kept inclusive.
fn upper_of(next: Version) -> Upper {
    if next.is_stable() {
        Upper::Exclusive(next.floor())
    } else {
        Upper::Inclusive(next)
    }
}

/// Expand a full or partial version into its first version and the first
/// version past it at the given precision. A prerelease is its own successor.
/// `None` when the successor does not fit in 64 bits.
fn loose(expr: &str) -> Option<(Version, Version)> {
    if let Ok(version) = Version::parse(expr) {
        let next = if version.is_stable() {
            version.next(Level::Patch)?
        } else {
            version.clone()
        };
        return Some((version, next));
    }

    let parts: Vec<&str> = expr.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    let wildcard = |p: &&str| matches!(*p, "x" | "X" | "*");
    let explicit = parts.iter().take_while(|p| !wildcard(p)).count();
    if parts[explicit..].iter().any(|p| !wildcard(p)) {
        return None;
    }
    let numbers = parts[..explicit]
        .iter()
        .map(|p| number(p))
        .collect::<Option<Vec<u64>>>()?;

    match numbers.as_slice() {
        [major] => {
            let first = Version::new(*major, 0, 0);
            let next = first.next(Level::Major)?;
            Some((first, next))
        }
        [major, minor] => {
            let first = Version::new(*major, *minor, 0);
            let next = first.next(Level::Minor)?;
            Some((first, next))
        }
        _ => None,
    }
}

fn number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<0.0.0");
        }
        let lower = &self.lower;
        match &self.upper {
            Upper::Inclusive(end) if end == lower => return write!(f, "{lower}"),
            Upper::Exclusive(end) if lower.is_floor() && end.is_floor() => {
                if let Some(short) = short_form(lower, end) {
                    return f.write_str(&short);
                }
            }
            _ => {}
        }

        match &self.upper {
            Upper::Unbounded => match lower.prerelease_predecessor() {
                Some(pred) => write!(f, ">{pred}"),
                None => write!(f, ">={lower}"),
            },
            Upper::Exclusive(end) if *lower == Version::MIN => write!(f, "<{end}"),
            Upper::Inclusive(end) if *lower == Version::MIN => write!(f, "<={end}"),
            Upper::Exclusive(end) => write!(f, ">={lower} <{end}"),
            Upper::Inclusive(end) => write!(f, ">={lower} <={end}"),
        }
    }
}

/// `1.2.3`, `1.2.x` or `1.x` when the floors span exactly one patch, minor or major.
fn short_form(lower: &Version, end: &Version) -> Option<String> {
    let (ma, mi, pa) = (lower.major(), lower.minor(), lower.patch());
    let (mb, nb, pb) = (end.major(), end.minor(), end.patch());
    if ma == mb && mi == nb && pb == pa + 1 {
        Some(format!("{ma}.{mi}.{pa}"))
    } else if ma == mb && nb == mi + 1 && pa == 0 && pb == 0 {
        Some(format!("{ma}.{mi}.x"))
    } else if mb == ma + 1 && mi == 0 && pa == 0 && nb == 0 && pb == 0 {
        Some(format!("{ma}.x"))
    } else {
        None
    }
}

impl FromStr for VersionRange {
    type Err = ModError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VersionRange::parse(&s).map_err(serde::de::Error::custom)
    }
}
