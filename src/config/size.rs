use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// A size in bytes.
///
/// Parses the suffixes used by full-system simulator configs
/// (`32kB`, `256kB`, `1MB`, `8GB`), where multiples are binary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Repr", into = "String")]
pub struct Size(pub u64);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid size {0:?}: expected a byte count with an optional B, kB, MB or GB suffix")]
pub struct ParseSizeError(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Bytes(u64),
    Human(String),
}

impl TryFrom<Repr> for Size {
    type Error = ParseSizeError;

    fn try_from(repr: Repr) -> Result<Self, Self::Error> {
        match repr {
            Repr::Bytes(bytes) => Ok(Self(bytes)),
            Repr::Human(size) => size.parse(),
        }
    }
}

static SIZE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<value>\d+)\s*(?P<unit>[kKmMgG]i?[bB]|[bB])?\s*$").unwrap()
});

impl std::str::FromStr for Size {
    type Err = ParseSizeError;

    fn from_str(size: &str) -> Result<Self, Self::Err> {
        let err = || ParseSizeError(size.to_string());
        let captures = SIZE_REGEX.captures(size).ok_or_else(err)?;
        let value: u64 = captures["value"].parse().map_err(|_| err())?;
        let multiplier = match captures
            .name("unit")
            .map(|unit| unit.as_str().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("b") => 1,
            Some("kb" | "kib") => KIB,
            Some("mb" | "mib") => MIB,
            Some("gb" | "gib") => GIB,
            Some(_) => return Err(err()),
        };
        value.checked_mul(multiplier).map(Self).ok_or_else(err)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "0B"),
            bytes if bytes % GIB == 0 => write!(f, "{}GB", bytes / GIB),
            bytes if bytes % MIB == 0 => write!(f, "{}MB", bytes / MIB),
            bytes if bytes % KIB == 0 => write!(f, "{}kB", bytes / KIB),
            bytes => write!(f, "{bytes}B"),
        }
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}

impl From<u64> for Size {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl Size {
    #[must_use]
    pub fn bytes(self) -> u64 {
        self.0
    }
}
