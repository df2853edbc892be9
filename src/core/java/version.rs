use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured Java version parsed from a `-version` invocation.
///
/// `raw` keeps the exact string the runtime reported, for display; the
/// numeric fields drive comparisons. Legacy `1.x` strings are normalized so
/// that `1.8.0_281` has `major == 8` (the `1.` prefix is an epoch marker
/// from the pre-JEP-223 format, not the major version).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JavaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub raw: String,
}

impl JavaVersion {
    /// Parse a version string as printed by `java -version`, in either the
    /// legacy (`1.8.0_281`) or the modern (`17.0.8`, `17.0.8+7`) format.
    /// Returns `None` when the string does not start with a number.
    pub fn parse(raw: &str) -> Option<Self> {
        let core = raw
            .split(|c| c == '+' || c == '-' || c == ' ')
            .next()
            .unwrap_or(raw);

        // The legacy update suffix `_NNN` maps to the patch slot.
        let (dotted, update) = match core.split_once('_') {
            Some((dotted, update)) => (dotted, update.parse::<u32>().ok()),
            None => (core, None),
        };

        let mut nums = dotted.split('.').map(|part| part.parse::<u32>().ok());
        let first = nums.next()??;
        let second = nums.next().flatten();
        let third = nums.next().flatten();

        let (major, minor, patch) = if first == 1 {
            // Legacy format: 1.<major>.<patch>_<update>
            let major = second.unwrap_or(first);
            (major, third.unwrap_or(0), update.unwrap_or(0))
        } else {
            (
                first,
                second.unwrap_or(0),
                third.or(update).unwrap_or(0),
            )
        };

        Some(JavaVersion {
            major,
            minor,
            patch,
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for JavaVersion {
    fn eq(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }
}

impl Eq for JavaVersion {}

impl PartialOrd for JavaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JavaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}
