//! Raw flag mappings and accessors for the reserved flags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flag enabling title comparison.
pub const TITLE: &str = "title";
/// Flag making title comparison case sensitive.
pub const CASE_SENSITIVE: &str = "case_sensitive";
/// Flag exempting unpublished records and restricting matches to published ones.
pub const LIMIT_TO_PUBLISHED: &str = "limit_validation_to_published";

/// Identifiers that are never treated as field identifiers.
pub const RESERVED: [&str; 3] = [TITLE, CASE_SENSITIVE, LIMIT_TO_PUBLISHED];

/// A stored flag value. Checkbox settings are stored either as booleans or
/// as the integers 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
}

impl FlagValue {
    /// Truthiness, used for the reserved flags.
    pub fn is_set(self) -> bool {
        match self {
            FlagValue::Bool(b) => b,
            FlagValue::Int(i) => i != 0,
        }
    }

    /// Whether a field flag selects its field. Only `true` or exactly `1` count.
    pub fn selects_field(self) -> bool {
        match self {
            FlagValue::Bool(b) => b,
            FlagValue::Int(i) => i == 1,
        }
    }

    /// True for integers other than 0 and 1.
    pub fn is_unusual(self) -> bool {
        matches!(self, FlagValue::Int(i) if i != 0 && i != 1)
    }
}

/// Field identifier -> flag, in configuration order.
pub type RawFlags = IndexMap<String, FlagValue>;

pub fn is_reserved(identifier: &str) -> bool {
    RESERVED.contains(&identifier)
}

fn flag(flags: &RawFlags, name: &str) -> bool {
    flags.get(name).is_some_and(|value| value.is_set())
}

/// Returns the title flag, false when absent.
pub fn is_title_enabled(flags: &RawFlags) -> bool {
    flag(flags, TITLE)
}

/// Returns the case sensitivity flag, but only when title comparison is
/// enabled. Without title comparison this is always false.
pub fn is_title_case_sensitive(flags: &RawFlags) -> bool {
    is_title_enabled(flags) && flag(flags, CASE_SENSITIVE)
}

/// Returns the published restriction flag, false when absent.
pub fn is_restricted_to_published(flags: &RawFlags) -> bool {
    flag(flags, LIMIT_TO_PUBLISHED)
}

/// Field identifiers selected for the comparison key, reserved flags excluded.
pub fn selected_fields(flags: &RawFlags) -> impl Iterator<Item = &str> {
    flags
        .iter()
        .filter(|(name, value)| !is_reserved(name) && value.selects_field())
        .map(|(name, _)| name.as_str())
}
