use serde::{Deserialize, Serialize};
use std::fmt;

/// On-chain account name.
///
/// The empty name is a reserved sentinel meaning "no account": it marks a
/// cleared proxy and an absent inviter.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Create an account name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved "no account" sentinel.
    pub fn none() -> Self {
        Self(String::new())
    }

    /// Check whether this is the reserved sentinel.
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arena index of a delegation account record.
///
/// Proxy chains reference accounts by id, never by pointer, so cycle
/// detection operates purely on ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u32);

impl AccountId {
    /// Index into an arena slice.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
