//! Weighted-threshold authorities.
//!
//! An authority is satisfied when the summed weights of proven keys and
//! sub-accounts reach `weight_threshold`. A threshold no combination of
//! entries can reach makes the authority impossible, which is used to
//! permanently disable an action.

use crate::account::AccountName;
use crate::crypto::PublicKey;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Discriminant of an operation kind within a transaction.
///
/// Keys per-operation authority overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationTag(pub u16);

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

/// Malformed authority definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityDefinitionError {
    #[error("authority threshold must be greater than zero")]
    ZeroThreshold,

    #[error("authority entry for {0} has zero weight")]
    ZeroWeightEntry(String),
}

/// Weighted-threshold authority over keys and sub-accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Authority {
    /// Summed weight of proven entries must reach this.
    pub weight_threshold: u32,
    /// Directly signing keys and their weights.
    pub key_auths: BTreeMap<PublicKey, u16>,
    /// Sub-accounts whose own authority counts, and their weights.
    pub account_auths: BTreeMap<AccountName, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn single_key(key: PublicKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Self {
            weight_threshold: 1,
            key_auths,
            account_auths: BTreeMap::new(),
        }
    }

    /// Build from weighted key entries.
    pub fn from_keys(threshold: u32, keys: impl IntoIterator<Item = (PublicKey, u16)>) -> Self {
        Self {
            weight_threshold: threshold,
            key_auths: keys.into_iter().collect(),
            account_auths: BTreeMap::new(),
        }
    }

    /// Add a weighted sub-account entry.
    pub fn with_account(mut self, account: AccountName, weight: u16) -> Self {
        self.account_auths.insert(account, weight);
        self
    }

    /// Maximum weight the entries can ever prove.
    pub fn max_provable_weight(&self) -> u64 {
        let keys: u64 = self.key_auths.values().map(|w| u64::from(*w)).sum();
        let accounts: u64 = self.account_auths.values().map(|w| u64::from(*w)).sum();
        keys + accounts
    }

    /// An authority no signature set can ever satisfy.
    ///
    /// Used to permanently disable an action (e.g. burning an account's
    /// owner role).
    pub fn impossible() -> Self {
        Self {
            weight_threshold: 1,
            key_auths: BTreeMap::new(),
            account_auths: BTreeMap::new(),
        }
    }

    /// True when no combination of entries reaches the threshold.
    pub fn is_impossible(&self) -> bool {
        self.max_provable_weight() < u64::from(self.weight_threshold)
    }

    /// Validate the definition. A zero threshold would authorize everyone;
    /// zero-weight entries are dead weight that can never contribute.
    pub fn validate(&self) -> Result<(), AuthorityDefinitionError> {
        if self.weight_threshold == 0 {
            return Err(AuthorityDefinitionError::ZeroThreshold);
        }
        for (key, weight) in &self.key_auths {
            if *weight == 0 {
                return Err(AuthorityDefinitionError::ZeroWeightEntry(key.to_string()));
            }
        }
        for (account, weight) in &self.account_auths {
            if *weight == 0 {
                return Err(AuthorityDefinitionError::ZeroWeightEntry(
                    account.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The three authority roles of an account plus per-operation overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorityPack {
    /// Full control, including changing the other authorities.
    pub owner: Authority,
    /// Everyday operations (transfers, votes, proposals).
    pub active: Authority,
    /// Low-risk content operations.
    pub posting: Authority,
    /// Per-operation-tag replacements for the active authority. Applicable
    /// only to transactions carrying that tag, and only as an alternative
    /// to (never a restriction of) owner authority.
    pub active_overrides: BTreeMap<OperationTag, Authority>,
}

impl AuthorityPack {
    /// Pack where all three roles share one single-key authority.
    pub fn single_key(key: PublicKey) -> Self {
        Self {
            owner: Authority::single_key(key),
            active: Authority::single_key(key),
            posting: Authority::single_key(key),
            active_overrides: BTreeMap::new(),
        }
    }

    /// Register an override authority for an operation tag.
    pub fn with_override(mut self, tag: OperationTag, authority: Authority) -> Self {
        self.active_overrides.insert(tag, authority);
        self
    }

    /// Override authority for a tag, if registered.
    pub fn override_for(&self, tag: OperationTag) -> Option<&Authority> {
        self.active_overrides.get(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> PublicKey {
        PublicKey::from_bytes([n; 33])
    }

    #[test]
    fn test_single_key_authority() {
        let auth = Authority::single_key(key(1));
        assert_eq!(auth.weight_threshold, 1);
        assert!(!auth.is_impossible());
        assert!(auth.validate().is_ok());
    }

    #[test]
    fn test_impossible_authority() {
        let auth = Authority::impossible();
        assert!(auth.is_impossible());
        assert!(auth.validate().is_ok());

        let reachable = Authority::from_keys(2, [(key(1), 1), (key(2), 1)]);
        assert!(!reachable.is_impossible());

        let unreachable = Authority::from_keys(3, [(key(1), 1), (key(2), 1)]);
        assert!(unreachable.is_impossible());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let auth = Authority::from_keys(0, [(key(1), 1)]);
        assert_eq!(
            auth.validate(),
            Err(AuthorityDefinitionError::ZeroThreshold)
        );
    }

    #[test]
    fn test_zero_weight_entry_rejected() {
        let auth = Authority::from_keys(1, [(key(1), 0)]);
        assert!(matches!(
            auth.validate(),
            Err(AuthorityDefinitionError::ZeroWeightEntry(_))
        ));
    }

    #[test]
    fn test_override_lookup() {
        let tag = OperationTag(7);
        let pack = AuthorityPack::single_key(key(1))
            .with_override(tag, Authority::single_key(key(2)));

        assert!(pack.override_for(tag).is_some());
        assert!(pack.override_for(OperationTag(8)).is_none());
    }
}
