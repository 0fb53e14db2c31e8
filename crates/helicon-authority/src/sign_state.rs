//! Recursive weighted-threshold evaluation against a recovered key set.

use helicon_types::{AccountName, Authority, PublicKey, MAX_AUTHORITY_RECURSION};
use std::collections::{BTreeMap, BTreeSet};

/// Lookup of an account's stored authority.
pub type AuthorityGetter<'a> = &'a dyn Fn(&AccountName) -> Authority;

/// Tracks which provided signatures have been consumed while proving the
/// authority obligations of a transaction.
///
/// Each key and each sub-account may be counted at most once, no matter how
/// many authority paths reach it. Recursion through sub-account authorities
/// is bounded by [`MAX_AUTHORITY_RECURSION`].
pub struct SignState<'a> {
    /// Recovered signature keys, flagged once they prove something.
    provided_signatures: BTreeMap<PublicKey, bool>,
    /// Wallet keys that may be drafted in addition to provided signatures
    /// (used by the required-signature queries, empty during verification).
    available_keys: &'a BTreeSet<PublicKey>,
    /// Accounts proven (or pre-approved out of band).
    pub approved_by: BTreeSet<AccountName>,
    get_active: AuthorityGetter<'a>,
    get_owner: AuthorityGetter<'a>,
    max_recursion: u32,
}

impl<'a> SignState<'a> {
    pub fn new(
        signature_keys: &BTreeSet<PublicKey>,
        get_active: AuthorityGetter<'a>,
        get_owner: AuthorityGetter<'a>,
        available_keys: &'a BTreeSet<PublicKey>,
    ) -> Self {
        Self {
            provided_signatures: signature_keys.iter().map(|k| (*k, false)).collect(),
            available_keys,
            approved_by: BTreeSet::new(),
            get_active,
            get_owner,
            max_recursion: MAX_AUTHORITY_RECURSION,
        }
    }

    /// Consume a key if it was provided or is available, marking it used.
    fn signed_by(&mut self, key: &PublicKey) -> bool {
        match self.provided_signatures.get_mut(key) {
            Some(used) => {
                *used = true;
                true
            }
            None => {
                if self.available_keys.contains(key) {
                    self.provided_signatures.insert(*key, true);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Check an account requirement: pre-approved, or its active or owner
    /// authority is satisfied.
    pub fn check_account_authority(&mut self, account: &AccountName) -> bool {
        if self.approved_by.contains(account) {
            return true;
        }
        let active = (self.get_active)(account);
        let owner = (self.get_owner)(account);
        self.check_authority(&active) || self.check_authority(&owner)
    }

    /// Check a fully-specified authority object.
    pub fn check_authority(&mut self, authority: &Authority) -> bool {
        self.check_authority_at(authority, 0)
    }

    fn check_authority_at(&mut self, authority: &Authority, depth: u32) -> bool {
        let threshold = u64::from(authority.weight_threshold);
        let mut total_weight: u64 = 0;

        for (key, weight) in &authority.key_auths {
            if self.signed_by(key) {
                total_weight += u64::from(*weight);
                if total_weight >= threshold {
                    return true;
                }
            }
        }

        for (account, weight) in &authority.account_auths {
            if self.approved_by.contains(account) {
                total_weight += u64::from(*weight);
            } else {
                if depth == self.max_recursion {
                    continue;
                }
                let active = (self.get_active)(account);
                let owner = (self.get_owner)(account);
                if self.check_authority_at(&active, depth + 1)
                    || self.check_authority_at(&owner, depth + 1)
                {
                    self.approved_by.insert(account.clone());
                    total_weight += u64::from(*weight);
                }
            }
            if total_weight >= threshold {
                return true;
            }
        }

        total_weight >= threshold
    }

    /// Provided signatures that proved nothing.
    pub fn unused_signatures(&self) -> Vec<PublicKey> {
        self.provided_signatures
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Keys that were consumed and belong to the given wallet set.
    pub fn used_keys_from(&self, wallet: &BTreeSet<PublicKey>) -> BTreeSet<PublicKey> {
        self.provided_signatures
            .iter()
            .filter(|(key, used)| **used && wallet.contains(key))
            .map(|(key, _)| *key)
            .collect()
    }
}
