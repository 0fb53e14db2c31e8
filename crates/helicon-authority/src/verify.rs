//! Transaction-level authority verification.
//!
//! Collects the authority obligations of every operation, resolves the
//! special cases (same-transaction new accounts, per-tag overrides,
//! out-of-band approvals), then proves each obligation against the
//! recovered signature set. Any leftover signature is an error: replay
//! padding must not survive verification.

use crate::error::AuthorityError;
use crate::recovery::{recover_signature_keys, KeyRecovery, TenantSignature};
use crate::sign_state::{AuthorityGetter, SignState};
use helicon_types::{AccountName, Authority, AuthorityPack, Digest, OperationTag, PublicKey, Signature};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Lookup of a per-operation-tag override authority.
pub type OverrideGetter<'a> = &'a dyn Fn(&AccountName, OperationTag) -> Option<Authority>;

/// Authority obligations collected from one or more operations.
#[derive(Debug, Default)]
pub struct RequiredAuthorities {
    /// Accounts whose active authority must be proven.
    pub active: BTreeSet<AccountName>,
    /// Accounts whose owner authority must be proven.
    pub owner: BTreeSet<AccountName>,
    /// Fully-specified authorities embedded in the operation itself
    /// (e.g. for accounts that do not exist yet).
    pub other: Vec<Authority>,
}

impl RequiredAuthorities {
    pub fn require_active(&mut self, account: AccountName) {
        self.active.insert(account);
    }

    pub fn require_owner(&mut self, account: AccountName) {
        self.owner.insert(account);
    }

    pub fn require_other(&mut self, authority: Authority) {
        self.other.push(authority);
    }
}

/// An operation's authority surface.
pub trait SignedOperation {
    /// Operation-kind discriminant, keys authority overrides.
    fn tag(&self) -> OperationTag;

    /// Declare which authorities this operation needs.
    fn required_authorities(&self, required: &mut RequiredAuthorities);

    /// Accounts this operation creates, with their declared authorities.
    /// Later operations in the same transaction resolve these accounts
    /// from here instead of from storage.
    fn created_accounts(&self) -> Vec<(AccountName, AuthorityPack)> {
        Vec::new()
    }
}

/// A transaction as seen by the verifier.
pub struct SignedTransaction<'a> {
    pub operations: Vec<&'a dyn SignedOperation>,
    pub signatures: Vec<Signature>,
    pub tenant_signature: Option<TenantSignature>,
}

/// Verify that `sigs` satisfies every authority obligation of `ops`.
///
/// `available_active_approvals` / `available_owner_approvals` are accounts
/// pre-approved out of band (e.g. by a multisig-proposal flow); they count
/// as proven without a signature.
pub fn verify_authority(
    ops: &[&dyn SignedOperation],
    sigs: &BTreeSet<PublicKey>,
    get_active: AuthorityGetter<'_>,
    get_owner: AuthorityGetter<'_>,
    get_active_overrides: OverrideGetter<'_>,
    available_active_approvals: &BTreeSet<AccountName>,
    available_owner_approvals: &BTreeSet<AccountName>,
) -> Result<(), AuthorityError> {
    let mut required_active: BTreeSet<AccountName> = BTreeSet::new();
    let mut required_owner: BTreeSet<AccountName> = BTreeSet::new();
    let mut other: Vec<Authority> = Vec::new();
    let mut active_overrides: Vec<(AccountName, Authority)> = Vec::new();
    let mut required_new_active: Vec<(AccountName, Authority)> = Vec::new();
    let mut required_new_owner: Vec<(AccountName, Authority)> = Vec::new();

    // Accounts created earlier in this very transaction: their authority
    // comes from the creation payload, not from storage.
    let mut new_accounts: BTreeMap<AccountName, AuthorityPack> = BTreeMap::new();
    for op in ops {
        for (name, pack) in op.created_accounts() {
            new_accounts.insert(name, pack);
        }
    }

    for op in ops {
        let tag = op.tag();
        let mut op_required = RequiredAuthorities::default();
        op.required_authorities(&mut op_required);
        other.append(&mut op_required.other);

        for account in op_required.active {
            if let Some(pack) = new_accounts.get(&account) {
                let authority = pack
                    .override_for(tag)
                    .unwrap_or(&pack.active)
                    .clone();
                required_new_active.push((account, authority));
            } else if let Some(authority) = get_active_overrides(&account, tag) {
                active_overrides.push((account, authority));
            } else {
                required_active.insert(account);
            }
        }

        for account in op_required.owner {
            if let Some(pack) = new_accounts.get(&account) {
                required_new_owner.push((account, pack.owner.clone()));
            } else {
                required_owner.insert(account);
            }
        }
    }

    let no_available_keys = BTreeSet::new();
    let mut state = SignState::new(sigs, get_active, get_owner, &no_available_keys);
    for account in available_active_approvals {
        state.approved_by.insert(account.clone());
    }
    for account in available_owner_approvals {
        state.approved_by.insert(account.clone());
    }

    for authority in &other {
        if !state.check_authority(authority) {
            return Err(AuthorityError::MissingOtherAuthority);
        }
    }

    for (account, authority) in &active_overrides {
        // The owner authority always remains a safety valve above an
        // override.
        let owner_auth = get_owner(account);
        if !(available_owner_approvals.contains(account)
            || state.check_authority(authority)
            || state.check_authority(&owner_auth))
        {
            return Err(AuthorityError::MissingOverriddenAuthority(account.clone()));
        }
    }

    for (account, authority) in &required_new_active {
        let owner_auth = &new_accounts[account].owner;
        if !(state.check_authority(authority) || state.check_authority(owner_auth)) {
            return Err(AuthorityError::MissingNewAccountAuthority(account.clone()));
        }
    }

    for (account, authority) in &required_new_owner {
        if !state.check_authority(authority) {
            return Err(AuthorityError::MissingNewAccountAuthority(account.clone()));
        }
    }

    for account in &required_active {
        let owner_auth = get_owner(account);
        if !(state.check_account_authority(account) || state.check_authority(&owner_auth)) {
            return Err(AuthorityError::MissingActiveAuthority(account.clone()));
        }
    }

    for account in &required_owner {
        let owner_auth = get_owner(account);
        if !(available_owner_approvals.contains(account) || state.check_authority(&owner_auth)) {
            return Err(AuthorityError::MissingOwnerAuthority(account.clone()));
        }
    }

    if !state.unused_signatures().is_empty() {
        return Err(AuthorityError::IrrelevantSignature);
    }

    debug!(
        operations = ops.len(),
        signatures = sigs.len(),
        "authority obligations satisfied"
    );
    Ok(())
}

/// Verify the dedicated tenant signature of a transaction.
///
/// Required whenever the transaction declares a tenant: the recovered key
/// must appear in the tenant's authority.
pub fn verify_tenant_authority(
    digest: &Digest,
    tenant_signature: Option<&TenantSignature>,
    recovery: &dyn KeyRecovery,
    get_tenant: AuthorityGetter<'_>,
) -> Result<(), AuthorityError> {
    let tenant_signature = tenant_signature
        .ok_or_else(|| AuthorityError::MissingTenantAuthority(AccountName::none()))?;
    let key = recovery.recover(&tenant_signature.signature, digest);
    let authority = get_tenant(&tenant_signature.tenant);
    if !authority.key_auths.contains_key(&key) {
        return Err(AuthorityError::MissingTenantAuthority(
            tenant_signature.tenant.clone(),
        ));
    }
    Ok(())
}

/// Authorize a full transaction: recover its signer set, prove every
/// operation obligation, and check the tenant signature when one is
/// declared.
pub fn authorize(
    tx: &SignedTransaction<'_>,
    digest: &Digest,
    recovery: &dyn KeyRecovery,
    get_active: AuthorityGetter<'_>,
    get_owner: AuthorityGetter<'_>,
    get_active_overrides: OverrideGetter<'_>,
    get_tenant: AuthorityGetter<'_>,
) -> Result<(), AuthorityError> {
    let keys = recover_signature_keys(digest, &tx.signatures, recovery)?;
    let none = BTreeSet::new();
    verify_authority(
        &tx.operations,
        &keys,
        get_active,
        get_owner,
        get_active_overrides,
        &none,
        &none,
    )?;
    if tx.tenant_signature.is_some() {
        verify_tenant_authority(digest, tx.tenant_signature.as_ref(), recovery, get_tenant)?;
    }
    debug!(digest = %digest, "transaction authorized");
    Ok(())
}

/// Which of `available_keys` would be needed, on top of `provided`, to
/// satisfy the transaction. Wallet-facing query; never errors.
pub fn required_signatures(
    ops: &[&dyn SignedOperation],
    provided: &BTreeSet<PublicKey>,
    available_keys: &BTreeSet<PublicKey>,
    get_active: AuthorityGetter<'_>,
    get_owner: AuthorityGetter<'_>,
) -> BTreeSet<PublicKey> {
    let mut required = RequiredAuthorities::default();
    for op in ops {
        op.required_authorities(&mut required);
    }

    let mut state = SignState::new(provided, get_active, get_owner, available_keys);
    for authority in &required.other {
        state.check_authority(authority);
    }
    for account in &required.owner {
        let owner_auth = get_owner(account);
        state.check_authority(&owner_auth);
    }
    for account in &required.active {
        state.check_account_authority(account);
    }

    state.used_keys_from(available_keys)
}

/// Shrink a working signature set to a minimal one that still verifies.
///
/// Removal order is ascending key order, so every node computes the same
/// minimal set. O(|keys|) full verifications.
pub fn minimize_required_signatures(
    ops: &[&dyn SignedOperation],
    candidate_keys: &BTreeSet<PublicKey>,
    get_active: AuthorityGetter<'_>,
    get_owner: AuthorityGetter<'_>,
    get_active_overrides: OverrideGetter<'_>,
) -> BTreeSet<PublicKey> {
    let none = BTreeSet::new();
    let mut result = candidate_keys.clone();

    for key in candidate_keys {
        result.remove(key);
        let outcome = verify_authority(
            ops,
            &result,
            get_active,
            get_owner,
            get_active_overrides,
            &none,
            &none,
        );
        match outcome {
            Ok(()) => {}
            // Removing this key is what broke an obligation: restore it.
            Err(err) if err.is_missing_authority() => {
                result.insert(*key);
            }
            // Hygiene errors are not caused by this removal.
            Err(_) => {}
        }
    }

    result
}
