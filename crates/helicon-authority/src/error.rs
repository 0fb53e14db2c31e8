use helicon_types::AccountName;
use thiserror::Error;

/// Errors raised while authorizing a transaction.
///
/// Every variant is fatal for the containing transaction; rollback is the
/// responsibility of the external storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("missing active authority for account {0}")]
    MissingActiveAuthority(AccountName),

    #[error("missing owner authority for account {0}")]
    MissingOwnerAuthority(AccountName),

    #[error("missing authority embedded in operation")]
    MissingOtherAuthority,

    #[error("missing overridden authority for account {0}")]
    MissingOverriddenAuthority(AccountName),

    #[error("missing authority for account {0} created in this transaction")]
    MissingNewAccountAuthority(AccountName),

    #[error("missing tenant authority for {0}")]
    MissingTenantAuthority(AccountName),

    #[error("duplicate signature detected")]
    DuplicateSignature,

    #[error("unnecessary signature(s) detected")]
    IrrelevantSignature,
}

impl AuthorityError {
    /// True for the "an obligation went unproven" family, as opposed to
    /// signature-set hygiene failures.
    pub fn is_missing_authority(&self) -> bool {
        !matches!(
            self,
            AuthorityError::DuplicateSignature | AuthorityError::IrrelevantSignature
        )
    }
}
