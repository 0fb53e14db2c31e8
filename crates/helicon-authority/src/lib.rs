//! Helicon Authority - weighted-threshold transaction authorization.
//!
//! This crate proves that a set of recovered signature keys satisfies every
//! authority obligation of a transaction:
//! - Recursive weighted-threshold evaluation over keys and sub-accounts
//! - Per-operation-tag override authorities
//! - Accounts created earlier in the same transaction
//! - Out-of-band approval sets and tenant signatures
//!
//! Key recovery itself is a black-box collaborator ([`KeyRecovery`]).

pub mod error;
pub mod recovery;
pub mod sign_state;
pub mod verify;

pub use error::AuthorityError;
pub use recovery::{recover_signature_keys, KeyRecovery, TenantSignature};
pub use sign_state::{AuthorityGetter, SignState};
pub use verify::{
    authorize, minimize_required_signatures, required_signatures, verify_authority,
    verify_tenant_authority, OverrideGetter, RequiredAuthorities, SignedOperation,
    SignedTransaction,
};
