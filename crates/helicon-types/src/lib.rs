//! Helicon Types - Core type definitions for the HELICON governance core.
//!
//! This crate provides the fundamental types used throughout the core:
//! - Account names and arena ids
//! - Opaque crypto carriers (public keys, signatures, digests)
//! - Weighted-threshold authorities
//! - Basis-point share arithmetic and protocol constants

pub mod account;
pub mod authority;
pub mod constants;
pub mod crypto;
pub mod ids;

pub use account::{AccountId, AccountName};
pub use authority::{Authority, AuthorityDefinitionError, AuthorityPack, OperationTag};
pub use constants::{
    Share, MAX_AUTHORITY_RECURSION, MAX_PROXY_DEPTH, ONE_HUNDRED_PERCENT, ONE_PERCENT,
    PROPOSAL_LIFETIME_SECS, REVIEW_SHARE_COOLDOWN_SECS,
};
pub use crypto::{Digest, PublicKey, Signature};
pub use ids::{GroupId, ProposalId, ResearchId};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AccountId, AccountName, Authority, AuthorityPack, Digest, GroupId, OperationTag,
        ProposalId, PublicKey, ResearchId, Share, Signature, MAX_PROXY_DEPTH,
        ONE_HUNDRED_PERCENT, ONE_PERCENT,
    };
}
