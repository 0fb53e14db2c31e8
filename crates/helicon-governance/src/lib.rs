//! Helicon Governance - delegated voting, membership shares and proposals.
//!
//! Three pieces that together govern a research group:
//! - [`DelegationArena`]: delegated-vote propagation through bounded proxy
//!   chains, with terminal tallies reported to a [`VoteSink`]
//! - [`ShareLedger`]: basis-point membership shares that always sum to
//!   exactly 10000 per group
//! - [`GovernanceEngine`]: share-weighted proposals that execute a typed
//!   action the moment they reach their group's quorum
//!
//! Everything is deterministic: ordered collections, caller-supplied time,
//! integer arithmetic only.

pub mod action;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod services;
pub mod shares;

pub use action::ProposalAction;
pub use delegation::{DelegationAccount, DelegationArena, VoteSink};
pub use engine::{GovernanceEngine, VoteOutcome};
pub use error::{DelegationError, GovernanceError, ShareError};
pub use proposal::{Proposal, ProposalActionTag, ProposalRegistry, ProposalVote};
pub use services::DomainServices;
pub use shares::{ResearchGroup, ShareLedger};
