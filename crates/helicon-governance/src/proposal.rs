//! Proposal records and vote bookkeeping.

use crate::error::GovernanceError;
use helicon_types::{AccountName, GroupId, ProposalId, Share, PROPOSAL_LIFETIME_SECS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Discriminant of a governance action, as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalActionTag {
    InviteMember = 1,
    DropoutMember = 2,
    ChangeQuorum = 3,
    ChangeReviewSharePercent = 4,
    StartResearch = 5,
    SendFunds = 6,
    RebalanceGroupShares = 7,
    CreateResearchMaterial = 8,
    StartTokenSale = 9,
    TransferResearchShare = 10,
    OfferResearchShares = 11,
}

impl ProposalActionTag {
    /// Decode a raw discriminant. Unknown values are a forward-compat
    /// condition, not a logic bug, and get their own error.
    pub fn from_u16(raw: u16) -> Result<Self, GovernanceError> {
        match raw {
            1 => Ok(Self::InviteMember),
            2 => Ok(Self::DropoutMember),
            3 => Ok(Self::ChangeQuorum),
            4 => Ok(Self::ChangeReviewSharePercent),
            5 => Ok(Self::StartResearch),
            6 => Ok(Self::SendFunds),
            7 => Ok(Self::RebalanceGroupShares),
            8 => Ok(Self::CreateResearchMaterial),
            9 => Ok(Self::StartTokenSale),
            10 => Ok(Self::TransferResearchShare),
            11 => Ok(Self::OfferResearchShares),
            other => Err(GovernanceError::UnknownProposalAction(other)),
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A pending governance proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub group: GroupId,
    pub action_tag: ProposalActionTag,
    /// JSON-encoded [`crate::action::ProposalAction`].
    pub payload: String,
    pub creator: AccountName,
    /// Quorum in basis points, snapshotted from the group at creation.
    pub quorum: Share,
    pub created_at: u64,
    pub expiration: u64,
    /// Accounts that already voted.
    pub voted: BTreeSet<AccountName>,
}

impl Proposal {
    /// True strictly after the expiration instant: a vote cast exactly at
    /// `expiration` still counts. The sweep uses the inclusive test.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expiration
    }
}

/// One recorded vote; the weight is the voter's share at vote time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalVote {
    pub voter: AccountName,
    pub weight: Share,
    pub voted_at: u64,
}

/// Owns all open proposals and their votes.
#[derive(Debug, Default)]
pub struct ProposalRegistry {
    proposals: BTreeMap<ProposalId, Proposal>,
    votes: BTreeMap<ProposalId, Vec<ProposalVote>>,
    next_id: u64,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        group: GroupId,
        action_tag: ProposalActionTag,
        payload: String,
        creator: AccountName,
        quorum: Share,
        now: u64,
    ) -> ProposalId {
        let id = ProposalId::from(self.next_id);
        self.next_id += 1;
        self.proposals.insert(
            id,
            Proposal {
                id,
                group,
                action_tag,
                payload,
                creator,
                quorum,
                created_at: now,
                expiration: now + PROPOSAL_LIFETIME_SECS,
                voted: BTreeSet::new(),
            },
        );
        id
    }

    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Record a vote and return the new total weight.
    pub fn record_vote(
        &mut self,
        id: ProposalId,
        voter: AccountName,
        weight: Share,
        now: u64,
    ) -> Result<Share, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if !proposal.voted.insert(voter.clone()) {
            return Err(GovernanceError::DoubleVote {
                proposal: id,
                voter,
            });
        }
        let votes = self.votes.entry(id).or_default();
        votes.push(ProposalVote {
            voter,
            weight,
            voted_at: now,
        });
        Ok(votes.iter().map(|vote| vote.weight).sum())
    }

    pub fn total_votes(&self, id: ProposalId) -> Share {
        self.votes
            .get(&id)
            .map(|votes| votes.iter().map(|vote| vote.weight).sum())
            .unwrap_or(0)
    }

    /// Drop a proposal together with its votes.
    pub fn remove(&mut self, id: ProposalId) {
        self.proposals.remove(&id);
        self.votes.remove(&id);
    }

    pub fn expired_ids(&self, now: u64) -> Vec<ProposalId> {
        self.proposals
            .values()
            .filter(|proposal| proposal.expiration <= now)
            .map(|proposal| proposal.id)
            .collect()
    }

    /// Void every open vote cast by `voter` in proposals of `group`.
    /// Used when a member drops out: their weight must stop counting.
    pub fn remove_votes_by_voter(&mut self, group: GroupId, voter: &AccountName) {
        for proposal in self.proposals.values_mut() {
            if proposal.group != group {
                continue;
            }
            proposal.voted.remove(voter);
            if let Some(votes) = self.votes.get_mut(&proposal.id) {
                votes.retain(|vote| &vote.voter != voter);
            }
        }
    }

    pub fn open_in_group(&self, group: GroupId) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|proposal| proposal.group == group)
            .collect()
    }
}
