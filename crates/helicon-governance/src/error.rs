use helicon_types::{AccountName, GroupId, ProposalId, ResearchId, Share};
use thiserror::Error;

/// Errors raised by the delegation arena.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegationError {
    #[error("account {0} is not registered for delegation")]
    UnknownAccount(AccountName),

    #[error("delegating to {0} would create a proxy loop")]
    ProxyLoopDetected(AccountName),

    #[error("proxy chain through {0} exceeds the maximum depth")]
    ProxyChainTooLong(AccountName),

    #[error("delegate is already set to the requested target")]
    ProxyUnchanged,
}

/// Errors raised by the membership share ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("research group {0} does not exist")]
    GroupNotFound(GroupId),

    #[error("account {account} holds no share in group {group}")]
    MemberNotFound { group: GroupId, account: AccountName },

    #[error("account {account} already holds a share in group {group}")]
    AlreadyMember { group: GroupId, account: AccountName },

    #[error("share amount {0} is outside the valid basis-point range")]
    InvalidShare(Share),

    #[error("quorum {0} is outside the valid basis-point range")]
    InvalidQuorum(Share),

    #[error("inviter {inviter} cannot fund a {share} bps share and stay above the floor")]
    InsufficientShareToInvite { inviter: AccountName, share: Share },

    #[error("no share left to assign to a new member of group {0}")]
    NoShareAvailable(GroupId),

    #[error("group {0} must keep at least one member")]
    CannotRemoveLastMember(GroupId),

    #[error("rebalance of group {0} must name exactly the current members")]
    RebalanceMembershipMismatch(GroupId),

    #[error("group {group} shares sum to {total} bps instead of 10000")]
    ShareInvariantViolation { group: GroupId, total: Share },

    #[error("group {group} balance {available} cannot cover {requested}")]
    InsufficientGroupBalance {
        group: GroupId,
        requested: Share,
        available: Share,
    },
}

/// Errors raised by the proposal governance engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("proposal {0} does not exist")]
    ProposalNotFound(ProposalId),

    #[error("account {account} is not a member of group {group}")]
    NotMember { group: GroupId, account: AccountName },

    #[error("account {voter} already voted on proposal {proposal}")]
    DoubleVote {
        proposal: ProposalId,
        voter: AccountName,
    },

    #[error("proposal {0} has expired")]
    ExpiredProposal(ProposalId),

    #[error("unknown proposal action discriminant {0}")]
    UnknownProposalAction(u16),

    #[error("invalid proposal action: {0}")]
    InvalidAction(String),

    #[error("malformed proposal payload: {0}")]
    InvalidPayload(String),

    #[error("research {0} does not exist")]
    ResearchNotFound(ResearchId),

    #[error("research {0} is finished and cannot receive new material")]
    ResearchFinished(ResearchId),

    #[error("research {0} does not own enough tokens for the requested amount")]
    InsufficientResearchTokens(ResearchId),

    #[error("review share of research {0} was changed within the cooldown window")]
    ReviewShareCooldown(ResearchId),

    #[error(transparent)]
    Share(#[from] ShareError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_error_converts_into_governance_error() {
        let err = ShareError::GroupNotFound(GroupId::from(7));
        let wrapped: GovernanceError = err.clone().into();
        assert_eq!(wrapped, GovernanceError::Share(err));
    }

    #[test]
    fn test_display_names_the_offender() {
        let err = GovernanceError::NotMember {
            group: GroupId::from(1),
            account: AccountName::from("mallory"),
        };
        assert!(err.to_string().contains("mallory"));
    }
}
