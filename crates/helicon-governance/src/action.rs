//! Typed governance action payloads.
//!
//! Actions travel inside proposals as JSON documents and are decoded and
//! re-validated at execution time, so a payload that was valid at proposal
//! creation is still checked against the state it finally runs on.

use crate::error::GovernanceError;
use crate::proposal::ProposalActionTag;
use helicon_types::{AccountName, ResearchId, Share, ONE_HUNDRED_PERCENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The payload union of every supported governance action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposalAction {
    InviteMember {
        account: AccountName,
        share: Share,
        inviter: Option<AccountName>,
    },
    DropoutMember {
        account: AccountName,
    },
    ChangeQuorum {
        quorum: Share,
    },
    ChangeReviewSharePercent {
        research: ResearchId,
        review_share: Share,
    },
    StartResearch {
        title: String,
        abstract_text: String,
        permlink: String,
        review_share: Share,
        dropout_compensation: Share,
        disciplines: Vec<u64>,
    },
    SendFunds {
        recipient: AccountName,
        amount: Share,
    },
    RebalanceGroupShares {
        shares: BTreeMap<AccountName, Share>,
    },
    CreateResearchMaterial {
        research: ResearchId,
        title: String,
        content: String,
    },
    StartTokenSale {
        research: ResearchId,
        amount_for_sale: Share,
        soft_cap: Share,
        hard_cap: Share,
        start_time: u64,
        end_time: u64,
    },
    TransferResearchShare {
        research: ResearchId,
        from: AccountName,
        to: AccountName,
        amount: Share,
    },
    OfferResearchShares {
        research: ResearchId,
        sender: AccountName,
        receiver: AccountName,
        amount: Share,
        price: Share,
    },
}

impl ProposalAction {
    pub fn tag(&self) -> ProposalActionTag {
        match self {
            Self::InviteMember { .. } => ProposalActionTag::InviteMember,
            Self::DropoutMember { .. } => ProposalActionTag::DropoutMember,
            Self::ChangeQuorum { .. } => ProposalActionTag::ChangeQuorum,
            Self::ChangeReviewSharePercent { .. } => ProposalActionTag::ChangeReviewSharePercent,
            Self::StartResearch { .. } => ProposalActionTag::StartResearch,
            Self::SendFunds { .. } => ProposalActionTag::SendFunds,
            Self::RebalanceGroupShares { .. } => ProposalActionTag::RebalanceGroupShares,
            Self::CreateResearchMaterial { .. } => ProposalActionTag::CreateResearchMaterial,
            Self::StartTokenSale { .. } => ProposalActionTag::StartTokenSale,
            Self::TransferResearchShare { .. } => ProposalActionTag::TransferResearchShare,
            Self::OfferResearchShares { .. } => ProposalActionTag::OfferResearchShares,
        }
    }

    /// Structural validation, independent of ledger state.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        match self {
            Self::InviteMember { account, share, .. } => {
                require(!account.is_none(), "invitee account must be named")?;
                require_bps(*share)
            }
            Self::DropoutMember { account } => {
                require(!account.is_none(), "dropout account must be named")
            }
            Self::ChangeQuorum { quorum } => require_bps(*quorum),
            Self::ChangeReviewSharePercent { review_share, .. } => require_bps(*review_share),
            Self::StartResearch {
                title,
                permlink,
                review_share,
                dropout_compensation,
                ..
            } => {
                require(!title.is_empty(), "research title must not be empty")?;
                require(!permlink.is_empty(), "research permlink must not be empty")?;
                require_bps(*review_share)?;
                require_bps(*dropout_compensation)
            }
            Self::SendFunds { recipient, amount } => {
                require(!recipient.is_none(), "recipient must be named")?;
                require(*amount > 0, "amount must be positive")
            }
            Self::RebalanceGroupShares { shares } => {
                require(!shares.is_empty(), "rebalance must name the members")
            }
            Self::CreateResearchMaterial { title, content, .. } => {
                require(!title.is_empty(), "material title must not be empty")?;
                require(!content.is_empty(), "material content must not be empty")
            }
            Self::StartTokenSale {
                amount_for_sale,
                soft_cap,
                hard_cap,
                start_time,
                end_time,
                ..
            } => {
                require(*amount_for_sale > 0, "sale amount must be positive")?;
                require(soft_cap <= hard_cap, "soft cap must not exceed hard cap")?;
                require(start_time < end_time, "sale must end after it starts")
            }
            Self::TransferResearchShare { from, to, amount, .. } => {
                require(from != to, "transfer endpoints must differ")?;
                require(*amount > 0, "amount must be positive")
            }
            Self::OfferResearchShares {
                sender,
                receiver,
                amount,
                price,
                ..
            } => {
                require(sender != receiver, "offer endpoints must differ")?;
                require(*amount > 0, "amount must be positive")?;
                require(*price > 0, "price must be positive")
            }
        }
    }

    pub fn to_payload(&self) -> Result<String, GovernanceError> {
        serde_json::to_string(self).map_err(|err| GovernanceError::InvalidPayload(err.to_string()))
    }

    /// Decode a stored payload and check it carries the expected action.
    pub fn from_payload(tag: ProposalActionTag, payload: &str) -> Result<Self, GovernanceError> {
        let action: Self = serde_json::from_str(payload)
            .map_err(|err| GovernanceError::InvalidPayload(err.to_string()))?;
        if action.tag() != tag {
            return Err(GovernanceError::InvalidPayload(format!(
                "payload action does not match proposal tag {}",
                tag.as_u16()
            )));
        }
        Ok(action)
    }
}

fn require(condition: bool, message: &str) -> Result<(), GovernanceError> {
    if condition {
        Ok(())
    } else {
        Err(GovernanceError::InvalidAction(message.to_string()))
    }
}

fn require_bps(value: Share) -> Result<(), GovernanceError> {
    require(
        value > 0 && value <= ONE_HUNDRED_PERCENT,
        "basis-point value out of range",
    )
}
