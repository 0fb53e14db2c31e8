//! Proposal governance engine.
//!
//! Proposals carry a typed action payload and live for a fixed window.
//! Votes are weighted by the voter's current group share; the moment the
//! accumulated weight reaches the group quorum the action executes and the
//! proposal is deleted. Expired proposals are swept away unexecuted.

use crate::action::ProposalAction;
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalRegistry};
use crate::services::DomainServices;
use crate::shares::ShareLedger;
use helicon_types::{
    AccountName, GroupId, ProposalId, ResearchId, Share, ONE_HUNDRED_PERCENT,
    REVIEW_SHARE_COOLDOWN_SECS,
};
use tracing::{debug, info, warn};

/// Result of casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Quorum not reached yet; the proposal stays open.
    Pending { total_weight: Share },
    /// Quorum reached, the action executed and the proposal was deleted.
    Executed,
}

/// Drives proposals from creation through quorum to execution.
pub struct GovernanceEngine<S: DomainServices> {
    ledger: ShareLedger,
    registry: ProposalRegistry,
    services: S,
}

impl<S: DomainServices> GovernanceEngine<S> {
    pub fn new(ledger: ShareLedger, services: S) -> Self {
        Self {
            ledger,
            registry: ProposalRegistry::new(),
            services,
        }
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ShareLedger {
        &mut self.ledger
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.registry.get(id)
    }

    /// Open a proposal. The creator must hold a share in the group; the
    /// quorum is snapshotted from the group at creation time.
    pub fn create_proposal(
        &mut self,
        group: GroupId,
        creator: &AccountName,
        action: &ProposalAction,
        now: u64,
    ) -> Result<ProposalId, GovernanceError> {
        let record = self.ledger.group(group)?;
        if !record.is_member(creator) {
            return Err(GovernanceError::NotMember {
                group,
                account: creator.clone(),
            });
        }
        action.validate()?;
        let quorum = record.quorum;
        let payload = action.to_payload()?;
        let id = self
            .registry
            .create(group, action.tag(), payload, creator.clone(), quorum, now);
        debug!(proposal = %id, group = %group, creator = %creator, "proposal created");
        Ok(id)
    }

    /// Cast a vote with the voter's current share as weight. Reaching the
    /// quorum executes the action and deletes the proposal; a handler error
    /// leaves the proposal (and the recorded vote) in place for the outer
    /// transaction layer to roll back.
    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: &AccountName,
        now: u64,
    ) -> Result<VoteOutcome, GovernanceError> {
        let (group, quorum, tag, payload, expired) = {
            let proposal = self
                .registry
                .get(id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            (
                proposal.group,
                proposal.quorum,
                proposal.action_tag,
                proposal.payload.clone(),
                proposal.is_expired(now),
            )
        };
        if expired {
            return Err(GovernanceError::ExpiredProposal(id));
        }

        let weight = self.ledger.group(group)?.share_of(voter).ok_or_else(|| {
            GovernanceError::NotMember {
                group,
                account: voter.clone(),
            }
        })?;
        let total = self.registry.record_vote(id, voter.clone(), weight, now)?;

        // Integer quorum test, round-down on both sides; exact ties pass.
        let group_total = self.ledger.group_total(group)?;
        if total * ONE_HUNDRED_PERCENT >= quorum * group_total {
            let action = ProposalAction::from_payload(tag, &payload)?;
            action.validate()?;
            self.execute(group, action, now)?;
            self.registry.remove(id);
            info!(proposal = %id, group = %group, "proposal reached quorum and executed");
            return Ok(VoteOutcome::Executed);
        }

        debug!(proposal = %id, total_weight = total, "vote recorded below quorum");
        Ok(VoteOutcome::Pending {
            total_weight: total,
        })
    }

    /// Delete every expired proposal, returning their ids.
    pub fn sweep_expired(&mut self, now: u64) -> Vec<ProposalId> {
        let expired = self.registry.expired_ids(now);
        for id in &expired {
            self.registry.remove(*id);
            info!(proposal = %id, "expired proposal swept");
        }
        expired
    }

    fn execute(
        &mut self,
        group: GroupId,
        action: ProposalAction,
        now: u64,
    ) -> Result<(), GovernanceError> {
        match action {
            ProposalAction::InviteMember {
                account,
                share,
                inviter,
            } => {
                self.ledger
                    .add_member(group, account, share, inviter.as_ref())?;
                Ok(())
            }
            ProposalAction::DropoutMember { account } => self.dropout(group, &account),
            ProposalAction::ChangeQuorum { quorum } => {
                self.ledger.change_quorum(group, quorum)?;
                Ok(())
            }
            ProposalAction::ChangeReviewSharePercent {
                research,
                review_share,
            } => self.change_review_share(research, review_share, now),
            ProposalAction::StartResearch {
                title,
                abstract_text,
                permlink,
                review_share,
                dropout_compensation,
                disciplines,
            } => {
                let research = self.services.create_research(
                    group,
                    &title,
                    &abstract_text,
                    &permlink,
                    review_share,
                    dropout_compensation,
                    &disciplines,
                );
                info!(group = %group, research = %research, "research started");
                Ok(())
            }
            ProposalAction::SendFunds { recipient, amount } => {
                self.ledger.debit_balance(group, amount)?;
                self.services.credit_account_balance(&recipient, amount);
                Ok(())
            }
            ProposalAction::RebalanceGroupShares { shares } => {
                self.ledger.rebalance(group, &shares)?;
                Ok(())
            }
            ProposalAction::CreateResearchMaterial {
                research,
                title,
                content,
            } => {
                if !self.services.research_exists(research) {
                    return Err(GovernanceError::ResearchNotFound(research));
                }
                if self.services.research_is_finished(research) {
                    return Err(GovernanceError::ResearchFinished(research));
                }
                self.services
                    .create_research_material(research, &title, &content);
                Ok(())
            }
            ProposalAction::StartTokenSale {
                research,
                amount_for_sale,
                soft_cap,
                hard_cap,
                start_time,
                end_time,
            } => {
                if !self.services.research_exists(research) {
                    return Err(GovernanceError::ResearchNotFound(research));
                }
                if self.services.research_owned_tokens(research) < amount_for_sale {
                    return Err(GovernanceError::InsufficientResearchTokens(research));
                }
                self.services.decrease_owned_tokens(research, amount_for_sale);
                self.services.start_token_sale(
                    research,
                    amount_for_sale,
                    soft_cap,
                    hard_cap,
                    start_time,
                    end_time,
                );
                Ok(())
            }
            ProposalAction::TransferResearchShare {
                research,
                from,
                to,
                amount,
            } => self
                .services
                .transfer_research_share(research, &from, &to, amount),
            ProposalAction::OfferResearchShares {
                research,
                sender,
                receiver,
                amount,
                price,
            } => {
                self.services
                    .offer_research_shares(research, &sender, &receiver, amount, price);
                Ok(())
            }
        }
    }

    /// Remove a member: void their open votes in the group, compensate them
    /// with research tokens proportional to their share, then redistribute
    /// their group share.
    fn dropout(&mut self, group: GroupId, account: &AccountName) -> Result<(), GovernanceError> {
        let member_share = self.ledger.group(group)?.share_of(account).ok_or_else(|| {
            GovernanceError::NotMember {
                group,
                account: account.clone(),
            }
        })?;

        self.registry.remove_votes_by_voter(group, account);

        for research in self.services.group_researches(group) {
            let compensation_bps =
                member_share * self.services.dropout_compensation_bps(research)
                    / ONE_HUNDRED_PERCENT;
            let tokens =
                self.services.research_owned_tokens(research) * compensation_bps
                    / ONE_HUNDRED_PERCENT;
            if tokens > 0 {
                self.services.decrease_owned_tokens(research, tokens);
                self.services.credit_research_tokens(research, account, tokens);
            }
        }

        self.ledger.remove_member(group, account)?;
        info!(group = %group, account = %account, "member dropped out");
        Ok(())
    }

    fn change_review_share(
        &mut self,
        research: ResearchId,
        review_share: Share,
        now: u64,
    ) -> Result<(), GovernanceError> {
        if !self.services.research_exists(research) {
            return Err(GovernanceError::ResearchNotFound(research));
        }
        let last_update = self.services.review_share_last_update(research);
        if now.saturating_sub(last_update) < REVIEW_SHARE_COOLDOWN_SECS {
            warn!(research = %research, "review share change within cooldown");
            return Err(GovernanceError::ReviewShareCooldown(research));
        }
        self.services.set_review_share(research, review_share, now);
        Ok(())
    }
}
