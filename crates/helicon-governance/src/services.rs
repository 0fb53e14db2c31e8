//! External domain collaborators.
//!
//! The governance engine mutates account balances, the research catalog,
//! research content and token holdings through this trait. The surrounding
//! node implements it over its storage layer; tests use an in-memory fake.

use crate::error::GovernanceError;
use helicon_types::{AccountName, GroupId, ResearchId, Share};

pub trait DomainServices {
    /// Credit spendable funds to an account.
    fn credit_account_balance(&mut self, account: &AccountName, amount: Share);

    /// Researches run by a group.
    fn group_researches(&self, group: GroupId) -> Vec<ResearchId>;

    fn research_exists(&self, research: ResearchId) -> bool;

    fn research_is_finished(&self, research: ResearchId) -> bool;

    /// Tokens the research still owns itself (not yet sold or granted).
    fn research_owned_tokens(&self, research: ResearchId) -> Share;

    fn decrease_owned_tokens(&mut self, research: ResearchId, amount: Share);

    /// Grant research tokens to an account, merging with any it holds.
    fn credit_research_tokens(&mut self, research: ResearchId, account: &AccountName, amount: Share);

    /// Dropout compensation of a research, in basis points.
    fn dropout_compensation_bps(&self, research: ResearchId) -> Share;

    /// When the research review share last changed, UNIX seconds.
    fn review_share_last_update(&self, research: ResearchId) -> u64;

    fn set_review_share(&mut self, research: ResearchId, review_share: Share, now: u64);

    #[allow(clippy::too_many_arguments)]
    fn create_research(
        &mut self,
        group: GroupId,
        title: &str,
        abstract_text: &str,
        permlink: &str,
        review_share: Share,
        dropout_compensation: Share,
        disciplines: &[u64],
    ) -> ResearchId;

    fn create_research_material(&mut self, research: ResearchId, title: &str, content: &str);

    fn start_token_sale(
        &mut self,
        research: ResearchId,
        amount_for_sale: Share,
        soft_cap: Share,
        hard_cap: Share,
        start_time: u64,
        end_time: u64,
    );

    fn transfer_research_share(
        &mut self,
        research: ResearchId,
        from: &AccountName,
        to: &AccountName,
        amount: Share,
    ) -> Result<(), GovernanceError>;

    fn offer_research_shares(
        &mut self,
        research: ResearchId,
        sender: &AccountName,
        receiver: &AccountName,
        amount: Share,
        price: Share,
    );
}
