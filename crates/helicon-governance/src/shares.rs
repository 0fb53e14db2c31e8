//! Membership share ledger.
//!
//! Every research group divides exactly 10000 basis points among its
//! members, at all times. Joining and leaving redistribute shares with
//! integer arithmetic; whatever truncation leaves over is assigned
//! deterministically so the sum never drifts.

use crate::error::ShareError;
use helicon_types::{AccountName, GroupId, Share, ONE_HUNDRED_PERCENT, ONE_PERCENT};
use std::collections::BTreeMap;
use tracing::debug;

/// A research group and its member share table.
#[derive(Debug, Clone)]
pub struct ResearchGroup {
    pub id: GroupId,
    pub name: String,
    /// Proposal quorum in basis points.
    pub quorum: Share,
    /// Spendable group funds.
    pub balance: Share,
    members: BTreeMap<AccountName, Share>,
}

impl ResearchGroup {
    pub fn is_member(&self, account: &AccountName) -> bool {
        self.members.contains_key(account)
    }

    pub fn share_of(&self, account: &AccountName) -> Option<Share> {
        self.members.get(account).copied()
    }

    pub fn members(&self) -> &BTreeMap<AccountName, Share> {
        &self.members
    }

    fn total(&self) -> Share {
        self.members.values().sum()
    }
}

/// Owns every group and its share rows.
#[derive(Debug, Default)]
pub struct ShareLedger {
    groups: BTreeMap<GroupId, ResearchGroup>,
    next_id: u64,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group; the founder starts with the full 10000 bps.
    pub fn create_group(
        &mut self,
        name: &str,
        quorum: Share,
        founder: AccountName,
    ) -> Result<GroupId, ShareError> {
        validate_quorum(quorum)?;
        let id = GroupId::from(self.next_id);
        self.next_id += 1;

        let mut members = BTreeMap::new();
        members.insert(founder, ONE_HUNDRED_PERCENT);
        self.groups.insert(
            id,
            ResearchGroup {
                id,
                name: name.to_string(),
                quorum,
                balance: 0,
                members,
            },
        );
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Result<&ResearchGroup, ShareError> {
        self.groups.get(&id).ok_or(ShareError::GroupNotFound(id))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut ResearchGroup, ShareError> {
        self.groups
            .get_mut(&id)
            .ok_or(ShareError::GroupNotFound(id))
    }

    pub fn share_of(&self, id: GroupId, account: &AccountName) -> Result<Share, ShareError> {
        self.group(id)?
            .share_of(account)
            .ok_or_else(|| ShareError::MemberNotFound {
                group: id,
                account: account.clone(),
            })
    }

    pub fn members(&self, id: GroupId) -> Result<&BTreeMap<AccountName, Share>, ShareError> {
        Ok(self.group(id)?.members())
    }

    /// Total share weight of a group. Always exactly 10000; quorum math
    /// uses this instead of the constant so the invariant stays visible.
    pub fn group_total(&self, id: GroupId) -> Result<Share, ShareError> {
        Ok(self.group(id)?.total())
    }

    /// Add a member. With an inviter, the share is carved out of the
    /// inviter's holding; without one, every member is diluted
    /// proportionally (never below the 1% floor) and the newcomer absorbs
    /// the remainder, rounding included.
    pub fn add_member(
        &mut self,
        id: GroupId,
        account: AccountName,
        share: Share,
        inviter: Option<&AccountName>,
    ) -> Result<(), ShareError> {
        validate_share(share)?;
        let group = self.group_mut(id)?;
        if group.members.contains_key(&account) {
            return Err(ShareError::AlreadyMember { group: id, account });
        }

        match inviter {
            Some(inviter) => {
                let inviter_share =
                    group
                        .members
                        .get(inviter)
                        .copied()
                        .ok_or_else(|| ShareError::MemberNotFound {
                            group: id,
                            account: inviter.clone(),
                        })?;
                if inviter_share - share <= ONE_PERCENT {
                    return Err(ShareError::InsufficientShareToInvite {
                        inviter: inviter.clone(),
                        share,
                    });
                }
                group.members.insert(inviter.clone(), inviter_share - share);
                group.members.insert(account, share);
            }
            None => {
                let mut assigned: Share = 0;
                let mut diluted: Vec<(AccountName, Share)> = Vec::new();
                for (member, held) in &group.members {
                    let cut = held * share / ONE_HUNDRED_PERCENT;
                    let new_share = (held - cut).max(ONE_PERCENT);
                    assigned += new_share;
                    diluted.push((member.clone(), new_share));
                }
                let newcomer_share = ONE_HUNDRED_PERCENT - assigned;
                if newcomer_share <= 0 {
                    return Err(ShareError::NoShareAvailable(id));
                }
                for (member, new_share) in diluted {
                    group.members.insert(member, new_share);
                }
                group.members.insert(account, newcomer_share);
            }
        }

        self.check_invariant(id)
    }

    /// Remove a member, redistributing its share proportionally. The
    /// truncation remainder goes to the smallest holding (first in account
    /// order on a tie).
    pub fn remove_member(&mut self, id: GroupId, account: &AccountName) -> Result<(), ShareError> {
        let group = self.group_mut(id)?;
        let removed =
            group
                .members
                .remove(account)
                .ok_or_else(|| ShareError::MemberNotFound {
                    group: id,
                    account: account.clone(),
                })?;
        if group.members.is_empty() {
            group.members.insert(account.clone(), removed);
            return Err(ShareError::CannotRemoveLastMember(id));
        }

        let remaining = ONE_HUNDRED_PERCENT - removed;
        let mut total: Share = 0;
        let updates: Vec<(AccountName, Share)> = group
            .members
            .iter()
            .map(|(member, held)| {
                let grown = held * ONE_HUNDRED_PERCENT / remaining;
                total += grown;
                (member.clone(), grown)
            })
            .collect();
        for (member, grown) in updates {
            group.members.insert(member, grown);
        }

        let remainder = ONE_HUNDRED_PERCENT - total;
        if remainder > 0 {
            let smallest = group
                .members
                .iter()
                .min_by_key(|(_, held)| **held)
                .map(|(member, _)| member.clone());
            if let Some(member) = smallest {
                if let Some(held) = group.members.get_mut(&member) {
                    *held += remainder;
                }
            }
        }

        self.check_invariant(id)
    }

    /// Replace the whole share table: the map must name exactly the current
    /// members and sum to 10000, or nothing changes.
    pub fn rebalance(
        &mut self,
        id: GroupId,
        shares: &BTreeMap<AccountName, Share>,
    ) -> Result<(), ShareError> {
        let group = self.group_mut(id)?;
        if shares.len() != group.members.len()
            || !shares.keys().all(|member| group.members.contains_key(member))
        {
            return Err(ShareError::RebalanceMembershipMismatch(id));
        }
        for share in shares.values() {
            // a lone member may legitimately hold the full 10000
            if *share <= 0 || *share > ONE_HUNDRED_PERCENT {
                return Err(ShareError::InvalidShare(*share));
            }
        }
        let total: Share = shares.values().sum();
        if total != ONE_HUNDRED_PERCENT {
            return Err(ShareError::ShareInvariantViolation { group: id, total });
        }

        group.members = shares.clone();
        debug!(group = %id, "group shares rebalanced");
        Ok(())
    }

    pub fn change_quorum(&mut self, id: GroupId, quorum: Share) -> Result<(), ShareError> {
        validate_quorum(quorum)?;
        self.group_mut(id)?.quorum = quorum;
        Ok(())
    }

    pub fn credit_balance(&mut self, id: GroupId, amount: Share) -> Result<(), ShareError> {
        self.group_mut(id)?.balance += amount;
        Ok(())
    }

    pub fn debit_balance(&mut self, id: GroupId, amount: Share) -> Result<(), ShareError> {
        let group = self.group_mut(id)?;
        if group.balance < amount {
            return Err(ShareError::InsufficientGroupBalance {
                group: id,
                requested: amount,
                available: group.balance,
            });
        }
        group.balance -= amount;
        Ok(())
    }

    fn check_invariant(&self, id: GroupId) -> Result<(), ShareError> {
        let total = self.group(id)?.total();
        if total != ONE_HUNDRED_PERCENT {
            return Err(ShareError::ShareInvariantViolation { group: id, total });
        }
        Ok(())
    }
}

fn validate_share(share: Share) -> Result<(), ShareError> {
    if share <= 0 || share >= ONE_HUNDRED_PERCENT {
        return Err(ShareError::InvalidShare(share));
    }
    Ok(())
}

fn validate_quorum(quorum: Share) -> Result<(), ShareError> {
    if quorum <= 0 || quorum > ONE_HUNDRED_PERCENT {
        return Err(ShareError::InvalidQuorum(quorum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name(s: &str) -> AccountName {
        AccountName::from(s)
    }

    fn ledger_with_founder() -> (ShareLedger, GroupId) {
        let mut ledger = ShareLedger::new();
        let id = ledger
            .create_group("photonics", 5_000, name("founder"))
            .unwrap();
        (ledger, id)
    }

    #[test]
    fn test_founder_starts_with_everything() {
        let (ledger, id) = ledger_with_founder();
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(ONE_HUNDRED_PERCENT));
        assert_eq!(ledger.group_total(id), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_invited_member_funded_by_inviter() {
        let (mut ledger, id) = ledger_with_founder();
        ledger
            .add_member(id, name("ada"), 3_000, Some(&name("founder")))
            .unwrap();
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(7_000));
        assert_eq!(ledger.share_of(id, &name("ada")), Ok(3_000));
    }

    #[test]
    fn test_inviter_must_keep_more_than_the_floor() {
        let (mut ledger, id) = ledger_with_founder();
        let result = ledger.add_member(id, name("ada"), 9_900, Some(&name("founder")));
        assert_eq!(
            result,
            Err(ShareError::InsufficientShareToInvite {
                inviter: name("founder"),
                share: 9_900,
            })
        );
        // rejection leaves the table untouched
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_dilution_newcomer_absorbs_rounding() {
        let (mut ledger, id) = ledger_with_founder();
        ledger.add_member(id, name("ada"), 2_500, None).unwrap();
        // founder diluted by 25%: 10000 - 2500 = 7500, ada gets the rest
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(7_500));
        assert_eq!(ledger.share_of(id, &name("ada")), Ok(2_500));
        assert_eq!(ledger.group_total(id), Ok(ONE_HUNDRED_PERCENT));

        ledger.add_member(id, name("bob"), 3_333, None).unwrap();
        assert_eq!(ledger.group_total(id), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_dilution_respects_one_percent_floor() {
        let (mut ledger, id) = ledger_with_founder();
        ledger
            .add_member(id, name("tiny"), 101, Some(&name("founder")))
            .unwrap();
        // tiny holds 101 bps; a heavy dilution may not push it below 100
        ledger.add_member(id, name("whale"), 9_000, None).unwrap();
        assert!(ledger.share_of(id, &name("tiny")).unwrap() >= ONE_PERCENT);
        assert_eq!(ledger.group_total(id), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_add_remove_round_trip_restores_founder() {
        let (mut ledger, id) = ledger_with_founder();
        ledger.add_member(id, name("ada"), 4_000, None).unwrap();
        ledger.remove_member(id, &name("ada")).unwrap();
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_remove_remainder_goes_to_smallest_member() {
        let (mut ledger, id) = ledger_with_founder();
        ledger.add_member(id, name("ada"), 3_000, Some(&name("founder")))
            .unwrap();
        ledger.add_member(id, name("bob"), 1_000, Some(&name("founder")))
            .unwrap();
        // founder 6000, ada 3000, bob 1000
        ledger.remove_member(id, &name("ada")).unwrap();
        // 6000*10000/7000 = 8571, 1000*10000/7000 = 1428, remainder 1 -> bob
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(8_571));
        assert_eq!(ledger.share_of(id, &name("bob")), Ok(1_429));
        assert_eq!(ledger.group_total(id), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_cannot_remove_last_member() {
        let (mut ledger, id) = ledger_with_founder();
        assert_eq!(
            ledger.remove_member(id, &name("founder")),
            Err(ShareError::CannotRemoveLastMember(id))
        );
        assert_eq!(ledger.share_of(id, &name("founder")), Ok(ONE_HUNDRED_PERCENT));
    }

    #[test]
    fn test_rebalance_requires_exact_membership_and_total() {
        let (mut ledger, id) = ledger_with_founder();
        ledger.add_member(id, name("ada"), 4_000, None).unwrap();

        let mut wrong_member = BTreeMap::new();
        wrong_member.insert(name("founder"), 5_000 as Share);
        wrong_member.insert(name("ghost"), 5_000);
        assert_eq!(
            ledger.rebalance(id, &wrong_member),
            Err(ShareError::RebalanceMembershipMismatch(id))
        );

        let mut wrong_total = BTreeMap::new();
        wrong_total.insert(name("founder"), 5_000 as Share);
        wrong_total.insert(name("ada"), 4_999);
        assert_eq!(
            ledger.rebalance(id, &wrong_total),
            Err(ShareError::ShareInvariantViolation {
                group: id,
                total: 9_999,
            })
        );
        // failed rebalance changed nothing
        assert_eq!(ledger.share_of(id, &name("ada")), Ok(4_000));

        let mut good = BTreeMap::new();
        good.insert(name("founder"), 5_000 as Share);
        good.insert(name("ada"), 5_000);
        ledger.rebalance(id, &good).unwrap();
        assert_eq!(ledger.share_of(id, &name("ada")), Ok(5_000));
    }

    #[test]
    fn test_balance_debit_needs_funds() {
        let (mut ledger, id) = ledger_with_founder();
        ledger.credit_balance(id, 500).unwrap();
        assert_eq!(
            ledger.debit_balance(id, 600),
            Err(ShareError::InsufficientGroupBalance {
                group: id,
                requested: 600,
                available: 500,
            })
        );
        ledger.debit_balance(id, 500).unwrap();
        assert_eq!(ledger.group(id).unwrap().balance, 0);
    }

    proptest! {
        /// The 10000 bps sum survives arbitrary join/leave sequences.
        #[test]
        fn prop_share_sum_invariant(ops in prop::collection::vec((0u8..3, 1i64..6_000), 1..40)) {
            let mut ledger = ShareLedger::new();
            let id = ledger.create_group("g", 5_000, AccountName::from("founder")).unwrap();
            let mut joined: u32 = 0;

            for (kind, amount) in ops {
                match kind {
                    0 => {
                        let member = AccountName::from(format!("m{joined}").as_str());
                        if ledger.add_member(id, member, amount, None).is_ok() {
                            joined += 1;
                        }
                    }
                    1 => {
                        if joined > 0 {
                            let member = AccountName::from(format!("m{}", joined - 1).as_str());
                            if ledger.remove_member(id, &member).is_ok() {
                                joined -= 1;
                            }
                        }
                    }
                    _ => {
                        // proportional removal of the founder and re-add
                        let founder = AccountName::from("founder");
                        if ledger.group(id).unwrap().is_member(&founder)
                            && ledger.remove_member(id, &founder).is_ok()
                        {
                            ledger.add_member(id, founder, amount.min(2_000), None).ok();
                        }
                    }
                }
                prop_assert_eq!(ledger.group_total(id).unwrap(), ONE_HUNDRED_PERCENT);
            }
        }
    }
}
