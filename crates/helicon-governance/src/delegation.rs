//! Delegated-vote propagation.
//!
//! Each account may name one delegate; delegated stake flows up the proxy
//! chain through per-depth buckets, so that removing a link in the middle
//! of a chain subtracts exactly the stake that arrived through it. Chains
//! are bounded at [`MAX_PROXY_DEPTH`] links.

use crate::error::DelegationError;
use helicon_types::{AccountId, AccountName, Share, MAX_PROXY_DEPTH};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::debug;

/// Terminal aggregation callback.
///
/// Whatever tally lives downstream of delegation (witness votes, expertise
/// weights) receives the net change at the end of a proxy chain here.
pub trait VoteSink {
    /// The effective weight of `terminal` changed by `delta`.
    fn adjust(&mut self, terminal: &AccountName, delta: Share);

    /// `follower` set a delegate; any votes it cast directly are superseded.
    fn clear_direct_votes(&mut self, follower: &AccountName);
}

/// Per-account delegation record.
#[derive(Debug, Clone)]
pub struct DelegationAccount {
    pub name: AccountName,
    /// Current delegate, if any.
    pub proxy: Option<AccountId>,
    /// The account's own voting stake.
    pub voting_stake: Share,
    /// Stake that arrived through proxy chains, bucketed by the distance
    /// it travelled. `proxied[0]` came from direct followers.
    pub proxied: [Share; MAX_PROXY_DEPTH],
}

impl DelegationAccount {
    /// Own stake plus everything proxied to this account.
    ///
    /// Only meaningful while the account has no delegate of its own.
    pub fn total_weight(&self) -> Share {
        self.voting_stake + self.proxied.iter().sum::<Share>()
    }
}

/// Arena of delegation records with a name index.
#[derive(Debug, Default)]
pub struct DelegationArena {
    accounts: Vec<DelegationAccount>,
    by_name: BTreeMap<AccountName, AccountId>,
}

impl DelegationArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with its initial voting stake. Registering an
    /// existing name returns the existing id untouched.
    pub fn register(&mut self, name: AccountName, voting_stake: Share) -> AccountId {
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = AccountId(self.accounts.len() as u32);
        self.accounts.push(DelegationAccount {
            name: name.clone(),
            proxy: None,
            voting_stake,
            proxied: [0; MAX_PROXY_DEPTH],
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn get(&self, name: &AccountName) -> Option<&DelegationAccount> {
        self.by_name.get(name).map(|id| &self.accounts[id.index()])
    }

    fn id_of(&self, name: &AccountName) -> Result<AccountId, DelegationError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| DelegationError::UnknownAccount(name.clone()))
    }

    /// Point `follower` at a new delegate, or clear it with `None`.
    ///
    /// Validation happens before any state change: on error both accounts
    /// and every chain bucket are left exactly as they were. Setting a
    /// delegate supersedes the follower's direct votes.
    pub fn set_delegate(
        &mut self,
        follower: &AccountName,
        delegate: Option<&AccountName>,
        sink: &mut dyn VoteSink,
    ) -> Result<(), DelegationError> {
        let follower_id = self.id_of(follower)?;
        let new_proxy = match delegate {
            Some(name) => Some(self.id_of(name)?),
            None => None,
        };

        if self.accounts[follower_id.index()].proxy == new_proxy {
            return Err(DelegationError::ProxyUnchanged);
        }

        if let Some(first) = new_proxy {
            self.check_chain(follower_id, first)?;
        }

        // Subtract the follower's whole contribution from the old chain.
        let mut delta = [0 as Share; MAX_PROXY_DEPTH + 1];
        {
            let account = &self.accounts[follower_id.index()];
            delta[0] = -account.voting_stake;
            for i in 0..MAX_PROXY_DEPTH {
                delta[i + 1] = -account.proxied[i];
            }
        }
        self.propagate(follower_id, &delta, sink);

        if new_proxy.is_some() {
            sink.clear_direct_votes(follower);
        }
        self.accounts[follower_id.index()].proxy = new_proxy;

        // Add it back into the new chain (or back to the follower itself).
        for slot in delta.iter_mut() {
            *slot = -*slot;
        }
        self.propagate(follower_id, &delta, sink);

        debug!(
            follower = %follower,
            delegate = delegate.map(|d| d.as_str()).unwrap_or(""),
            "delegation changed"
        );
        Ok(())
    }

    /// Change an account's own stake by `delta` and push the change up its
    /// proxy chain.
    pub fn adjust_weight(
        &mut self,
        account: &AccountName,
        delta: Share,
        sink: &mut dyn VoteSink,
    ) -> Result<(), DelegationError> {
        let id = self.id_of(account)?;
        self.accounts[id.index()].voting_stake += delta;
        self.propagate_scalar(id, delta, sink);
        Ok(())
    }

    /// Walk the chain starting at `first`; `follower` must not already be
    /// on it, and the combined chain must fit within the depth bound.
    fn check_chain(&self, follower: AccountId, first: AccountId) -> Result<(), DelegationError> {
        let mut visited: SmallVec<[AccountId; MAX_PROXY_DEPTH + 1]> = SmallVec::new();
        visited.push(follower);
        let mut current = first;
        loop {
            if visited.contains(&current) {
                return Err(DelegationError::ProxyLoopDetected(
                    self.accounts[current.index()].name.clone(),
                ));
            }
            visited.push(current);
            if visited.len() > MAX_PROXY_DEPTH + 1 {
                return Err(DelegationError::ProxyChainTooLong(
                    self.accounts[current.index()].name.clone(),
                ));
            }
            match self.accounts[current.index()].proxy {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
    }

    /// Depth-shifted array propagation: `delta[i]` lands in bucket
    /// `i + depth` of each ancestor. Depth exhaustion truncates silently;
    /// the terminal account reports the full net change to the sink.
    fn propagate(
        &mut self,
        from: AccountId,
        delta: &[Share; MAX_PROXY_DEPTH + 1],
        sink: &mut dyn VoteSink,
    ) {
        let mut current = from;
        let mut depth = 0usize;
        loop {
            match self.accounts[current.index()].proxy {
                Some(proxy_id) => {
                    if depth >= MAX_PROXY_DEPTH {
                        return;
                    }
                    let proxy = &mut self.accounts[proxy_id.index()];
                    for i in 0..(MAX_PROXY_DEPTH - depth) {
                        proxy.proxied[i + depth] += delta[i];
                    }
                    current = proxy_id;
                    depth += 1;
                }
                None => {
                    let total: Share = delta.iter().sum();
                    let name = self.accounts[current.index()].name.clone();
                    sink.adjust(&name, total);
                    return;
                }
            }
        }
    }

    fn propagate_scalar(&mut self, from: AccountId, delta: Share, sink: &mut dyn VoteSink) {
        let mut current = from;
        let mut depth = 0usize;
        loop {
            match self.accounts[current.index()].proxy {
                Some(proxy_id) => {
                    if depth >= MAX_PROXY_DEPTH {
                        return;
                    }
                    self.accounts[proxy_id.index()].proxied[depth] += delta;
                    current = proxy_id;
                    depth += 1;
                }
                None => {
                    let name = self.accounts[current.index()].name.clone();
                    sink.adjust(&name, delta);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        adjustments: Vec<(AccountName, Share)>,
        cleared: Vec<AccountName>,
    }

    impl VoteSink for RecordingSink {
        fn adjust(&mut self, terminal: &AccountName, delta: Share) {
            self.adjustments.push((terminal.clone(), delta));
        }

        fn clear_direct_votes(&mut self, follower: &AccountName) {
            self.cleared.push(follower.clone());
        }
    }

    fn name(s: &str) -> AccountName {
        AccountName::from(s)
    }

    fn arena_with(names: &[(&str, Share)]) -> DelegationArena {
        let mut arena = DelegationArena::new();
        for (n, stake) in names {
            arena.register(name(n), *stake);
        }
        arena
    }

    #[test]
    fn test_delegation_moves_stake_to_terminal() {
        let mut arena = arena_with(&[("alice", 100), ("bob", 50)]);
        let mut sink = RecordingSink::default();

        arena
            .set_delegate(&name("alice"), Some(&name("bob")), &mut sink)
            .unwrap();

        let bob = arena.get(&name("bob")).unwrap();
        assert_eq!(bob.proxied[0], 100);
        assert_eq!(bob.total_weight(), 150);
        // alice's own contribution first left her tally, then landed at bob
        assert_eq!(
            sink.adjustments,
            vec![(name("alice"), -100), (name("bob"), 100)]
        );
        assert_eq!(sink.cleared, vec![name("alice")]);
    }

    #[test]
    fn test_clearing_delegate_returns_stake() {
        let mut arena = arena_with(&[("alice", 100), ("bob", 50)]);
        let mut sink = RecordingSink::default();
        arena
            .set_delegate(&name("alice"), Some(&name("bob")), &mut sink)
            .unwrap();

        let mut sink = RecordingSink::default();
        arena.set_delegate(&name("alice"), None, &mut sink).unwrap();

        assert_eq!(arena.get(&name("bob")).unwrap().proxied[0], 0);
        assert_eq!(
            sink.adjustments,
            vec![(name("bob"), -100), (name("alice"), 100)]
        );
        // clearing does not touch direct votes
        assert!(sink.cleared.is_empty());
    }

    #[test]
    fn test_chain_buckets_by_depth() {
        let mut arena = arena_with(&[("a", 10), ("b", 20), ("c", 30)]);
        let mut sink = RecordingSink::default();

        arena
            .set_delegate(&name("b"), Some(&name("c")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("a"), Some(&name("b")), &mut sink)
            .unwrap();

        let b = arena.get(&name("b")).unwrap();
        let c = arena.get(&name("c")).unwrap();
        assert_eq!(b.proxied[0], 10);
        // a's stake travelled two links to reach c
        assert_eq!(c.proxied[0], 20);
        assert_eq!(c.proxied[1], 10);
        assert_eq!(c.total_weight(), 60);
    }

    #[test]
    fn test_proxy_chain_depth_bound() {
        let mut arena = arena_with(&[
            ("a", 1),
            ("b", 1),
            ("c", 1),
            ("d", 1),
            ("e", 1),
            ("f", 1),
        ]);
        let mut sink = RecordingSink::default();

        arena
            .set_delegate(&name("e"), Some(&name("f")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("d"), Some(&name("e")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("c"), Some(&name("d")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("b"), Some(&name("c")), &mut sink)
            .unwrap();

        // a -> b -> c -> d -> e -> f is one link too many
        let result = arena.set_delegate(&name("a"), Some(&name("b")), &mut sink);
        assert!(matches!(result, Err(DelegationError::ProxyChainTooLong(_))));
        assert!(arena.get(&name("a")).unwrap().proxy.is_none());
    }

    #[test]
    fn test_five_hop_chain_truncates_at_depth() {
        // appending at the tail builds a chain longer than any single
        // set_delegate could: a -> b -> c -> d -> e -> f
        let mut arena = arena_with(&[
            ("a", 10),
            ("b", 0),
            ("c", 0),
            ("d", 0),
            ("e", 0),
            ("f", 0),
        ]);
        let mut sink = RecordingSink::default();
        arena.set_delegate(&name("a"), Some(&name("b")), &mut sink).unwrap();
        arena.set_delegate(&name("b"), Some(&name("c")), &mut sink).unwrap();
        arena.set_delegate(&name("c"), Some(&name("d")), &mut sink).unwrap();
        arena.set_delegate(&name("d"), Some(&name("e")), &mut sink).unwrap();
        arena.set_delegate(&name("e"), Some(&name("f")), &mut sink).unwrap();

        let mut sink = RecordingSink::default();
        arena.adjust_weight(&name("a"), 7, &mut sink).unwrap();

        // the delta climbs four links, one bucket per hop
        assert_eq!(arena.get(&name("b")).unwrap().proxied[0], 17);
        assert_eq!(arena.get(&name("c")).unwrap().proxied[1], 17);
        assert_eq!(arena.get(&name("d")).unwrap().proxied[2], 17);
        assert_eq!(arena.get(&name("e")).unwrap().proxied[3], 17);
        // the fifth link is past the depth bound: f's buckets stay empty
        // and no terminal tally is reported
        assert_eq!(arena.get(&name("f")).unwrap().proxied, [0; MAX_PROXY_DEPTH]);
        assert!(sink.adjustments.is_empty());
    }

    #[test]
    fn test_proxy_loop_rejected_without_mutation() {
        let mut arena = arena_with(&[("a", 10), ("b", 20), ("c", 30)]);
        let mut sink = RecordingSink::default();
        arena
            .set_delegate(&name("a"), Some(&name("b")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("b"), Some(&name("c")), &mut sink)
            .unwrap();

        let before_c = arena.get(&name("c")).unwrap().clone();
        let mut sink = RecordingSink::default();
        let result = arena.set_delegate(&name("c"), Some(&name("a")), &mut sink);

        assert!(matches!(result, Err(DelegationError::ProxyLoopDetected(_))));
        let after_c = arena.get(&name("c")).unwrap();
        assert_eq!(after_c.proxy, before_c.proxy);
        assert_eq!(after_c.proxied, before_c.proxied);
        assert!(sink.adjustments.is_empty());
    }

    #[test]
    fn test_self_delegation_is_a_loop() {
        let mut arena = arena_with(&[("a", 10)]);
        let mut sink = RecordingSink::default();
        let result = arena.set_delegate(&name("a"), Some(&name("a")), &mut sink);
        assert!(matches!(result, Err(DelegationError::ProxyLoopDetected(_))));
    }

    #[test]
    fn test_unchanged_delegate_rejected() {
        let mut arena = arena_with(&[("a", 10), ("b", 20)]);
        let mut sink = RecordingSink::default();
        arena
            .set_delegate(&name("a"), Some(&name("b")), &mut sink)
            .unwrap();
        assert_eq!(
            arena.set_delegate(&name("a"), Some(&name("b")), &mut sink),
            Err(DelegationError::ProxyUnchanged)
        );
        assert_eq!(
            arena.set_delegate(&name("b"), None, &mut sink),
            Err(DelegationError::ProxyUnchanged)
        );
    }

    #[test]
    fn test_adjust_weight_follows_chain() {
        let mut arena = arena_with(&[("a", 10), ("b", 0), ("c", 0)]);
        let mut sink = RecordingSink::default();
        arena
            .set_delegate(&name("a"), Some(&name("b")), &mut sink)
            .unwrap();
        arena
            .set_delegate(&name("b"), Some(&name("c")), &mut sink)
            .unwrap();

        let mut sink = RecordingSink::default();
        arena.adjust_weight(&name("a"), 5, &mut sink).unwrap();

        assert_eq!(arena.get(&name("a")).unwrap().voting_stake, 15);
        assert_eq!(arena.get(&name("b")).unwrap().proxied[0], 15);
        assert_eq!(arena.get(&name("c")).unwrap().proxied[1], 15);
        assert_eq!(sink.adjustments, vec![(name("c"), 5)]);
    }

    #[test]
    fn test_adjust_weight_without_proxy_hits_sink() {
        let mut arena = arena_with(&[("a", 10)]);
        let mut sink = RecordingSink::default();
        arena.adjust_weight(&name("a"), -3, &mut sink).unwrap();
        assert_eq!(arena.get(&name("a")).unwrap().voting_stake, 7);
        assert_eq!(sink.adjustments, vec![(name("a"), -3)]);
    }
}
