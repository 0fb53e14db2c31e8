//! Protocol constants shared by every subsystem.

/// Basis-point share amount. Signed because delegation deltas go negative.
pub type Share = i64;

/// 100% expressed in basis points. Every group's member shares sum to this.
pub const ONE_HUNDRED_PERCENT: Share = 10_000;

/// 1% in basis points. Floor for a diluted member's share.
pub const ONE_PERCENT: Share = ONE_HUNDRED_PERCENT / 100;

/// Maximum number of hops voting weight propagates through proxy chains.
pub const MAX_PROXY_DEPTH: usize = 4;

/// Maximum recursion depth when satisfying account authorities through
/// sub-account authorities.
pub const MAX_AUTHORITY_RECURSION: u32 = 2;

/// Fixed voting window for governance proposals, in seconds (one week).
pub const PROPOSAL_LIFETIME_SECS: u64 = 60 * 60 * 24 * 7;

/// Minimum time between review-share changes on a research, in seconds
/// (90 days).
pub const REVIEW_SHARE_COOLDOWN_SECS: u64 = 60 * 60 * 24 * 90;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_relation() {
        assert_eq!(ONE_PERCENT * 100, ONE_HUNDRED_PERCENT);
    }
}
