//! Timeout-vote tally.
//!
//! Miners broadcast how many timeouts they believe the round has seen. The
//! tally keeps one vote per voter per epoch and resolves the epoch when the
//! local timer fires.

use std::collections::{HashMap, HashSet};

/// Timeout count and the votes collected for the current epoch.
///
/// Lives behind its own mutex inside a round so vote floods never contend
/// with block and VRF bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct TimeoutTally {
    count: i32,
    cap: i32,
    votes: HashMap<i32, u32>,
    voters: HashSet<String>,
}

impl TimeoutTally {
    /// Creates a tally; a `cap` of 0 leaves the count unbounded.
    pub(crate) fn with_cap(cap: i32) -> Self {
        Self {
            cap,
            ..Default::default()
        }
    }

    pub(crate) fn count(&self) -> i32 {
        self.count
    }

    pub(crate) fn votes(&self) -> HashMap<i32, u32> {
        self.votes.clone()
    }

    /// Records `voter`'s candidate count. Only the first vote of a voter in
    /// an epoch is counted.
    pub(crate) fn add_vote(&mut self, num: i32, voter: &str) -> bool {
        if !self.voters.insert(voter.to_string()) {
            return false;
        }
        *self.votes.entry(num).or_insert(0) += 1;
        true
    }

    /// Most voted candidate; ties go to the larger candidate.
    pub(crate) fn winner(&self) -> Option<i32> {
        self.votes
            .iter()
            .max_by_key(|(candidate, freq)| (**freq, **candidate))
            .map(|(candidate, _)| *candidate)
    }

    /// Closes the epoch: resolves the winner, clears the votes and bumps the
    /// count by one whatever the outcome.
    pub(crate) fn increment(&mut self) -> Option<i32> {
        let winner = self.winner();
        self.votes.clear();
        self.voters.clear();

        self.count = self.count.saturating_add(1);
        if self.cap > 0 && self.count > self.cap {
            self.count = self.cap;
        }
        winner
    }

    /// Raises the count to `count` if it is strictly greater.
    pub(crate) fn set_count(&mut self, count: i32) -> bool {
        if count <= self.count {
            return false;
        }
        self.count = count;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_wins() {
        let mut tally = TimeoutTally::default();
        tally.add_vote(2, "a");
        tally.add_vote(2, "b");
        tally.add_vote(3, "c");

        assert_eq!(tally.increment(), Some(2));
        assert_eq!(tally.count(), 1);
        assert!(tally.votes().is_empty());
    }

    #[test]
    fn test_tie_prefers_larger_candidate() {
        let mut tally = TimeoutTally::default();
        tally.add_vote(4, "a");
        tally.add_vote(1, "b");
        tally.add_vote(4, "c");
        tally.add_vote(1, "d");

        assert_eq!(tally.winner(), Some(4));
    }

    #[test]
    fn test_one_vote_per_voter_per_epoch() {
        let mut tally = TimeoutTally::default();
        assert!(tally.add_vote(2, "a"));
        assert!(!tally.add_vote(5, "a"));
        assert_eq!(tally.votes().get(&2), Some(&1));
        assert_eq!(tally.votes().get(&5), None);

        tally.increment();
        assert!(tally.add_vote(5, "a"));
    }

    #[test]
    fn test_increment_without_votes() {
        let mut tally = TimeoutTally::default();
        assert_eq!(tally.increment(), None);
        assert_eq!(tally.count(), 1);
    }

    #[test]
    fn test_cap() {
        let mut tally = TimeoutTally::with_cap(2);
        tally.increment();
        tally.increment();
        tally.increment();
        assert_eq!(tally.count(), 2);
    }

    #[test]
    fn test_increment_saturates_at_max() {
        let mut tally = TimeoutTally::default();
        tally.set_count(i32::MAX);
        tally.add_vote(1, "a");

        assert_eq!(tally.increment(), Some(1));
        assert_eq!(tally.count(), i32::MAX);
        assert!(tally.votes().is_empty());
    }

    #[test]
    fn test_set_count_only_raises() {
        let mut tally = TimeoutTally::default();
        assert!(tally.set_count(3));
        assert!(!tally.set_count(3));
        assert!(!tally.set_count(1));
        assert_eq!(tally.count(), 3);
    }
}
