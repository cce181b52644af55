//! Round-indexed snapshot storage.
//!
//! Values are stored under the round they became valid in. A lookup for
//! any round returns the value that was in effect at that round: the entry
//! at the greatest stored round not above it.

use crate::error::{Result, RoundError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage of per-round snapshots with floor lookups.
pub trait RoundStorage<T>: Send + Sync {
    /// Returns the value in effect at `round`.
    ///
    /// Rounds past the newest entry resolve to the newest entry; rounds
    /// below the oldest entry resolve to `None`.
    fn get(&self, round: i64) -> Option<Arc<T>>;

    /// Stores `entity` as the value starting at `round`, replacing any value
    /// already stored there.
    fn put(&self, entity: Arc<T>, round: i64);

    /// Returns the value stored at the newest round.
    fn get_latest(&self) -> Option<Arc<T>>;

    /// Returns the position of the entry in effect at `round`.
    fn find_round_index(&self, round: i64) -> Option<usize>;

    /// Returns the number of stored rounds.
    fn count(&self) -> usize;

    /// Returns the stored rounds in ascending order.
    fn get_rounds(&self) -> Vec<i64>;

    /// Returns the `index`-th smallest stored round.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    fn get_round(&self, index: usize) -> i64;

    /// Removes every entry at or below `round`. Fails if `round` itself is
    /// not stored.
    fn prune(&self, round: i64) -> Result<()>;
}

impl<T, S: RoundStorage<T> + ?Sized> RoundStorage<T> for Arc<S> {
    fn get(&self, round: i64) -> Option<Arc<T>> {
        (**self).get(round)
    }

    fn put(&self, entity: Arc<T>, round: i64) {
        (**self).put(entity, round)
    }

    fn get_latest(&self) -> Option<Arc<T>> {
        (**self).get_latest()
    }

    fn find_round_index(&self, round: i64) -> Option<usize> {
        (**self).find_round_index(round)
    }

    fn count(&self) -> usize {
        (**self).count()
    }

    fn get_rounds(&self) -> Vec<i64> {
        (**self).get_rounds()
    }

    fn get_round(&self, index: usize) -> i64 {
        (**self).get_round(index)
    }

    fn prune(&self, round: i64) -> Result<()> {
        (**self).prune(round)
    }
}

#[derive(Debug)]
struct Entries<T> {
    /// Stored rounds, ascending and distinct.
    rounds: Vec<i64>,
    items: HashMap<i64, Arc<T>>,
    max: Option<i64>,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self {
            rounds: Vec::new(),
            items: HashMap::new(),
            max: None,
        }
    }
}

impl<T> Entries<T> {
    fn floor_index(&self, round: i64) -> Option<usize> {
        let max = self.max?;
        let round = round.min(max);
        // number of stored rounds <= round
        let upper = self.rounds.partition_point(|r| *r <= round);
        upper.checked_sub(1)
    }
}

/// In-memory [`RoundStorage`] guarded by a single read/write lock.
#[derive(Debug)]
pub struct RoundStartingStorage<T> {
    entries: RwLock<Entries<T>>,
}

impl<T> Default for RoundStartingStorage<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }
}

impl<T> RoundStartingStorage<T> {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Send + Sync> RoundStorage<T> for RoundStartingStorage<T> {
    fn get(&self, round: i64) -> Option<Arc<T>> {
        let entries = self.entries.read();
        let index = entries.floor_index(round)?;
        entries.items.get(&entries.rounds[index]).cloned()
    }

    fn put(&self, entity: Arc<T>, round: i64) {
        let mut entries = self.entries.write();
        if entries.items.insert(round, entity).is_none() {
            let pos = entries.rounds.partition_point(|r| *r < round);
            entries.rounds.insert(pos, round);
        }
        if entries.max.map_or(true, |max| round > max) {
            entries.max = Some(round);
        }
    }

    fn get_latest(&self) -> Option<Arc<T>> {
        let entries = self.entries.read();
        let max = entries.max?;
        entries.items.get(&max).cloned()
    }

    fn find_round_index(&self, round: i64) -> Option<usize> {
        self.entries.read().floor_index(round)
    }

    fn count(&self) -> usize {
        self.entries.read().rounds.len()
    }

    fn get_rounds(&self) -> Vec<i64> {
        self.entries.read().rounds.clone()
    }

    fn get_round(&self, index: usize) -> i64 {
        self.entries.read().rounds[index]
    }

    fn prune(&self, round: i64) -> Result<()> {
        let mut entries = self.entries.write();
        let Ok(index) = entries.rounds.binary_search(&round) else {
            return Err(RoundError::EntityNotFound(round));
        };

        let removed: Vec<i64> = entries.rounds.drain(..=index).collect();
        for r in &removed {
            entries.items.remove(r);
        }
        entries.max = entries.rounds.last().copied();
        tracing::debug!(round, removed = removed.len(), remaining = entries.rounds.len(), "pruned round storage");
        Ok(())
    }
}

/// Prunes `storage` so that only the newest `keep` rounds remain.
///
/// Returns the round pruned at, or `None` when there was nothing to prune
/// or `keep` is 0.
pub fn prune_round_storage<T, S>(storage: &S, keep: usize) -> Result<Option<i64>>
where
    S: RoundStorage<T> + ?Sized,
{
    if keep == 0 {
        return Ok(None);
    }
    let rounds = storage.get_rounds();
    if rounds.len() <= keep {
        return Ok(None);
    }

    let target = rounds[rounds.len() - keep - 1];
    if let Err(e) = storage.prune(target) {
        tracing::error!(round = target, error = %e, "failed to prune round storage");
        return Err(e);
    }
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario() -> RoundStartingStorage<&'static str> {
        let storage = RoundStartingStorage::new();
        storage.put(Arc::new("E1"), 5);
        storage.put(Arc::new("E2"), 51);
        storage.put(Arc::new("E3"), 151);
        storage.put(Arc::new("E4"), 251);
        storage
    }

    fn get(storage: &RoundStartingStorage<&'static str>, round: i64) -> Option<&'static str> {
        storage.get(round).map(|e| *e)
    }

    #[test]
    fn test_floor_lookup() {
        let storage = scenario();
        assert_eq!(get(&storage, 0), None);
        assert_eq!(get(&storage, -1), None);
        assert_eq!(get(&storage, 5), Some("E1"));
        assert_eq!(get(&storage, 50), Some("E1"));
        assert_eq!(get(&storage, 51), Some("E2"));
        assert_eq!(get(&storage, 250), Some("E3"));
        assert_eq!(get(&storage, 1000), Some("E4"));
        assert_eq!(storage.get_latest().map(|e| *e), Some("E4"));
    }

    #[test]
    fn test_prune() {
        let storage = scenario();
        storage.prune(51).unwrap();

        assert_eq!(get(&storage, 5), None);
        assert_eq!(get(&storage, 51), None);
        assert_eq!(get(&storage, 151), Some("E3"));
        assert_eq!(storage.count(), 2);
        assert_eq!(storage.get_rounds(), vec![151, 251]);
    }

    #[test]
    fn test_prune_unknown_round() {
        let storage = scenario();
        assert!(matches!(
            storage.prune(52),
            Err(RoundError::EntityNotFound(52))
        ));
        assert_eq!(storage.count(), 4);
    }

    #[test]
    fn test_prune_everything_clears_max() {
        let storage = scenario();
        storage.prune(251).unwrap();
        assert_eq!(storage.count(), 0);
        assert!(storage.get_latest().is_none());
        assert_eq!(get(&storage, 1000), None);
    }

    #[test]
    fn test_empty() {
        let storage: RoundStartingStorage<u32> = RoundStartingStorage::new();
        assert!(storage.get(10).is_none());
        assert!(storage.get_latest().is_none());
        assert_eq!(storage.find_round_index(10), None);
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn test_put_overwrites() {
        let storage = scenario();
        storage.put(Arc::new("E2b"), 51);
        assert_eq!(storage.count(), 4);
        assert_eq!(get(&storage, 100), Some("E2b"));
    }

    #[test]
    fn test_put_out_of_order() {
        let storage = RoundStartingStorage::new();
        storage.put(Arc::new(3u32), 30);
        storage.put(Arc::new(1u32), 10);
        storage.put(Arc::new(2u32), 20);

        assert_eq!(storage.get_rounds(), vec![10, 20, 30]);
        assert_eq!(storage.get_round(1), 20);
        assert_eq!(storage.find_round_index(25), Some(1));
        assert_eq!(storage.get_latest().map(|e| *e), Some(3));
    }

    #[test]
    #[should_panic]
    fn test_get_round_out_of_range() {
        scenario().get_round(4);
    }

    #[test]
    fn test_prune_round_storage_keeps_tail() {
        let storage = RoundStartingStorage::new();
        for r in 1..=8 {
            storage.put(Arc::new(r), r);
        }

        assert_eq!(prune_round_storage(&storage, 5).unwrap(), Some(3));
        assert_eq!(storage.get_rounds(), vec![4, 5, 6, 7, 8]);

        assert_eq!(prune_round_storage(&storage, 5).unwrap(), None);
        assert_eq!(prune_round_storage(&storage, 0).unwrap(), None);
    }

    proptest! {
        /// Property: get() returns the entry of the greatest stored round <= r
        #[test]
        fn prop_floor_semantics(
            rounds in prop::collection::btree_set(-50i64..500, 1..20),
            probe in -100i64..700,
        ) {
            let storage = RoundStartingStorage::new();
            for r in &rounds {
                storage.put(Arc::new(*r), *r);
            }

            let max = *rounds.iter().next_back().unwrap();
            let expected = rounds.range(..=probe.min(max)).next_back().copied();
            prop_assert_eq!(storage.get(probe).map(|e| *e), expected);
            prop_assert_eq!(storage.get_rounds(), rounds.iter().copied().collect::<Vec<_>>());
        }

        /// Property: prune(r) leaves exactly the rounds above r
        #[test]
        fn prop_prune_removes_prefix(
            rounds in prop::collection::btree_set(0i64..1000, 1..30),
            pick in any::<prop::sample::Index>(),
        ) {
            let storage = RoundStartingStorage::new();
            for r in &rounds {
                storage.put(Arc::new(*r), *r);
            }
            let all: Vec<i64> = rounds.iter().copied().collect();
            let target = all[pick.index(all.len())];

            storage.prune(target).unwrap();
            let expected: Vec<i64> = all.into_iter().filter(|r| *r > target).collect();
            prop_assert_eq!(storage.get_latest().map(|e| *e), expected.last().copied());
            prop_assert_eq!(storage.get_rounds(), expected);
        }
    }
}
