#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rondo_round::{RoundStartingStorage, RoundStorage};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
enum Op {
    Put(i16, u32),
    Get(i16),
    Prune(i16),
    PruneTail(u8),
}

fuzz_target!(|ops: Vec<Op>| {
    let storage: RoundStartingStorage<u32> = RoundStartingStorage::new();
    // Reference model
    let mut model: BTreeMap<i64, u32> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Put(round, value) => {
                storage.put(Arc::new(value), round as i64);
                model.insert(round as i64, value);
            }
            Op::Get(round) => {
                let round = round as i64;
                let expected = match model.keys().next_back() {
                    Some(max) => model.range(..=round.min(*max)).next_back().map(|(_, v)| *v),
                    None => None,
                };
                assert_eq!(storage.get(round).map(|v| *v), expected);
            }
            Op::Prune(round) => {
                let round = round as i64;
                let result = storage.prune(round);
                if model.contains_key(&round) {
                    assert!(result.is_ok());
                    model = model.split_off(&(round + 1));
                } else {
                    assert!(result.is_err());
                }
            }
            Op::PruneTail(keep) => {
                let _ = rondo_round::prune_round_storage(&storage, keep as usize % 8);
                model = storage
                    .get_rounds()
                    .into_iter()
                    .filter_map(|r| model.get(&r).map(|v| (r, *v)))
                    .collect();
            }
        }

        assert_eq!(storage.count(), model.len());
        assert_eq!(storage.get_rounds(), model.keys().copied().collect::<Vec<_>>());
        assert_eq!(
            storage.get_latest().map(|v| *v),
            model.values().next_back().copied()
        );
    }
});
