#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use rondo_round::{Round, RoundConfig, RoundRecord, TimeoutVoteMessage, VrfShare, VrfShareMessage};
use rondo_storage::{EntityStore, MemoryStore, Repository};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let store = Arc::new(MemoryStore::new());
    store.write("1", Bytes::copy_from_slice(data)).unwrap();

    // Decoding arbitrary bytes must fail cleanly, never panic
    let rounds: Repository<RoundRecord> = Repository::new(store.clone());
    if let Ok(record) = rounds.read("1") {
        let round = Round::from_record(record.clone(), &RoundConfig::default());
        assert_eq!(round.to_record().number, record.number);
        assert_eq!(round.state(), record.state);
    }

    let shares: Repository<VrfShare> = Repository::new(store);
    let _ = shares.read("1");

    let _ = serde_json::from_slice::<VrfShareMessage>(data).map(|m| m.signing_hash());
    let _ = serde_json::from_slice::<TimeoutVoteMessage>(data).map(|m| m.signing_hash());
});
