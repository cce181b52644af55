#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rondo_round::Round;
use rondo_types::{Block, VerificationTicket};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
struct Input {
    hash: u8,
    rank: i8,
    weight: u16,
    verifier: u8,
    notarize: bool,
}

fuzz_target!(|inputs: Vec<Input>| {
    let round = Round::new(1);

    for input in inputs {
        let block = Block::new(format!("{:02x}", input.hash % 32), 1)
            .with_round_rank(input.rank as i64)
            .with_chain_weight(input.weight as u64)
            .with_tickets(vec![VerificationTicket::new(format!("v{}", input.verifier), "sig")]);
        if input.notarize {
            round.add_notarized_block(Arc::new(block));
        } else {
            round.add_proposed_block(Arc::new(block));
        }
    }

    let notarized = round.notarized_blocks();
    let hashes: HashSet<_> = notarized.iter().map(|b| b.hash.as_str()).collect();
    let ranks: HashSet<_> = notarized.iter().map(|b| b.round_rank).collect();
    assert_eq!(hashes.len(), notarized.len());
    assert_eq!(ranks.len(), notarized.len());
    assert!(notarized.windows(2).all(|w| w[0].chain_weight >= w[1].chain_weight));

    let proposed = round.proposed_blocks();
    assert!(proposed.windows(2).all(|w| {
        let key = |b: &Block| (b.round_rank < 0, b.round_rank);
        key(&*w[0]) <= key(&*w[1])
    }));
});
