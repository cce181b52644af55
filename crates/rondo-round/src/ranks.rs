//! Miner rank permutation.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Computes a random permutation of `0..miners` seeded by the round seed.
///
/// `perm[set_index]` is the rank of the miner at `set_index`. The same
/// seed and miner count always produce the same permutation on every node.
pub fn compute_miner_ranks(seed: i64, miners: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    let mut perm: Vec<usize> = (0..miners).collect();
    perm.shuffle(&mut rng);
    perm
}
