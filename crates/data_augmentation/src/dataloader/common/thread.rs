//! Thread-local worker identity and random number generation.
//!
//! Every random augmentation draws from `WORKER_RNG`. The DataLoader seeds it
//! per worker and per epoch, so a fixed seed reproduces the exact same
//! augmented batches. Outside a DataLoader the generator is seeded lazily
//! from the thread RNG.

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// Worker index (0 to num_workers-1). The main thread reports 0.
    pub static WORKER_ID: RefCell<usize> = const { RefCell::new(0) };

    /// Deterministic RNG for augmentations running on this thread.
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Seeds this thread's RNG from `(worker_id, epoch, base_seed)`.
/// Seed formula: base_seed + (epoch << 32) + worker_id
pub fn init_worker_rng(worker_id: usize, epoch: usize, base_seed: u64) {
    WORKER_RNG.with(|rng| {
        let seed = base_seed
            .wrapping_add((epoch as u64) << 32)
            .wrapping_add(worker_id as u64);
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Runs `f` with this thread's RNG, seeding it from the thread RNG on first use.
///
/// `f` must not call back into any `worker_*` helper: the generator is
/// mutably borrowed for the duration of the call.
pub fn with_worker_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    WORKER_RNG.with(|rng| {
        let mut slot = rng.borrow_mut();
        let rng = slot.get_or_insert_with(|| StdRng::from_rng(&mut rand::rng()));
        f(rng)
    })
}

/// Bernoulli draw with probability `p`. `p` must lie in [0.0, 1.0].
pub fn worker_gen_bool(p: f64) -> bool {
    with_worker_rng(|rng| rng.random_bool(p))
}

/// Uniform draw from `range`. The range must be non-empty.
pub fn worker_gen_range<T, R>(range: R) -> T
where
    T: SampleUniform,
    R: SampleRange<T>,
{
    with_worker_rng(|rng| rng.random_range(range))
}
