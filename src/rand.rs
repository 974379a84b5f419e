//! # Reproducible random functions
//!
//! This module uses the [`ChaCha8Rng`] RNG from the [rand_chacha] crate
//! to achieve reproducible random number generation.
//!
//! Simulations decode frames in parallel, so each frame draws its noise from
//! its own stream of the generator. The result of a simulation then depends
//! only on the seed and not on how frames are scheduled on threads.
//!
//! # Examples
//! ```
//! # use ldpc_hwdec::rand::*;
//! let mut a = frame_rng(42, 7);
//! let mut b = frame_rng(42, 7);
//! assert_eq!(a.next_u64(), b.next_u64());
//! ```
use rand_chacha::ChaCha8Rng;
pub use rand_chacha::rand_core::SeedableRng;
pub use rand_core::RngCore;

/// The RNG used in throughout this crate for algorithms using pseudorandom
/// generation.
pub type Rng = ChaCha8Rng;

/// Returns the RNG for a frame of a simulation.
///
/// All the frames of a simulation share the `seed`, and each frame uses the
/// stream given by its number.
pub fn frame_rng(seed: u64, frame: u64) -> Rng {
    let mut rng = Rng::seed_from_u64(seed);
    rng.set_stream(frame);
    rng
}
