//! Channel simulation.
//!
//! This module contains the simulation of an AWGN channel with BPSK
//! modulation.

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// AWGN channel simulation.
///
/// This struct is used to add AWGN to symbols.
#[derive(Debug, Clone)]
pub struct AwgnChannel {
    distr: Normal<f64>,
    noise_sigma: f64,
}

impl AwgnChannel {
    /// Creates a new AWGN channel.
    ///
    /// The channel noise follows a (real) normal distribution with mean zero
    /// and standard deviation sigma.
    ///
    /// # Panics
    ///
    /// This function panics if `noise_sigma` is not a positive finite number.
    pub fn new(noise_sigma: f64) -> AwgnChannel {
        assert!(noise_sigma >= 0.0);
        AwgnChannel {
            distr: Normal::new(0.0, noise_sigma).unwrap(),
            noise_sigma,
        }
    }

    /// Returns the standard deviation of the noise.
    pub fn noise_sigma(&self) -> f64 {
        self.noise_sigma
    }

    /// Adds noise to a sequence of symbols.
    ///
    /// The noise is added in-place to the slice `symbols`. An [Rng] is used as
    /// source of randomness.
    pub fn add_noise<R: Rng>(&self, rng: &mut R, symbols: &mut [f64]) {
        for x in symbols.iter_mut() {
            *x += self.distr.sample(rng);
        }
    }

    /// Simulates the transmission of the all-zero codeword.
    ///
    /// Each bit is BPSK modulated as the symbol `+1`, the channel noise is
    /// added, and the LLRs `2y / sigma^2` of the received symbols `y` are
    /// returned.
    pub fn all_zero_llrs<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        let mut symbols = vec![1.0; n];
        self.add_noise(rng, &mut symbols);
        let scale = 2.0 / (self.noise_sigma * self.noise_sigma);
        symbols.iter().map(|&y| scale * y).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::frame_rng;

    #[test]
    fn build_awgn() {
        let _channel = AwgnChannel::new(0.2);
    }

    #[test]
    #[should_panic]
    fn negative_noise_sigma() {
        let _channel = AwgnChannel::new(-3.5);
    }

    #[test]
    fn zero_noise_sigma() {
        let channel = AwgnChannel::new(0.0);
        let mut rng = rand::thread_rng();
        let mut symbols = vec![1.0; 1024];
        let symbols_orig = symbols.clone();
        channel.add_noise(&mut rng, &mut symbols);
        assert_eq!(&symbols, &symbols_orig);
    }

    #[test]
    fn all_zero_llrs() {
        let channel = AwgnChannel::new(0.5);
        let llrs = channel.all_zero_llrs(&mut frame_rng(0, 0), 10000);
        assert_eq!(llrs.len(), 10000);
        // mean 2 / sigma^2 = 8
        let mean = llrs.iter().sum::<f64>() / llrs.len() as f64;
        assert!((mean - 8.0).abs() < 0.2);
        assert_eq!(llrs, channel.all_zero_llrs(&mut frame_rng(0, 0), 10000));
    }
}
