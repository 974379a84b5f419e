//! Decoder diagnostics.
//!
//! Read-only statistics that describe the progress of the decoder between
//! iterations.

use num_traits::Signed;

/// Checks the parity of a set of values.
///
/// Returns `true` if the number of negative values is even.
pub fn parity_satisfied<T: Signed + PartialOrd + Copy>(values: &[T]) -> bool {
    values.iter().filter(|&&x| x < T::zero()).count() % 2 == 0
}

/// Counts the systematic bits whose decision differs from the channel.
///
/// Only the first `num_systematic` bits are compared.
pub fn modified_systematic_bits<T: Signed + PartialOrd + Copy>(
    channel: &[T],
    bits: &[u8],
    num_systematic: usize,
) -> usize {
    channel
        .iter()
        .zip(bits)
        .take(num_systematic)
        .filter(|&(&llr, &bit)| u8::from(llr < T::zero()) != bit)
        .count()
}

/// Counts the bits whose decision changed between two iterations.
pub fn flipped_bits(previous: &[u8], current: &[u8]) -> usize {
    previous
        .iter()
        .zip(current)
        .filter(|(a, b)| a != b)
        .count()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parity() {
        assert!(parity_satisfied::<i32>(&[]));
        assert!(parity_satisfied(&[3, 0, 5]));
        assert!(!parity_satisfied(&[3, -1, 5]));
        assert!(parity_satisfied(&[-3, -1, 5]));
        assert!(!parity_satisfied(&[-0.5, 2.0]));
    }

    #[test]
    fn modified_systematic() {
        let channel = [4, -2, 0, -7, 3];
        let bits = [1, 1, 0, 0, 1];
        assert_eq!(modified_systematic_bits(&channel, &bits, 3), 1);
        assert_eq!(modified_systematic_bits(&channel, &bits, 5), 3);
    }

    #[test]
    fn flipped() {
        assert_eq!(flipped_bits(&[0, 1, 1, 0], &[0, 1, 1, 0]), 0);
        assert_eq!(flipped_bits(&[0, 1, 1, 0], &[1, 1, 0, 0]), 2);
    }
}
