//! LDPC decoder arithmetic.
//!
//! This module contains the trait [`DecoderArithmetic`], which defines the
//! numeric primitives used by the hardware-compliant decoder, and the two
//! implementors of that trait. The decoder [`Decoder`](super::Decoder) and the
//! check node algorithms in [`check_node`](super::check_node) are generic over
//! `DecoderArithmetic`, so the same algorithm code is monomorphized once for
//! the bit-exact integer datapath ([`FixedPoint`]) and once for a floating
//! point reference model without quantization artifacts ([`FloatingPoint`]).
//!
//! # References
//!
//! The min* correction follows:
//!
//! [1] C. Jones, et al. “Approximate-MIN* Constraint Node Updating for LDPC
//! Code Decoding.” In Proceedings of MILCOM 2003 (Boston, Massachusetts),
//! 1-157-1-162. Piscataway, NJ: IEEE, October 2003.
//!
//! The extrinsic scaling and the lambda-min rule are described in:
//!
//! [2] F. Guilloud, E. Boutillon, J.-L. Danger. “λ-Min Decoding Algorithm of
//! Regular and Irregular LDPC Codes.” 3rd International Symposium on Turbo
//! Codes and Related Topics, 2003.

use super::Error;
use enum_iterator::Sequence;
use num_traits::Signed;
use std::ops::Mul;

/// Sign of a message.
///
/// Check node algorithms work on a signed-magnitude representation. A value
/// greater or equal than zero has a positive sign, so that zero never flips
/// the parity of a check node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Sign {
    /// Positive sign (`+1`).
    #[default]
    Positive,
    /// Negative sign (`-1`).
    Negative,
}

impl Sign {
    /// Returns the sign of a value.
    pub fn of<T: Signed + PartialOrd>(x: T) -> Sign {
        if x < T::zero() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    /// Multiplies a value by this sign.
    pub fn apply<T: Signed>(self, x: T) -> T {
        match self {
            Sign::Positive => x,
            Sign::Negative => -x,
        }
    }

    /// Returns `true` if the sign is negative.
    pub fn is_negative(self) -> bool {
        self == Sign::Negative
    }
}

impl Mul for Sign {
    type Output = Sign;

    fn mul(self, rhs: Sign) -> Sign {
        if self == rhs {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }
}

impl std::iter::Product for Sign {
    fn product<I: Iterator<Item = Sign>>(iter: I) -> Sign {
        iter.fold(Sign::Positive, |acc, s| acc * s)
    }
}

/// Extrinsic scale factor.
///
/// Sub-unity scaling applied to min-sum style check node outputs. The fixed
/// point datapath implements each factor with a shift-and-add multiplier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Sequence)]
pub enum ExtrinsicScale {
    /// Scaling by 0.875.
    SevenEighths,
    /// Scaling by 0.75.
    ThreeQuarters,
}

impl ExtrinsicScale {
    /// Returns the scale factor as a real number.
    pub fn factor(self) -> f64 {
        match self {
            ExtrinsicScale::SevenEighths => 0.875,
            ExtrinsicScale::ThreeQuarters => 0.75,
        }
    }
}

impl TryFrom<f64> for ExtrinsicScale {
    type Error = Error;

    fn try_from(factor: f64) -> Result<ExtrinsicScale, Error> {
        enum_iterator::all::<ExtrinsicScale>()
            .find(|s| s.factor() == factor)
            .ok_or(Error::ExtrinsicScale(factor))
    }
}

impl std::fmt::Display for ExtrinsicScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.factor())
    }
}

/// Quantization parameters.
///
/// All bounds are given in integer units of the fixed point datapath, which
/// has `fractional_bits` bits after the binary point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Quantization {
    /// Number of fractional bits.
    pub fractional_bits: u32,
    /// Largest magnitude of an extrinsic (check node) message.
    ///
    /// Check node inputs are saturated symmetrically to this value, and it is
    /// the neutral element inserted for unconnected edges.
    pub extrinsic_max: i32,
    /// Largest APP value.
    ///
    /// APP values are saturated to the two's complement range
    /// `-app_max - 1..=app_max`.
    pub app_max: i32,
}

impl Quantization {
    /// Quantization of a hardware decoder with 6-bit messages, 8-bit APP
    /// values and 2 fractional bits.
    pub fn six_bit() -> Quantization {
        Quantization {
            fractional_bits: 2,
            extrinsic_max: 31,
            app_max: 127,
        }
    }
}

/// LDPC decoder arithmetic.
///
/// This trait is the capability set over which the check node algorithms and
/// the memory write-back are generic: saturation, extrinsic scaling and the
/// min* correction term, together with the conversion of channel LLRs into
/// the internal representation.
///
/// The methods depend on `&self` so that the arithmetic object can hold the
/// quantization parameters.
pub trait DecoderArithmetic: std::fmt::Debug + Clone + Send + Sync {
    /// Value.
    ///
    /// Defines the type used to represent LLRs and messages.
    type Value: Signed + PartialOrd + Copy + Default + std::fmt::Debug + Send + Sync;

    /// Creates the arithmetic object for some quantization parameters.
    fn new(quantization: &Quantization) -> Self;

    /// Quantization function for input LLRs.
    ///
    /// Defines how the channel LLRs (the input to the decoder) are quantized
    /// and represented internally as a [`Self::Value`].
    fn quantize(&self, llr: f64) -> Self::Value;

    /// Converts a value back into a real LLR.
    fn to_f64(&self, value: Self::Value) -> f64;

    /// Converts an integer given in fixed point units into a value.
    ///
    /// This is used for configured thresholds and bounds.
    fn from_quantized(&self, quantized: i32) -> Self::Value;

    /// Returns the largest extrinsic message magnitude.
    fn extrinsic_max(&self) -> Self::Value;

    /// Returns the APP saturation range as `(min, max)`.
    fn app_range(&self) -> (Self::Value, Self::Value);

    /// Symmetric saturation to `[-max, max]`.
    fn saturate(&self, value: Self::Value, max: Self::Value) -> Self::Value;

    /// Asymmetric saturation to `[min, max]`.
    fn saturate_range(&self, value: Self::Value, min: Self::Value, max: Self::Value)
        -> Self::Value;

    /// Multiplies a magnitude by the extrinsic scale factor.
    fn scale_extrinsic(&self, magnitude: Self::Value, scale: ExtrinsicScale) -> Self::Value;

    /// Correction term of the min* function.
    ///
    /// Approximates `ln(1 + exp(-x))`.
    fn delta(&self, x: Self::Value) -> Self::Value;

    /// Saturation of an APP value.
    fn saturate_app(&self, value: Self::Value) -> Self::Value {
        let (min, max) = self.app_range();
        self.saturate_range(value, min, max)
    }

    /// min* of two magnitudes.
    ///
    /// Computes `min(a, b) - delta(|a - b|) + delta(a + b)`, which is the
    /// magnitude of the exact check node combination of two messages.
    fn minstar(&self, a: Self::Value, b: Self::Value) -> Self::Value {
        let min = if a < b { a } else { b };
        min - self.delta((a - b).abs()) + self.delta(a + b)
    }
}

/// Fixed point arithmetic.
///
/// This is a [`DecoderArithmetic`] that uses `i32` to represent LLRs and
/// messages and reproduces the integer datapath of the hardware decoder,
/// including its rounding.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FixedPoint {
    fractional_bits: u32,
    extrinsic_max: i32,
    app_max: i32,
}

impl DecoderArithmetic for FixedPoint {
    type Value = i32;

    fn new(quantization: &Quantization) -> FixedPoint {
        FixedPoint {
            fractional_bits: quantization.fractional_bits,
            extrinsic_max: quantization.extrinsic_max,
            app_max: quantization.app_max,
        }
    }

    fn quantize(&self, llr: f64) -> i32 {
        let x = (llr * f64::from(1u32 << self.fractional_bits)).round();
        let (min, max) = self.app_range();
        if x >= f64::from(max) {
            max
        } else if x <= f64::from(min) {
            min
        } else {
            x as i32
        }
    }

    fn to_f64(&self, value: i32) -> f64 {
        f64::from(value) / f64::from(1u32 << self.fractional_bits)
    }

    fn from_quantized(&self, quantized: i32) -> i32 {
        quantized
    }

    fn extrinsic_max(&self) -> i32 {
        self.extrinsic_max
    }

    fn app_range(&self) -> (i32, i32) {
        (-self.app_max - 1, self.app_max)
    }

    fn saturate(&self, value: i32, max: i32) -> i32 {
        value.clamp(-max, max)
    }

    fn saturate_range(&self, value: i32, min: i32, max: i32) -> i32 {
        value.clamp(min, max)
    }

    fn scale_extrinsic(&self, magnitude: i32, scale: ExtrinsicScale) -> i32 {
        let m = magnitude;
        match scale {
            ExtrinsicScale::SevenEighths => ((m << 1) + m + (m >> 1) + 1) >> 2,
            ExtrinsicScale::ThreeQuarters => ((m << 1) + m + 1) >> 2,
        }
    }

    fn delta(&self, x: i32) -> i32 {
        if self.fractional_bits == 2 {
            // Lookup table of the hardware
            if x < 4 {
                2
            } else if x < 8 {
                1
            } else {
                0
            }
        } else {
            // 5 * 2^(f - 1), also valid for f = 0
            let offset = (5 << (self.fractional_bits + 2)) >> 3;
            ((offset - x) >> 2).max(0)
        }
    }
}

/// Floating point arithmetic.
///
/// This is a [`DecoderArithmetic`] that uses `f64` to represent LLRs and
/// messages. Saturation is a no-op, extrinsic scaling is an exact product and
/// the min* correction is computed exactly, so this serves as a reference
/// model of the fixed point decoder. Configured bounds and thresholds are
/// converted from fixed point units into real LLR units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingPoint {
    step: f64,
    extrinsic_max: f64,
    app_max: f64,
}

impl DecoderArithmetic for FloatingPoint {
    type Value = f64;

    fn new(quantization: &Quantization) -> FloatingPoint {
        let step = 1.0 / f64::from(1u32 << quantization.fractional_bits);
        FloatingPoint {
            step,
            extrinsic_max: f64::from(quantization.extrinsic_max) * step,
            app_max: f64::from(quantization.app_max) * step,
        }
    }

    fn quantize(&self, llr: f64) -> f64 {
        llr
    }

    fn to_f64(&self, value: f64) -> f64 {
        value
    }

    fn from_quantized(&self, quantized: i32) -> f64 {
        f64::from(quantized) * self.step
    }

    fn extrinsic_max(&self) -> f64 {
        self.extrinsic_max
    }

    fn app_range(&self) -> (f64, f64) {
        (-self.app_max - self.step, self.app_max)
    }

    fn saturate(&self, value: f64, _max: f64) -> f64 {
        value
    }

    fn saturate_range(&self, value: f64, _min: f64, _max: f64) -> f64 {
        value
    }

    fn scale_extrinsic(&self, magnitude: f64, scale: ExtrinsicScale) -> f64 {
        magnitude * scale.factor()
    }

    fn delta(&self, x: f64) -> f64 {
        (-x).exp().ln_1p()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_eq::assert_float_eq;

    fn fixed(fractional_bits: u32) -> FixedPoint {
        FixedPoint::new(&Quantization {
            fractional_bits,
            extrinsic_max: 31,
            app_max: 127,
        })
    }

    #[test]
    fn sign_algebra() {
        use Sign::*;
        assert_eq!(Positive * Positive, Positive);
        assert_eq!(Positive * Negative, Negative);
        assert_eq!(Negative * Negative, Positive);
        assert_eq!([Negative, Negative, Negative].into_iter().product::<Sign>(), Negative);
        assert_eq!(Sign::of(0), Positive);
        assert_eq!(Sign::of(-0.5), Negative);
        assert_eq!(Negative.apply(3), -3);
    }

    #[test]
    fn extrinsic_scale_from_factor() {
        assert_eq!(
            ExtrinsicScale::try_from(0.875).unwrap(),
            ExtrinsicScale::SevenEighths
        );
        assert_eq!(
            ExtrinsicScale::try_from(0.75).unwrap(),
            ExtrinsicScale::ThreeQuarters
        );
        assert_eq!(
            ExtrinsicScale::try_from(0.5),
            Err(Error::ExtrinsicScale(0.5))
        );
    }

    #[test]
    fn scale_matches_float() {
        let a = fixed(2);
        for scale in enum_iterator::all::<ExtrinsicScale>() {
            for m in 0..512 {
                let x = a.scale_extrinsic(m, scale);
                let y = f64::from(m) * scale.factor();
                assert!(
                    (f64::from(x) - y).abs() < 1.0,
                    "scale {scale} of {m}: fixed {x}, float {y}"
                );
            }
        }
    }

    #[test]
    fn scale_hardware_rounding() {
        let a = fixed(2);
        assert_eq!(a.scale_extrinsic(1, ExtrinsicScale::SevenEighths), 1);
        assert_eq!(a.scale_extrinsic(3, ExtrinsicScale::SevenEighths), 2);
        assert_eq!(a.scale_extrinsic(4, ExtrinsicScale::SevenEighths), 3);
        assert_eq!(a.scale_extrinsic(8, ExtrinsicScale::SevenEighths), 7);
        assert_eq!(a.scale_extrinsic(1, ExtrinsicScale::ThreeQuarters), 1);
        assert_eq!(a.scale_extrinsic(2, ExtrinsicScale::ThreeQuarters), 1);
        assert_eq!(a.scale_extrinsic(8, ExtrinsicScale::ThreeQuarters), 6);
    }

    #[test]
    fn saturation() {
        let a = fixed(2);
        assert_eq!(a.saturate(40, 31), 31);
        assert_eq!(a.saturate(-40, 31), -31);
        assert_eq!(a.saturate(-12, 31), -12);
        assert_eq!(a.saturate_app(200), 127);
        assert_eq!(a.saturate_app(-200), -128);
        let f = FloatingPoint::new(&Quantization::six_bit());
        assert_eq!(f.saturate(1e6, f.extrinsic_max()), 1e6);
        assert_eq!(f.saturate_app(-1e6), -1e6);
    }

    #[test]
    fn delta_lookup_two_fractional_bits() {
        let a = fixed(2);
        let table: Vec<i32> = (0..10).map(|x| a.delta(x)).collect();
        assert_eq!(table, [2, 2, 2, 2, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn delta_generic_formula() {
        let a = fixed(3);
        assert_eq!(a.delta(0), 5);
        assert_eq!(a.delta(4), 4);
        assert_eq!(a.delta(19), 0);
        assert_eq!(a.delta(40), 0);
        let a = fixed(0);
        assert_eq!(a.delta(0), 0);
        let a = fixed(1);
        assert_eq!(a.delta(0), 1);
    }

    #[test]
    fn minstar_fixed() {
        let a = fixed(2);
        // min(5, 9) - delta(4) + delta(14)
        assert_eq!(a.minstar(5, 9), 4);
        assert_eq!(a.minstar(9, 5), 4);
        // min(20, 20) - delta(0) + delta(40)
        assert_eq!(a.minstar(20, 20), 18);
        assert_eq!(a.minstar(0, 12), 0);
    }

    #[test]
    fn minstar_float_is_exact_boxplus() {
        let a = FloatingPoint::new(&Quantization::six_bit());
        for &(x, y) in &[(0.5, 1.25), (2.0, 2.0), (3.5, 0.1), (7.0, 9.0)] {
            let exact = 2.0 * ((0.5f64 * x).tanh() * (0.5f64 * y).tanh()).atanh();
            assert_float_eq!(a.minstar(x, y), exact, abs <= 1e-12);
        }
    }

    #[test]
    fn quantize() {
        let a = fixed(2);
        assert_eq!(a.quantize(1.3), 5);
        assert_eq!(a.quantize(-0.6), -2);
        assert_eq!(a.quantize(100.0), 127);
        assert_eq!(a.quantize(-100.0), -128);
        assert_float_eq!(a.to_f64(-6), -1.5, abs <= 0.0);
        let f = FloatingPoint::new(&Quantization::six_bit());
        assert_float_eq!(f.extrinsic_max(), 7.75, abs <= 0.0);
        assert_float_eq!(f.from_quantized(6), 1.5, abs <= 0.0);
    }
}
