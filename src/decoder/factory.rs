//! LDPC decoder factory.
//!
//! This module contains routines to build an LDPC decoder generically over the
//! arithmetic implementation. Such decoders are represented by `Box<dyn
//! LdpcDecoder>`, using the trait [`LdpcDecoder`].

use super::{
    arithmetic::{DecoderArithmetic, FixedPoint, FloatingPoint},
    config::DecoderConfig,
    router::RoutingTables,
    schedule::Schedule,
    Decoder, DecoderOutput, Error,
};
use clap::ValueEnum;

/// Generic LDPC decoder.
///
/// This trait is used to form LDPC decoder trait objects, abstracting over the
/// implementation of the decoder arithmetic.
pub trait LdpcDecoder: std::fmt::Debug + Send {
    /// Decodes a codeword.
    ///
    /// The parameters are the LLRs for the received codeword and the maximum
    /// number of iterations to perform. If decoding is successful, the function
    /// returns an `Ok` containing the (hard decision) on the decoded codeword
    /// and the number of iterations used in decoding. If decoding is not
    /// successful, the function returns an `Err` containing the hard decision
    /// on the final decoder LLRs (which still has some bit errors) and the
    /// number of iterations used in decoding (which is equal to
    /// `max_iterations`).
    fn decode(
        &mut self,
        llrs: &[f64],
        max_iterations: usize,
    ) -> Result<DecoderOutput, DecoderOutput>;
}

impl<A: DecoderArithmetic> LdpcDecoder for Decoder<A> {
    fn decode(
        &mut self,
        llrs: &[f64],
        max_iterations: usize,
    ) -> Result<DecoderOutput, DecoderOutput> {
        Decoder::decode(self, llrs, max_iterations)
    }
}

/// LDPC decoder factory.
///
/// This trait is implemented by types that can build LDPC decoders.
pub trait DecoderFactory:
    std::fmt::Debug + std::fmt::Display + Clone + Sync + Send + 'static
{
    /// Builds an LDPC decoder.
    ///
    /// Given the decoder configuration, the routing tables and the schedule,
    /// this function builds an LDPC decoder.
    fn build_decoder(
        &self,
        config: DecoderConfig,
        tables: RoutingTables,
        schedule: Schedule,
    ) -> Result<Box<dyn LdpcDecoder>, Error>;
}

/// LDPC decoder implementation.
///
/// This enum lists the LDPC decoder implementations corresponding to different
/// arithmetic rules.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, ValueEnum)]
#[clap(rename_all = "verbatim")]
pub enum DecoderImplementation {
    /// The [`FixedPoint`] implementation, reproducing the hardware datapath.
    FixedPoint,
    /// The [`FloatingPoint`] implementation, using `f64` without saturation.
    FloatingPoint,
}

impl DecoderFactory for DecoderImplementation {
    fn build_decoder(
        &self,
        config: DecoderConfig,
        tables: RoutingTables,
        schedule: Schedule,
    ) -> Result<Box<dyn LdpcDecoder>, Error> {
        Ok(match self {
            DecoderImplementation::FixedPoint => Box::new(Decoder::<FixedPoint>::new(
                config, tables, schedule,
            )?),
            DecoderImplementation::FloatingPoint => Box::new(
                Decoder::<FloatingPoint>::new(config, tables, schedule)?,
            ),
        })
    }
}

impl std::str::FromStr for DecoderImplementation {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "FixedPoint" => DecoderImplementation::FixedPoint,
            "FloatingPoint" => DecoderImplementation::FloatingPoint,
            _ => return Err("invalid decoder implementation"),
        })
    }
}

impl std::fmt::Display for DecoderImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                DecoderImplementation::FixedPoint => "FixedPoint",
                DecoderImplementation::FloatingPoint => "FloatingPoint",
            }
        )
    }
}
