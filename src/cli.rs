//! `ldpc-hwdec` CLI application
//!
//! The CLI application is organized in several subcommands. The
//! supported subcommands can be seen by running `ldpc-hwdec`.
//! See the modules below for examples and more information about
//! how to use each subcommand.
//!
//! Log messages are written to the standard error. Their verbosity is
//! controlled with the `RUST_LOG` environment variable (for instance,
//! `RUST_LOG=ldpc_hwdec=debug` prints a line per decoder iteration).

use crate::decoder::{
    arithmetic::{ExtrinsicScale, Quantization},
    check_node::{CheckNodeAlgorithm, SplitRowVariant},
    schedule::Schedule,
    Error as DecoderError,
};
use clap::{Parser, ValueEnum};
use std::error::Error;

pub mod ber;
pub mod tables;

/// Trait to run a CLI subcommand
pub trait Run {
    /// Run the CLI subcommand
    fn run(&self) -> Result<(), Box<dyn Error>>;
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    name = "ldpc-hwdec",
    about = "Hardware-compliant LDPC decoder"
)]
pub enum Args {
    /// ber subcommand
    Ber(ber::Args),
    /// tables subcommand
    Tables(tables::Args),
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        match self {
            Args::Ber(x) => x.run(),
            Args::Tables(x) => x.run(),
        }
    }
}

/// Check node algorithm selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum Algorithm {
    /// Scaled min-sum
    MinSum,
    /// Self-correcting scaled min-sum
    MinSumSelfCorrecting,
    /// Lambda-min (see --lambda)
    LambdaMin,
    /// Lambda-min with 3 minima and 3 output magnitudes
    #[value(name = "lambda-3min-3mag")]
    Lambda3Min3Mag,
    /// Split-row threshold
    SplitRowThreshold,
    /// Improved split-row threshold
    SplitRowImproved,
    /// Self-correcting split-row threshold
    SplitRowSelfCorrecting,
}

/// Schedule selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum ScheduleArg {
    /// Layered
    Layered,
    /// Superposed layered
    Superposed,
    /// Two-phase (flooding)
    TwoPhase,
}

/// Decoder CLI arguments.
///
/// These arguments are shared by the subcommands that build a decoder.
#[derive(Debug, Clone, clap::Args)]
pub struct DecoderArgs {
    /// Check node algorithm
    #[arg(long, value_enum, default_value_t = Algorithm::MinSum)]
    pub algorithm: Algorithm,
    /// Extrinsic scale factor (0.875 or 0.75)
    #[arg(long, default_value_t = 0.875)]
    pub esf: f64,
    /// Number of minima for lambda-min (2 or 3)
    #[arg(long, default_value_t = 3)]
    pub lambda: usize,
    /// Number of partitions for split-row
    #[arg(long, default_value_t = 2)]
    pub partitions: usize,
    /// Split-row threshold (fixed point units)
    #[arg(long, default_value_t = 8)]
    pub threshold: i32,
    /// Message passing schedule
    #[arg(long, value_enum, default_value_t = ScheduleArg::Layered)]
    pub schedule: ScheduleArg,
    /// Evaluate the two-phase parity checks on the APP values
    #[arg(long)]
    pub app_parity_check: bool,
    /// Number of fractional bits
    #[arg(long, default_value_t = 2)]
    pub fractional_bits: u32,
    /// Extrinsic message saturation bound (fixed point units)
    #[arg(long, default_value_t = 31)]
    pub extrinsic_max: i32,
    /// APP saturation bound (fixed point units)
    #[arg(long, default_value_t = 127)]
    pub app_max: i32,
}

impl DecoderArgs {
    /// Returns the check node algorithm.
    pub fn algorithm(&self) -> Result<CheckNodeAlgorithm, DecoderError> {
        let scale = ExtrinsicScale::try_from(self.esf)?;
        let split_row = |variant| CheckNodeAlgorithm::SplitRow {
            variant,
            scale,
            partitions: self.partitions,
            threshold: self.threshold,
        };
        Ok(match self.algorithm {
            Algorithm::MinSum => CheckNodeAlgorithm::MinSum { scale },
            Algorithm::MinSumSelfCorrecting => CheckNodeAlgorithm::MinSumSelfCorrecting { scale },
            Algorithm::LambdaMin => CheckNodeAlgorithm::LambdaMin {
                minima: self.lambda,
            },
            Algorithm::Lambda3Min3Mag => CheckNodeAlgorithm::Lambda3Min3Mag,
            Algorithm::SplitRowThreshold => split_row(SplitRowVariant::Threshold),
            Algorithm::SplitRowImproved => split_row(SplitRowVariant::Improved),
            Algorithm::SplitRowSelfCorrecting => split_row(SplitRowVariant::SelfCorrecting),
        })
    }

    /// Returns the message passing schedule.
    pub fn schedule(&self) -> Schedule {
        match self.schedule {
            ScheduleArg::Layered => Schedule::Layered,
            ScheduleArg::Superposed => Schedule::SuperposedLayered,
            ScheduleArg::TwoPhase => Schedule::TwoPhase {
                app_parity_check: self.app_parity_check,
            },
        }
    }

    /// Returns the quantization parameters.
    pub fn quantization(&self) -> Quantization {
        Quantization {
            fractional_bits: self.fractional_bits,
            extrinsic_max: self.extrinsic_max,
            app_max: self.app_max,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_ber() {
        let args = Args::try_parse_from([
            "ldpc-hwdec",
            "ber",
            "code.txt",
            "--lanes",
            "7",
            "--algorithm",
            "lambda-3min-3mag",
            "--schedule",
            "two-phase",
            "--app-parity-check",
            "--min-ebn0",
            "1",
            "--max-ebn0",
            "2",
            "--step-ebn0",
            "0.5",
        ])
        .unwrap();
        let Args::Ber(ber) = args else {
            panic!("wrong subcommand");
        };
        assert_eq!(
            ber.decoder_args.algorithm().unwrap(),
            CheckNodeAlgorithm::Lambda3Min3Mag
        );
        assert_eq!(
            ber.decoder_args.schedule(),
            Schedule::TwoPhase {
                app_parity_check: true
            }
        );
        assert_eq!(ber.decoder_args.quantization(), Quantization::six_bit());
    }

    #[test]
    fn split_row() {
        let args = Args::try_parse_from([
            "ldpc-hwdec",
            "tables",
            "code.txt",
            "--lanes",
            "4",
            "--algorithm",
            "split-row-improved",
            "--esf",
            "0.75",
            "--partitions",
            "3",
            "--threshold",
            "5",
        ])
        .unwrap();
        let Args::Tables(tables) = args else {
            panic!("wrong subcommand");
        };
        assert_eq!(
            tables.decoder_args.algorithm().unwrap(),
            CheckNodeAlgorithm::SplitRow {
                variant: SplitRowVariant::Improved,
                scale: ExtrinsicScale::ThreeQuarters,
                partitions: 3,
                threshold: 5,
            }
        );
        assert_eq!(tables.decoder_args.schedule(), Schedule::Layered);
    }

    #[test]
    fn invalid_esf() {
        let args = Args::try_parse_from([
            "ldpc-hwdec",
            "tables",
            "code.txt",
            "--lanes",
            "4",
            "--esf",
            "0.5",
        ])
        .unwrap();
        let Args::Tables(tables) = args else {
            panic!("wrong subcommand");
        };
        assert_eq!(
            tables.decoder_args.algorithm(),
            Err(DecoderError::ExtrinsicScale(0.5))
        );
    }
}
