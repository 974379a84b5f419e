//! BER simulation
//!
//! This module contains utilities for BER simulation. The all-zero codeword
//! is transmitted with BPSK over an AWGN channel, so no encoder is needed.
//! Frames are decoded in parallel with [rayon], each frame drawing its noise
//! from its own RNG stream (see [`frame_rng`]), so that the results only
//! depend on the seed.

use super::channel::AwgnChannel;
use crate::{
    decoder::{
        config::DecoderConfig,
        factory::{DecoderFactory, DecoderImplementation, LdpcDecoder},
        router::RoutingTables,
        schedule::Schedule,
        DecoderOutput, Error,
    },
    rand::frame_rng,
};
use rayon::prelude::*;
use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

// Frames decoded between checks of the stop condition. It is fixed so that
// the number of frames simulated does not depend on the number of threads.
const FRAMES_PER_BATCH: u64 = 64;

/// BER test.
///
/// This struct is used to configure and run a BER test.
#[derive(Debug)]
pub struct BerTest<Dec = DecoderImplementation> {
    decoder_implementation: Dec,
    config: DecoderConfig,
    tables: RoutingTables,
    schedule: Schedule,
    k: usize,
    n: usize,
    ebn0s_db: Vec<f32>,
    max_iterations: usize,
    max_frame_errors: u64,
    seed: u64,
    reporter: Option<Reporter>,
}

/// Progress reporter.
///
/// A reporter can optionally be supplied to the BER test in order to receive
/// periodic messages about the test progress.
#[derive(Debug, Clone)]
pub struct Reporter {
    /// Sender element of a channel used to send the reports.
    pub tx: Sender<Report>,
    /// Reporting interval.
    pub interval: Duration,
}

/// BER test progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Statistics for the current Eb/N0 being tested.
    ///
    /// This is sent periodically, and also when the Eb/N0 is finished.
    Statistics(Statistics),
    /// The complete BER test has finished.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
struct CurrentStatistics {
    num_frames: u64,
    bit_errors: u64,
    frame_errors: u64,
    false_decodes: u64,
    total_iterations: u64,
    start: Instant,
}

/// BER test statistics.
///
/// This structure contains the statistics for a single Eb/N0 case in a BER
/// test.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Eb/N0 in dB units.
    pub ebn0_db: f32,
    /// Number of frames tested.
    pub num_frames: u64,
    /// Number of bit errors.
    pub bit_errors: u64,
    /// Number of frame errors.
    pub frame_errors: u64,
    /// Number of frames falsely decoded.
    ///
    /// This are frames for which the decoder converged to a valid codeword, but
    /// the codeword is different to the transmitted codeword.
    pub false_decodes: u64,
    /// Bit error rate.
    pub ber: f64,
    /// Frame error rate.
    pub fer: f64,
    /// Average number of iterations.
    pub average_iterations: f64,
    /// Elapsed time for this test case.
    pub elapsed: Duration,
    /// Throughput in Mbps (referred to information bits).
    pub throughput_mbps: f64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct FrameResult {
    bit_errors: u64,
    success: bool,
    iterations: usize,
}

impl<Dec: DecoderFactory> BerTest<Dec> {
    /// Creates a new BER test.
    ///
    /// The parameters required to define the test are the decoder
    /// implementation, the decoder configuration and routing tables, the
    /// schedule, the maximum number of frame errors at which to stop the
    /// simulation for each Eb/N0, the maximum number of iterations of the LDPC
    /// decoder, a list of Eb/N0's in dB units and the seed of the RNG.
    ///
    /// A decoder is built to check the configuration, so this function
    /// returns an error if the configuration or the tables are invalid.
    ///
    /// This function only defines the BER test. To run it it is necessary to
    /// call the [`BerTest::run`] method.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        decoder_implementation: Dec,
        config: DecoderConfig,
        tables: RoutingTables,
        schedule: Schedule,
        max_frame_errors: u64,
        max_iterations: usize,
        ebn0s_db: &[f32],
        seed: u64,
        reporter: Option<Reporter>,
    ) -> Result<BerTest<Dec>, Error> {
        decoder_implementation.build_decoder(config.clone(), tables.clone(), schedule)?;
        Ok(BerTest {
            decoder_implementation,
            k: config.num_systematic_nodes(),
            n: config.num_variable_nodes,
            config,
            tables,
            schedule,
            ebn0s_db: ebn0s_db.to_owned(),
            max_iterations,
            max_frame_errors,
            seed,
            reporter,
        })
    }

    /// Returns the codeword size of the code.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the number of information bits of the code.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the rate of the code.
    pub fn rate(&self) -> f64 {
        self.k as f64 / self.n as f64
    }

    /// Runs the BER test.
    ///
    /// This function runs the BER test until completion. It returns a list of
    /// statistics for each Eb/N0, or an error.
    pub fn run(self) -> Result<Vec<Statistics>, Box<dyn std::error::Error>> {
        let mut statistics = Vec::with_capacity(self.ebn0s_db.len());
        let (n, k, max_iterations) = (self.n, self.k, self.max_iterations);
        let (factory, config, tables, schedule) = (
            &self.decoder_implementation,
            &self.config,
            &self.tables,
            self.schedule,
        );
        for (j, &ebn0_db) in self.ebn0s_db.iter().enumerate() {
            let ebn0 = 10.0_f64.powf(0.1 * f64::from(ebn0_db));
            let esn0 = self.rate() * ebn0;
            let noise_sigma = (0.5 / esn0).sqrt();
            let channel = AwgnChannel::new(noise_sigma);
            let seed = self.seed.wrapping_add(j as u64);
            let mut current = CurrentStatistics::new();
            let mut last_report = Instant::now();
            while current.frame_errors < self.max_frame_errors {
                let first = current.num_frames;
                let results = (first..first + FRAMES_PER_BATCH)
                    .into_par_iter()
                    .map_init(
                        || factory.build_decoder(config.clone(), tables.clone(), schedule),
                        |decoder, frame| {
                            let decoder = decoder.as_mut().map_err(|e| e.clone())?;
                            let llrs = channel.all_zero_llrs(&mut frame_rng(seed, frame), n);
                            Ok(FrameResult::new(
                                decoder.decode(&llrs, max_iterations),
                                k,
                            ))
                        },
                    )
                    .collect::<Result<Vec<_>, Error>>()?;
                for result in results {
                    current.update(&result);
                }
                if let Some(reporter) = &self.reporter {
                    if last_report.elapsed() >= reporter.interval {
                        last_report = Instant::now();
                        reporter.tx.send(Report::Statistics(Statistics::from_current(
                            &current, ebn0_db, k,
                        )))?;
                    }
                }
            }
            let stats = Statistics::from_current(&current, ebn0_db, self.k);
            if let Some(reporter) = &self.reporter {
                reporter.tx.send(Report::Statistics(stats.clone()))?;
            }
            statistics.push(stats);
        }
        if let Some(reporter) = &self.reporter {
            reporter.tx.send(Report::Finished)?;
        }
        Ok(statistics)
    }
}

impl FrameResult {
    fn new(decoded: Result<DecoderOutput, DecoderOutput>, k: usize) -> FrameResult {
        let (output, success) = match decoded {
            Ok(output) => (output, true),
            Err(output) => (output, false),
        };
        // Count only bit errors in the systematic part of the codeword
        let bit_errors = output.codeword[..k].iter().filter(|&&b| b != 0).count() as u64;
        FrameResult {
            bit_errors,
            success,
            iterations: output.iterations,
        }
    }
}

impl CurrentStatistics {
    fn new() -> CurrentStatistics {
        CurrentStatistics {
            num_frames: 0,
            bit_errors: 0,
            frame_errors: 0,
            false_decodes: 0,
            total_iterations: 0,
            start: Instant::now(),
        }
    }

    fn update(&mut self, result: &FrameResult) {
        self.num_frames += 1;
        self.total_iterations += result.iterations as u64;
        self.bit_errors += result.bit_errors;
        if result.bit_errors > 0 {
            self.frame_errors += 1;
            if result.success {
                self.false_decodes += 1;
            }
        }
    }
}

impl Default for CurrentStatistics {
    fn default() -> CurrentStatistics {
        CurrentStatistics::new()
    }
}

impl Statistics {
    fn from_current(stats: &CurrentStatistics, ebn0_db: f32, k: usize) -> Statistics {
        let elapsed = Instant::now() - stats.start;
        Statistics {
            ebn0_db,
            num_frames: stats.num_frames,
            bit_errors: stats.bit_errors,
            frame_errors: stats.frame_errors,
            false_decodes: stats.false_decodes,
            ber: stats.bit_errors as f64 / (k as f64 * stats.num_frames as f64),
            fer: stats.frame_errors as f64 / stats.num_frames as f64,
            average_iterations: stats.total_iterations as f64 / stats.num_frames as f64,
            elapsed,
            throughput_mbps: 1e-6 * (k as f64 * stats.num_frames as f64) / elapsed.as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        base_matrix::BaseMatrix,
        decoder::{
            arithmetic::{ExtrinsicScale, Quantization},
            check_node::CheckNodeAlgorithm,
        },
    };
    use std::sync::mpsc;

    fn test(ebn0s_db: &[f32], reporter: Option<Reporter>) -> BerTest {
        let base: BaseMatrix = "0 0 0 0 0 0\n0 1 2 3 4 5\n0 2 4 6 1 3".parse().unwrap();
        let algorithm = CheckNodeAlgorithm::MinSum {
            scale: ExtrinsicScale::SevenEighths,
        };
        BerTest::new(
            DecoderImplementation::FixedPoint,
            base.config(7, algorithm, Quantization::six_bit()),
            base.routing_tables(7).unwrap(),
            Schedule::Layered,
            5,
            20,
            ebn0s_db,
            1234,
            reporter,
        )
        .unwrap()
    }

    #[test]
    fn reproducible() {
        let strip = |stats: Vec<Statistics>| {
            stats
                .into_iter()
                .map(|s| (s.num_frames, s.bit_errors, s.frame_errors, s.false_decodes))
                .collect::<Vec<_>>()
        };
        let first = strip(test(&[1.0, 2.0], None).run().unwrap());
        let second = strip(test(&[1.0, 2.0], None).run().unwrap());
        assert_eq!(first, second);
        for (num_frames, _, frame_errors, _) in first {
            assert!(frame_errors >= 5);
            assert_eq!(num_frames % FRAMES_PER_BATCH, 0);
        }
    }

    #[test]
    fn reports() {
        let (tx, rx) = mpsc::channel();
        let reporter = Reporter {
            tx,
            interval: Duration::from_secs(3600),
        };
        let stats = test(&[0.0], Some(reporter)).run().unwrap();
        assert_eq!(rx.recv().unwrap(), Report::Statistics(stats[0].clone()));
        assert_eq!(rx.recv().unwrap(), Report::Finished);
    }

    #[test]
    fn invalid_configuration() {
        let base: BaseMatrix = "0 1\n1 0".parse().unwrap();
        let result = BerTest::new(
            DecoderImplementation::FixedPoint,
            base.config(2, CheckNodeAlgorithm::Lambda3Min3Mag, Quantization::six_bit()),
            base.routing_tables(2).unwrap(),
            Schedule::Layered,
            10,
            10,
            &[1.0],
            0,
            None,
        );
        assert!(matches!(
            result,
            Err(Error::CheckDegree {
                degree: 2,
                algorithm: "lambda-3min-3mag"
            })
        ));
    }
}
