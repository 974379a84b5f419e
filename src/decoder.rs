//! Hardware-compliant LDPC decoder.
//!
//! This module implements the iterative message passing engine of a
//! hardware LDPC decoder. The decoder does not work on a parity check matrix
//! directly, but on precomputed [`RoutingTables`](router::RoutingTables) that
//! describe how the check node functional units ("lanes") of the hardware are
//! connected to a folded APP memory. The arithmetic (quantization,
//! saturation, extrinsic scaling) follows the integer datapath of the
//! hardware bit-for-bit when used with
//! [`FixedPoint`](arithmetic::FixedPoint).
//!
//! The decoder is generic over the [`DecoderArithmetic`] trait, the check node
//! update rule is selected with a
//! [`CheckNodeAlgorithm`](check_node::CheckNodeAlgorithm), and the message
//! passing schedule with a [`Schedule`](schedule::Schedule).

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use num_traits::Zero;
use thiserror::Error;
use tracing::debug;

pub mod arithmetic;
pub mod check_node;
pub mod config;
pub mod diagnostics;
pub mod factory;
pub mod memory;
pub mod router;
pub mod schedule;

use arithmetic::DecoderArithmetic;
use config::DecoderConfig;
use memory::{Decisions, Layout, Memory};
use router::{Router, RoutingTables};
use schedule::Schedule;

/// LDPC decoder error.
///
/// All these errors are detected when a decoder is built. Once built, the
/// decoder never fails: arithmetic overflows are handled by saturation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The lane count is zero.
    #[error("the lane count must be non-zero")]
    ZeroLanes,
    /// The source parallelism is not a multiple of the lane count.
    #[error(
        "source parallelism {source_parallelism} is not a non-zero multiple of the lane count {lanes}"
    )]
    Parallelism {
        /// Source parallelism.
        source_parallelism: usize,
        /// Lane count.
        lanes: usize,
    },
    /// There are more check nodes than variable nodes.
    #[error("there are more check nodes ({check_nodes}) than variable nodes ({variable_nodes})")]
    CheckNodes {
        /// Number of check nodes.
        check_nodes: usize,
        /// Number of variable nodes.
        variable_nodes: usize,
    },
    /// A size is not a multiple of the parallelism.
    #[error("number of {what} ({value}) is not a multiple of {divisor}")]
    NotMultiple {
        /// Name of the quantity.
        what: &'static str,
        /// Value of the quantity.
        value: usize,
        /// Required divisor.
        divisor: usize,
    },
    /// The check node degree is too small for the algorithm.
    #[error("maximum check node degree {degree} is too small for {algorithm}")]
    CheckDegree {
        /// Maximum check node degree.
        degree: usize,
        /// Name of the check node algorithm.
        algorithm: &'static str,
    },
    /// Unsupported number of minima for lambda-min.
    #[error("lambda-min supports 2 or 3 minima, got {0}")]
    LambdaMin(usize),
    /// Too few partitions for split-row.
    #[error("split-row needs at least 2 partitions, got {0}")]
    SplitRowPartitions(usize),
    /// The check node cannot be split into equal partitions.
    #[error("check node degree {degree} cannot be split into {partitions} partitions of at least 2 edges")]
    SplitRowWidth {
        /// Maximum check node degree.
        degree: usize,
        /// Number of partitions.
        partitions: usize,
    },
    /// Unsupported extrinsic scale factor.
    #[error("unsupported extrinsic scale factor {0}")]
    ExtrinsicScale(f64),
    /// Invalid quantization parameters.
    #[error("invalid quantization: {0}")]
    Quantization(&'static str),
    /// The routing tables were built for another lane count.
    #[error("routing tables were built for {tables} lanes, but the decoder has {lanes}")]
    TableLanes {
        /// Lane count of the tables.
        tables: usize,
        /// Lane count of the decoder.
        lanes: usize,
    },
    /// The routing tables were built for another maximum check node degree.
    #[error("routing tables have {tables} edge slots per group, but the maximum check node degree is {degree}")]
    TableDegree {
        /// Edge slots per group in the tables.
        tables: usize,
        /// Maximum check node degree of the decoder.
        degree: usize,
    },
    /// The routing tables have the wrong size.
    #[error("routing tables have {found} edge slots, expected {expected}")]
    TableLength {
        /// Expected number of edge slots.
        expected: usize,
        /// Number of edge slots found.
        found: usize,
    },
    /// An edge slot addresses a variable node group that does not exist.
    #[error("edge slot {slot} addresses variable node group {address}, but there are {groups} groups")]
    TableAddress {
        /// Edge slot.
        slot: usize,
        /// Address found in the table.
        address: i32,
        /// Number of variable node groups.
        groups: usize,
    },
    /// An edge slot has a shift outside the lane range.
    #[error("edge slot {slot} has shift {shift}, outside 0..{lanes}")]
    TableShift {
        /// Edge slot.
        slot: usize,
        /// Shift found in the table.
        shift: i32,
        /// Lane count.
        lanes: usize,
    },
}

/// LDPC decoder output.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DecoderOutput {
    /// Decoded codeword.
    ///
    /// Contains the hard decision bits of the decoded codeword.
    pub codeword: Vec<u8>,
    /// Number of iterations.
    ///
    /// Number of iterations used in decoding.
    pub iterations: usize,
    /// Number of parity checks satisfied by the decoded codeword.
    pub satisfied_checks: usize,
}

/// Hardware-compliant LDPC decoder.
///
/// The decoder owns all the memories of one hardware decoder instance: the
/// APP memory, the message memory and the self-correction state. These are
/// allocated once in [`Decoder::new`] and reset at the start of every
/// codeword.
#[derive(Debug, Clone)]
pub struct Decoder<A: DecoderArithmetic> {
    arithmetic: A,
    config: DecoderConfig,
    tables: RoutingTables,
    schedule: Schedule,
    layout: Layout,
    memory: Memory<A::Value>,
    // Previous check node inputs, indexed as [group][lane][slot]
    zeta: Array3<A::Value>,
    channel: Vec<A::Value>,
    previous_bits: Vec<u8>,
}

impl<A: DecoderArithmetic> Decoder<A> {
    /// Creates a new decoder.
    ///
    /// The configuration and the routing tables are validated. The arithmetic
    /// object is built from the quantization parameters in the configuration.
    pub fn new(
        config: DecoderConfig,
        tables: RoutingTables,
        schedule: Schedule,
    ) -> Result<Decoder<A>, Error> {
        config.validate()?;
        tables.validate(&config)?;
        let arithmetic = A::new(&config.quantization);
        let layout = Layout::new(&config, config.is_ira());
        let lanes = config.lanes;
        let memory = Memory {
            app: Array2::zeros((lanes, layout.num_addresses())),
            messages: Array2::zeros((lanes, config.num_edge_slots())),
        };
        let zeta = Array3::zeros((
            config.num_check_node_groups(),
            lanes,
            config.max_check_degree,
        ));
        Ok(Decoder {
            arithmetic,
            channel: Vec::with_capacity(config.num_variable_nodes),
            previous_bits: Vec::with_capacity(config.num_variable_nodes),
            config,
            tables,
            schedule,
            layout,
            memory,
            zeta,
        })
    }

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
    ///
    /// # Panics
    ///
    /// This function panics if the length of `llrs` is not the number of
    /// variable nodes.
    pub fn decode(
        &mut self,
        llrs: &[f64],
        max_iterations: usize,
    ) -> Result<DecoderOutput, DecoderOutput> {
        let channel = llrs
            .iter()
            .map(|&x| self.arithmetic.quantize(x))
            .collect::<Vec<_>>();
        self.initialize(&channel);
        let num_checks = self.config.num_check_nodes;
        let mut satisfied = self.satisfied_checks();
        if satisfied == num_checks {
            // No bit errors case
            return Ok(self.output(0, satisfied));
        }
        for iteration in 1..=max_iterations {
            let pass_satisfied = self.iterate();
            // The count of the pass may include checks that were broken by
            // later updates of the same pass
            satisfied = self.satisfied_checks();
            let decisions = self.decisions();
            debug!(
                iteration,
                pass_failed_checks = num_checks - pass_satisfied,
                failed_checks = num_checks - satisfied,
                flipped_bits = diagnostics::flipped_bits(&self.previous_bits, &decisions.bits),
                modified_systematic_bits = diagnostics::modified_systematic_bits(
                    &self.channel,
                    &decisions.bits,
                    self.config.num_systematic_nodes()
                ),
                "iteration finished"
            );
            self.previous_bits = decisions.bits;
            if satisfied == num_checks {
                // Decode succeeded
                return Ok(self.output(iteration, satisfied));
            }
        }
        // Decode failed
        Err(self.output(max_iterations, satisfied))
    }

    fn output(&self, iterations: usize, satisfied_checks: usize) -> DecoderOutput {
        DecoderOutput {
            codeword: self.previous_bits.clone(),
            iterations,
            satisfied_checks,
        }
    }

    /// Loads a new codeword into the decoder.
    ///
    /// The channel values, given in natural order and already in the
    /// representation of the arithmetic, are distributed into the APP memory.
    /// The message memory and the self-correction state are reset to zero.
    ///
    /// # Panics
    ///
    /// This function panics if the length of `channel` is not the number of
    /// variable nodes.
    pub fn initialize(&mut self, channel: &[A::Value]) {
        assert_eq!(channel.len(), self.config.num_variable_nodes);
        self.layout.distribute(channel, &mut self.memory.app);
        self.memory.messages.fill(A::Value::zero());
        self.zeta.fill(A::Value::zero());
        self.channel.clear();
        self.channel.extend_from_slice(channel);
        self.previous_bits = self.decisions().bits;
    }

    /// Runs one iteration with the configured schedule.
    ///
    /// Returns the number of satisfied parity checks.
    pub fn iterate(&mut self) -> usize {
        match self.schedule {
            Schedule::Layered => self.layered(),
            Schedule::SuperposedLayered => self.superposed_layered(),
            Schedule::TwoPhase { app_parity_check } => self.two_phase(app_parity_check),
        }
    }

    /// Returns the current decisions.
    ///
    /// The LLRs are read from the APP memory and returned in natural order,
    /// together with their hard decisions.
    pub fn decisions(&self) -> Decisions<A::Value> {
        self.layout.collect(&self.memory.app)
    }

    /// Returns the number of parity checks satisfied by the APP memory.
    ///
    /// This does not modify the decoder state.
    pub fn satisfied_checks(&self) -> usize {
        let router = Router::new(&self.tables, &self.config);
        (0..self.config.num_check_node_groups())
            .flat_map(|group| (0..self.config.lanes).map(move |lane| (group, lane)))
            .filter(|&(group, lane)| self.memory.app_parity(&router, group, lane))
            .count()
    }

    /// Returns the decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the routing tables.
    pub fn tables(&self) -> &RoutingTables {
        &self.tables
    }

    /// Returns the arithmetic used by the decoder.
    pub fn arithmetic(&self) -> &A {
        &self.arithmetic
    }

    /// Returns the message passing schedule.
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Sets the message passing schedule used by the next iterations.
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    /// Returns the APP memory, indexed as `[lane][address]`.
    pub fn app_memory(&self) -> ArrayView2<'_, A::Value> {
        self.memory.app.view()
    }

    /// Returns the message memory, indexed as `[lane][edge slot]`.
    pub fn message_memory(&self) -> ArrayView2<'_, A::Value> {
        self.memory.messages.view()
    }

    /// Returns the self-correction state, indexed as `[group][lane][slot]`.
    pub fn self_correction_state(&self) -> ArrayView3<'_, A::Value> {
        self.zeta.view()
    }
}

#[cfg(test)]
mod test {
    use super::arithmetic::{ExtrinsicScale, FixedPoint, FloatingPoint, Quantization};
    use super::check_node::CheckNodeAlgorithm;
    use super::config::CodeStructure;
    use super::*;
    use crate::base_matrix::BaseMatrix;

    // Array code with circulant size 7: shift (i * j) mod 7
    fn array_code() -> BaseMatrix {
        "0 0 0 0 0 0\n0 1 2 3 4 5\n0 2 4 6 1 3".parse().unwrap()
    }

    fn array_decoder<A: DecoderArithmetic>(
        algorithm: CheckNodeAlgorithm,
        schedule: Schedule,
    ) -> Decoder<A> {
        let base = array_code();
        let config = base.config(7, algorithm, Quantization::six_bit());
        let tables = base.routing_tables(7).unwrap();
        Decoder::new(config, tables, schedule).unwrap()
    }

    fn single_error(n: usize, position: usize) -> Vec<f64> {
        (0..n)
            .map(|j| if j == position { -2.0 } else { 2.0 })
            .collect()
    }

    const MIN_SUM: CheckNodeAlgorithm = CheckNodeAlgorithm::MinSum {
        scale: ExtrinsicScale::SevenEighths,
    };

    #[test]
    fn no_errors() {
        let mut decoder = array_decoder::<FixedPoint>(MIN_SUM, Schedule::Layered);
        let output = decoder.decode(&[1.5; 42], 10).unwrap();
        assert_eq!(output.codeword, vec![0; 42]);
        assert_eq!(output.iterations, 0);
        assert_eq!(output.satisfied_checks, 21);
    }

    #[test]
    fn single_error_all_schedules() {
        let schedules = [
            Schedule::Layered,
            Schedule::SuperposedLayered,
            Schedule::TwoPhase {
                app_parity_check: true,
            },
            Schedule::TwoPhase {
                app_parity_check: false,
            },
        ];
        for schedule in schedules {
            let mut decoder = array_decoder::<FixedPoint>(MIN_SUM, schedule);
            for position in [0, 13, 41] {
                let output = decoder.decode(&single_error(42, position), 20).unwrap();
                assert_eq!(output.codeword, vec![0; 42], "{schedule:?}");
                assert!(output.iterations >= 1);
            }
        }
    }

    #[test]
    fn single_error_other_algorithms() {
        let algorithms = [
            CheckNodeAlgorithm::MinSumSelfCorrecting {
                scale: ExtrinsicScale::ThreeQuarters,
            },
            CheckNodeAlgorithm::LambdaMin { minima: 2 },
            CheckNodeAlgorithm::LambdaMin { minima: 3 },
            CheckNodeAlgorithm::Lambda3Min3Mag,
        ];
        for algorithm in algorithms {
            let mut decoder = array_decoder::<FixedPoint>(algorithm, Schedule::Layered);
            let output = decoder.decode(&single_error(42, 20), 20).unwrap();
            assert_eq!(output.codeword, vec![0; 42], "{algorithm:?}");
            let mut decoder = array_decoder::<FloatingPoint>(algorithm, Schedule::Layered);
            let output = decoder.decode(&single_error(42, 20), 20).unwrap();
            assert_eq!(output.codeword, vec![0; 42], "{algorithm:?}");
        }
    }

    #[test]
    fn decoding_failure_reports_budget() {
        let mut decoder = array_decoder::<FixedPoint>(MIN_SUM, Schedule::Layered);
        match decoder.decode(&single_error(42, 5), 0) {
            Err(output) => {
                assert_eq!(output.iterations, 0);
                // the wrong bit takes part in 3 checks
                assert_eq!(output.satisfied_checks, 18);
                assert_eq!(output.codeword[5], 1);
            }
            Ok(_) => panic!("decoding with no iterations cannot succeed"),
        }
    }

    #[test]
    fn success_requires_final_parity() {
        // Two checks sharing v1, one lane. In the first layered pass check 1
        // flips v1 after check 0 has been counted as satisfied.
        let config = DecoderConfig {
            num_variable_nodes: 3,
            num_check_nodes: 2,
            max_check_degree: 2,
            source_parallelism: 1,
            lanes: 1,
            code_structure: CodeStructure::Structured,
            algorithm: MIN_SUM,
            quantization: Quantization {
                fractional_bits: 0,
                extrinsic_max: 31,
                app_max: 127,
            },
        };
        let tables = RoutingTables::new(1, 2, vec![0, 1, 1, 2], vec![0; 4]);
        let mut decoder = Decoder::<FixedPoint>::new(config, tables, Schedule::Layered).unwrap();
        decoder.initialize(&[8, 1, -20]);
        assert_eq!(decoder.iterate(), 2);
        assert_eq!(decoder.app_memory().row(0).to_vec(), vec![9, -9, -13]);
        assert_eq!(decoder.satisfied_checks(), 1);

        let output = decoder.decode(&[8.0, 1.0, -20.0], 10).unwrap();
        assert_eq!(output.iterations, 2);
        assert_eq!(output.codeword, vec![1, 1, 1]);
        assert_eq!(output.satisfied_checks, 2);
        assert_eq!(decoder.satisfied_checks(), 2);
        assert_eq!(decoder.app_memory().row(0).to_vec(), vec![-6, -9, -13]);
    }

    #[test]
    fn memory_is_reset_between_codewords() {
        let mut decoder = array_decoder::<FixedPoint>(
            CheckNodeAlgorithm::MinSumSelfCorrecting {
                scale: ExtrinsicScale::SevenEighths,
            },
            Schedule::Layered,
        );
        let first = decoder.decode(&single_error(42, 3), 20).unwrap();
        let _ = decoder.decode(&single_error(42, 30), 20).unwrap();
        let again = decoder.decode(&single_error(42, 3), 20).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn invalid_tables_rejected() {
        let base = array_code();
        let config = base.config(7, MIN_SUM, Quantization::six_bit());
        let tables = base.routing_tables(7).unwrap();
        let mut addresses = tables.addresses().to_vec();
        addresses[4] = 6;
        let bad = RoutingTables::new(7, 6, addresses, tables.shifts().to_vec());
        assert_eq!(
            Decoder::<FixedPoint>::new(config.clone(), bad, Schedule::Layered).unwrap_err(),
            Error::TableAddress {
                slot: 4,
                address: 6,
                groups: 6
            }
        );
        let mut shifts = tables.shifts().to_vec();
        shifts[2] = 7;
        let bad = RoutingTables::new(7, 6, tables.addresses().to_vec(), shifts);
        assert_eq!(
            Decoder::<FixedPoint>::new(config, bad, Schedule::Layered).unwrap_err(),
            Error::TableShift {
                slot: 2,
                shift: 7,
                lanes: 7
            }
        );
    }
}
