//! Message passing schedules.
//!
//! A schedule determines the order in which the check nodes are evaluated and
//! their outputs written back to the memories. Each pass returns the number
//! of satisfied parity checks.

use super::{
    arithmetic::DecoderArithmetic,
    check_node::{CheckNodeUnit, Workspace},
    diagnostics,
    router::Router,
    Decoder,
};
use ndarray::s;
use num_traits::Zero;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Message passing schedule.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Schedule {
    /// Layered schedule.
    ///
    /// The check nodes are processed one by one, group by group and lane by
    /// lane. Each check node sees the APP values written by the previous
    /// one.
    #[default]
    Layered,
    /// Superposed layered schedule.
    ///
    /// All the check nodes of a group are read before any of them is written
    /// back, like the functional units of a hardware decoder working in
    /// parallel.
    SuperposedLayered,
    /// Two-phase (flooding) schedule.
    ///
    /// All the check nodes are read from the state of the previous iteration
    /// before any of them is written back.
    TwoPhase {
        /// Evaluate the parity checks on the APP values.
        ///
        /// If `true`, the parity checks are evaluated on the APP values read
        /// before the update, and the iteration stops without modifying the
        /// memories when all of them are satisfied. Otherwise the parity
        /// checks are evaluated on the check node inputs.
        app_parity_check: bool,
    },
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Layered => write!(f, "layered"),
            Schedule::SuperposedLayered => write!(f, "superposed layered"),
            Schedule::TwoPhase { app_parity_check } => write!(
                f,
                "two-phase ({} parity check)",
                if *app_parity_check { "APP" } else { "input" }
            ),
        }
    }
}

impl<A: DecoderArithmetic> Decoder<A> {
    pub(super) fn layered(&mut self) -> usize {
        let router = Router::new(&self.tables, &self.config);
        let unit = CheckNodeUnit::new(&self.arithmetic, self.config.algorithm);
        let self_correcting = self.config.algorithm.is_self_correcting();
        let degree = self.config.max_check_degree;
        let mut io = vec![A::Value::zero(); degree];
        let mut workspace = Workspace::new(degree);
        let mut satisfied = 0;
        for group in 0..router.num_groups() {
            for lane in 0..self.config.lanes {
                self.memory.gather(
                    &self.arithmetic,
                    &router,
                    group,
                    lane,
                    self_correcting,
                    self.zeta.slice_mut(s![group, lane, ..]),
                    &mut io,
                );
                unit.evaluate(&mut io, &mut workspace);
                self.memory
                    .scatter(&self.arithmetic, &router, group, lane, &io);
                if self.memory.app_parity(&router, group, lane) {
                    satisfied += 1;
                }
            }
            trace!(group, satisfied, "layer processed");
        }
        satisfied
    }

    pub(super) fn superposed_layered(&mut self) -> usize {
        let router = Router::new(&self.tables, &self.config);
        let unit = CheckNodeUnit::new(&self.arithmetic, self.config.algorithm);
        let self_correcting = self.config.algorithm.is_self_correcting();
        let degree = self.config.max_check_degree;
        let lanes = self.config.lanes;
        let mut io = vec![A::Value::zero(); lanes * degree];
        let mut satisfied = 0;
        for group in 0..router.num_groups() {
            for (lane, inputs) in io.chunks_exact_mut(degree).enumerate() {
                self.memory.gather(
                    &self.arithmetic,
                    &router,
                    group,
                    lane,
                    self_correcting,
                    self.zeta.slice_mut(s![group, lane, ..]),
                    inputs,
                );
                trace!(group, lane, ?inputs, "check node inputs");
            }
            io.par_chunks_exact_mut(degree).for_each_init(
                || Workspace::new(degree),
                |workspace, messages| {
                    unit.evaluate(messages, workspace);
                },
            );
            for (lane, outputs) in io.chunks_exact(degree).enumerate() {
                trace!(group, lane, ?outputs, "check node outputs");
                self.memory
                    .scatter(&self.arithmetic, &router, group, lane, outputs);
            }
            satisfied += (0..lanes)
                .filter(|&lane| self.memory.app_parity(&router, group, lane))
                .count();
            trace!(group, satisfied, "layer processed");
        }
        satisfied
    }

    pub(super) fn two_phase(&mut self, app_parity_check: bool) -> usize {
        let router = Router::new(&self.tables, &self.config);
        let unit = CheckNodeUnit::new(&self.arithmetic, self.config.algorithm);
        let self_correcting = self.config.algorithm.is_self_correcting();
        let degree = self.config.max_check_degree;
        let lanes = self.config.lanes;
        let groups = router.num_groups();
        let mut io = vec![A::Value::zero(); groups * lanes * degree];
        // Self-correction updates are only committed if the memories are
        // updated
        let mut staged_zeta = self_correcting.then(|| self.zeta.clone());
        let mut satisfied = 0;
        for (node, inputs) in io.chunks_exact_mut(degree).enumerate() {
            let (group, lane) = (node / lanes, node % lanes);
            let zeta = match &mut staged_zeta {
                Some(zeta) => zeta.slice_mut(s![group, lane, ..]),
                None => self.zeta.slice_mut(s![group, lane, ..]),
            };
            let app_satisfied = self.memory.gather(
                &self.arithmetic,
                &router,
                group,
                lane,
                self_correcting,
                zeta,
                inputs,
            );
            let node_satisfied = if app_parity_check {
                app_satisfied
            } else {
                diagnostics::parity_satisfied(inputs)
            };
            if node_satisfied {
                satisfied += 1;
            }
        }
        if app_parity_check && satisfied == groups * lanes {
            debug!(satisfied, "all parity checks satisfied before update");
            return satisfied;
        }
        io.par_chunks_exact_mut(degree).for_each_init(
            || Workspace::new(degree),
            |workspace, messages| {
                unit.evaluate(messages, workspace);
            },
        );
        if let Some(zeta) = staged_zeta {
            self.zeta = zeta;
        }
        for (node, outputs) in io.chunks_exact(degree).enumerate() {
            let (group, lane) = (node / lanes, node % lanes);
            self.memory
                .scatter(&self.arithmetic, &router, group, lane, outputs);
        }
        satisfied
    }
}

#[cfg(test)]
mod test {
    use super::super::{
        arithmetic::{ExtrinsicScale, FixedPoint, Quantization},
        check_node::CheckNodeAlgorithm,
        config::{CodeStructure, DecoderConfig},
        router::RoutingTables,
    };
    use super::*;
    use crate::base_matrix::BaseMatrix;
    use rand::{Rng as _, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn scenario() -> Decoder<FixedPoint> {
        // H = [1 1 0 0; 0 0 1 1], one lane
        let config = DecoderConfig {
            num_variable_nodes: 4,
            num_check_nodes: 2,
            max_check_degree: 2,
            source_parallelism: 1,
            lanes: 1,
            code_structure: CodeStructure::Structured,
            algorithm: CheckNodeAlgorithm::MinSum {
                scale: ExtrinsicScale::SevenEighths,
            },
            quantization: Quantization {
                fractional_bits: 0,
                extrinsic_max: 31,
                app_max: 127,
            },
        };
        let tables = RoutingTables::new(1, 2, vec![0, 1, 2, 3], vec![0; 4]);
        Decoder::new(config, tables, Schedule::Layered).unwrap()
    }

    #[test]
    fn layered_min_sum() {
        let mut decoder = scenario();
        decoder.initialize(&[3, -1, 2, -4]);
        assert_eq!(decoder.satisfied_checks(), 0);
        assert_eq!(decoder.iterate(), 2);
        assert_eq!(decoder.app_memory().row(0).to_vec(), vec![2, 1, -1, -2]);
        assert_eq!(
            decoder.message_memory().row(0).to_vec(),
            vec![-1, 2, -3, 2]
        );
        assert_eq!(decoder.decisions().bits, vec![0, 0, 1, 1]);
        assert_eq!(decoder.satisfied_checks(), 2);
    }

    #[test]
    fn schedules_agree_on_independent_checks() {
        // The two checks share no variable nodes, so every schedule gives
        // the same result
        for schedule in [
            Schedule::SuperposedLayered,
            Schedule::TwoPhase {
                app_parity_check: false,
            },
        ] {
            let mut decoder = scenario();
            decoder.set_schedule(schedule);
            decoder.initialize(&[3, -1, 2, -4]);
            decoder.iterate();
            assert_eq!(decoder.app_memory().row(0).to_vec(), vec![2, 1, -1, -2]);
        }
    }

    fn qc_decoder(algorithm: CheckNodeAlgorithm, schedule: Schedule) -> Decoder<FixedPoint> {
        let base: BaseMatrix = "0 1 -1 3 2\n4 -1 2 0 1\n-1 3 4 1 0".parse().unwrap();
        let config = base.config(5, algorithm, Quantization::six_bit());
        let tables = base.routing_tables(5).unwrap();
        Decoder::new(config, tables, schedule).unwrap()
    }

    fn random_channel(rng: &mut ChaCha8Rng, n: usize) -> Vec<i32> {
        (0..n).map(|_| rng.gen_range(-40..=40)).collect()
    }

    #[test]
    fn superposed_matches_layered_without_sharing() {
        // Each variable node group appears at most once per row of a base
        // matrix, so the lanes of a group never share a variable node
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for algorithm in [
            CheckNodeAlgorithm::MinSum {
                scale: ExtrinsicScale::SevenEighths,
            },
            CheckNodeAlgorithm::MinSumSelfCorrecting {
                scale: ExtrinsicScale::SevenEighths,
            },
            CheckNodeAlgorithm::LambdaMin { minima: 3 },
        ] {
            let mut layered = qc_decoder(algorithm, Schedule::Layered);
            let mut superposed = qc_decoder(algorithm, Schedule::SuperposedLayered);
            for _ in 0..10 {
                let channel = random_channel(&mut rng, 25);
                layered.initialize(&channel);
                superposed.initialize(&channel);
                for _ in 0..3 {
                    assert_eq!(layered.iterate(), superposed.iterate());
                    assert_eq!(layered.app_memory(), superposed.app_memory());
                    assert_eq!(layered.message_memory(), superposed.message_memory());
                    assert_eq!(
                        layered.self_correction_state(),
                        superposed.self_correction_state()
                    );
                }
            }
        }
    }

    #[test]
    fn two_phase_stops_without_update() {
        let algorithm = CheckNodeAlgorithm::MinSumSelfCorrecting {
            scale: ExtrinsicScale::SevenEighths,
        };
        let mut decoder = qc_decoder(algorithm, Schedule::Layered);
        let channel = (0..25).map(|j| 3 + j % 7).collect::<Vec<i32>>();
        decoder.initialize(&channel);
        // populate messages and self-correction state
        assert_eq!(decoder.iterate(), 15);
        let app = decoder.app_memory().to_owned();
        let messages = decoder.message_memory().to_owned();
        let zeta = decoder.self_correction_state().to_owned();
        assert!(zeta.iter().any(|&x| x != 0));

        decoder.set_schedule(Schedule::TwoPhase {
            app_parity_check: true,
        });
        assert_eq!(decoder.iterate(), 15);
        assert_eq!(decoder.app_memory(), app);
        assert_eq!(decoder.message_memory(), messages);
        assert_eq!(decoder.self_correction_state(), zeta);

        // without the APP parity check the memories are updated
        decoder.set_schedule(Schedule::TwoPhase {
            app_parity_check: false,
        });
        assert_eq!(decoder.iterate(), 15);
        assert_ne!(decoder.message_memory(), messages);
    }

    #[test]
    fn two_phase_self_correction_state() {
        let channel = (0..25).map(|j| if j % 3 == 0 { -5 } else { 9 }).collect::<Vec<i32>>();
        let schedule = Schedule::TwoPhase {
            app_parity_check: false,
        };
        let mut decoder = qc_decoder(
            CheckNodeAlgorithm::MinSumSelfCorrecting {
                scale: ExtrinsicScale::SevenEighths,
            },
            schedule,
        );
        decoder.initialize(&channel);
        decoder.iterate();
        assert!(decoder.self_correction_state().iter().any(|&x| x != 0));

        let mut decoder = qc_decoder(
            CheckNodeAlgorithm::MinSum {
                scale: ExtrinsicScale::SevenEighths,
            },
            schedule,
        );
        decoder.initialize(&channel);
        decoder.iterate();
        assert!(decoder.self_correction_state().iter().all(|&x| x == 0));
        assert!(decoder.message_memory().iter().any(|&x| x != 0));
    }

    #[test]
    fn two_phase_reads_previous_state() {
        // Both checks of this 1-lane graph share variable node 1
        let config = DecoderConfig {
            num_variable_nodes: 3,
            num_check_nodes: 2,
            max_check_degree: 2,
            source_parallelism: 1,
            lanes: 1,
            code_structure: CodeStructure::Structured,
            algorithm: CheckNodeAlgorithm::MinSum {
                scale: ExtrinsicScale::SevenEighths,
            },
            quantization: Quantization {
                fractional_bits: 0,
                extrinsic_max: 31,
                app_max: 127,
            },
        };
        let tables = RoutingTables::new(1, 2, vec![0, 1, 1, 2], vec![0; 4]);
        let mut decoder = Decoder::<FixedPoint>::new(
            config,
            tables,
            Schedule::TwoPhase {
                app_parity_check: false,
            },
        )
        .unwrap();
        decoder.initialize(&[8, -2, 4]);
        assert_eq!(decoder.iterate(), 0);
        // both checks see the channel value -2 of node 1
        assert_eq!(decoder.message_memory().row(0).to_vec(), vec![-2, 7, 3, -2]);
        assert_eq!(decoder.app_memory().row(0).to_vec(), vec![6, 8, 2]);

        decoder.set_schedule(Schedule::Layered);
        decoder.initialize(&[8, -2, 4]);
        assert_eq!(decoder.iterate(), 2);
        // the second check sees node 1 updated to 5 by the first one
        assert_eq!(decoder.message_memory().row(0).to_vec(), vec![-2, 7, 3, 4]);
        assert_eq!(decoder.app_memory().row(0).to_vec(), vec![6, 8, 8]);
    }
}
