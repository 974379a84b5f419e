//! Check node algorithms.
//!
//! A check node functional unit receives the inputs of one check node (the
//! APP values of its neighbours minus the previous extrinsic messages),
//! replaces them in place by the new extrinsic messages, and returns the
//! parity sign of the inputs. All the algorithms work on a signed-magnitude
//! representation and differ in how the magnitude of each output is
//! approximated.

use super::{
    arithmetic::{DecoderArithmetic, ExtrinsicScale, Sign},
    Error,
};
use num_traits::{One, Signed};

/// Check node algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CheckNodeAlgorithm {
    /// Scaled min-sum.
    MinSum {
        /// Extrinsic scale factor.
        scale: ExtrinsicScale,
    },
    /// Self-correcting scaled min-sum.
    ///
    /// The check node is the same as in min-sum, but its inputs are erased
    /// when they change sign between iterations.
    MinSumSelfCorrecting {
        /// Extrinsic scale factor.
        scale: ExtrinsicScale,
    },
    /// Lambda-min.
    ///
    /// Uses the `minima` smallest input magnitudes combined with the min*
    /// function. No extrinsic scaling is applied.
    LambdaMin {
        /// Number of minima (2 or 3).
        minima: usize,
    },
    /// Lambda-min with three minima and three output magnitudes.
    Lambda3Min3Mag,
    /// Split-row threshold.
    ///
    /// The check node is split into `partitions` partitions that compute
    /// local minima, exchanging only their signs and a threshold enable
    /// signal.
    SplitRow {
        /// Rule used to combine the local minima with the threshold.
        variant: SplitRowVariant,
        /// Extrinsic scale factor.
        scale: ExtrinsicScale,
        /// Number of partitions.
        partitions: usize,
        /// Threshold, in fixed point units.
        threshold: i32,
    },
}

/// Split-row variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SplitRowVariant {
    /// Split-row threshold.
    Threshold,
    /// Improved split-row threshold.
    Improved,
    /// Self-correcting split-row threshold.
    ///
    /// Uses the same combination rule as [`SplitRowVariant::Improved`].
    SelfCorrecting,
}

impl CheckNodeAlgorithm {
    /// Returns the name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            CheckNodeAlgorithm::MinSum { .. } => "min-sum",
            CheckNodeAlgorithm::MinSumSelfCorrecting { .. } => "min-sum-self-correcting",
            CheckNodeAlgorithm::LambdaMin { .. } => "lambda-min",
            CheckNodeAlgorithm::Lambda3Min3Mag => "lambda-3min-3mag",
            CheckNodeAlgorithm::SplitRow { variant, .. } => match variant {
                SplitRowVariant::Threshold => "split-row-threshold",
                SplitRowVariant::Improved => "split-row-improved",
                SplitRowVariant::SelfCorrecting => "split-row-self-correcting",
            },
        }
    }

    /// Returns `true` if the check node inputs are self-corrected.
    pub fn is_self_correcting(&self) -> bool {
        matches!(self, CheckNodeAlgorithm::MinSumSelfCorrecting { .. })
    }

    /// Checks the algorithm parameters against the maximum check node degree.
    pub fn validate(&self, degree: usize) -> Result<(), Error> {
        let min_degree = match *self {
            CheckNodeAlgorithm::MinSum { .. } | CheckNodeAlgorithm::MinSumSelfCorrecting { .. } => {
                2
            }
            CheckNodeAlgorithm::LambdaMin { minima } => {
                if !(2..=3).contains(&minima) {
                    return Err(Error::LambdaMin(minima));
                }
                minima
            }
            CheckNodeAlgorithm::Lambda3Min3Mag => 3,
            CheckNodeAlgorithm::SplitRow { partitions, .. } => {
                if partitions < 2 {
                    return Err(Error::SplitRowPartitions(partitions));
                }
                if degree % partitions != 0 || degree / partitions < 2 {
                    return Err(Error::SplitRowWidth { degree, partitions });
                }
                2 * partitions
            }
        };
        if degree < min_degree {
            return Err(Error::CheckDegree {
                degree,
                algorithm: self.name(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for CheckNodeAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckNodeAlgorithm::MinSum { scale }
            | CheckNodeAlgorithm::MinSumSelfCorrecting { scale } => {
                write!(f, "{} (scale {})", self.name(), scale)
            }
            CheckNodeAlgorithm::LambdaMin { minima } => write!(f, "{}-{}", self.name(), minima),
            CheckNodeAlgorithm::Lambda3Min3Mag => write!(f, "{}", self.name()),
            CheckNodeAlgorithm::SplitRow {
                scale,
                partitions,
                threshold,
                ..
            } => write!(
                f,
                "{} (scale {}, {} partitions, threshold {})",
                self.name(),
                scale,
                partitions,
                threshold
            ),
        }
    }
}

/// Finds the minimum of a list of values.
///
/// Returns the minimum and its index. The comparison is non-strict, like the
/// comparator tree of the hardware, so if the minimum appears several times,
/// the index of its last occurrence is returned.
///
/// # Panics
///
/// This function panics if `values` is empty.
pub fn minimum<T: PartialOrd + Copy>(values: &[T]) -> (T, usize) {
    let mut min = (values[0], 0);
    for (j, &x) in values.iter().enumerate().skip(1) {
        if x <= min.0 {
            min = (x, j);
        }
    }
    min
}

// Minimum search of a split-row partition. The search starts at the bound
// instead of at the first value.
fn bounded_minimum<T: PartialOrd + Copy>(values: &[T], bound: T) -> (T, usize) {
    let mut min = (bound, 0);
    for (j, &x) in values.iter().enumerate() {
        if x <= min.0 {
            min = (x, j);
        }
    }
    min
}

#[derive(Debug, Copy, Clone)]
struct Partition<T> {
    sign: Sign,
    min1: T,
    min1_index: usize,
    min2: T,
    enabled: bool,
}

/// Scratch memory of a check node functional unit.
///
/// Holds the magnitudes and signs of the inputs being processed, so that the
/// check node update does not allocate. Each thread that evaluates check nodes
/// needs its own workspace.
#[derive(Debug, Clone, Default)]
pub struct Workspace<T> {
    magnitudes: Vec<T>,
    signs: Vec<Sign>,
    partitions: Vec<Partition<T>>,
}

impl<T: Signed + PartialOrd + Copy> Workspace<T> {
    /// Creates a workspace for check nodes of a given degree.
    pub fn new(degree: usize) -> Workspace<T> {
        Workspace {
            magnitudes: Vec::with_capacity(degree),
            signs: Vec::with_capacity(degree),
            partitions: Vec::new(),
        }
    }

    // Separates magnitudes and signs. Returns the parity sign.
    fn split(&mut self, messages: &[T]) -> Sign {
        self.magnitudes.clear();
        self.signs.clear();
        self.magnitudes.extend(messages.iter().map(|x| x.abs()));
        self.signs.extend(messages.iter().map(|&x| Sign::of(x)));
        self.signs.iter().copied().product()
    }
}

/// Check node functional unit.
///
/// Evaluates check nodes with a particular algorithm and arithmetic.
#[derive(Debug, Clone)]
pub struct CheckNodeUnit<'a, A: DecoderArithmetic> {
    arithmetic: &'a A,
    algorithm: CheckNodeAlgorithm,
    bound: A::Value,
    threshold: A::Value,
}

impl<'a, A: DecoderArithmetic> CheckNodeUnit<'a, A> {
    /// Creates a check node functional unit.
    pub fn new(arithmetic: &'a A, algorithm: CheckNodeAlgorithm) -> CheckNodeUnit<'a, A> {
        let threshold = match algorithm {
            CheckNodeAlgorithm::SplitRow { threshold, .. } => arithmetic.from_quantized(threshold),
            _ => A::Value::default(),
        };
        CheckNodeUnit {
            arithmetic,
            algorithm,
            bound: arithmetic.extrinsic_max(),
            threshold,
        }
    }

    /// Evaluates a check node.
    ///
    /// The inputs in `messages` are replaced by the outputs. The return value
    /// is the parity sign of the inputs (`Sign::Positive` if the check is
    /// satisfied).
    pub fn evaluate(&self, messages: &mut [A::Value], workspace: &mut Workspace<A::Value>) -> Sign {
        match self.algorithm {
            CheckNodeAlgorithm::MinSum { scale }
            | CheckNodeAlgorithm::MinSumSelfCorrecting { scale } => {
                self.min_sum(messages, workspace, scale)
            }
            CheckNodeAlgorithm::LambdaMin { minima } => {
                self.lambda_min(messages, workspace, minima)
            }
            CheckNodeAlgorithm::Lambda3Min3Mag => self.lambda_3min_3mag(messages, workspace),
            CheckNodeAlgorithm::SplitRow {
                variant,
                scale,
                partitions,
                ..
            } => self.split_row(messages, workspace, variant, scale, partitions),
        }
    }

    fn min_sum(
        &self,
        messages: &mut [A::Value],
        workspace: &mut Workspace<A::Value>,
        scale: ExtrinsicScale,
    ) -> Sign {
        let parity = workspace.split(messages);
        let (min1, min1_index) = minimum(&workspace.magnitudes);
        workspace.magnitudes[min1_index] = self.bound;
        let (min2, _) = minimum(&workspace.magnitudes);
        let min1 = self.arithmetic.scale_extrinsic(min1, scale);
        let min2 = self.arithmetic.scale_extrinsic(min2, scale);
        for (j, (message, &sign)) in messages.iter_mut().zip(&workspace.signs).enumerate() {
            let magnitude = if j == min1_index { min2 } else { min1 };
            *message = (sign * parity).apply(magnitude);
        }
        parity
    }

    fn lambda_min(
        &self,
        messages: &mut [A::Value],
        workspace: &mut Workspace<A::Value>,
        minima: usize,
    ) -> Sign {
        let parity = workspace.split(messages);
        let replacement = self.bound + A::Value::one();
        let mut found = [(A::Value::default(), usize::MAX); 3];
        for min in found.iter_mut().take(minima) {
            *min = minimum(&workspace.magnitudes);
            workspace.magnitudes[min.1] = replacement;
        }
        let [(m0, i0), (m1, i1), (m2, i2)] = found;
        let a = self.arithmetic;
        let m01 = a.minstar(m0, m1);
        let (to_i0, to_i1, others) = if minima == 2 {
            (m1, m0, m01)
        } else {
            (a.minstar(m1, m2), a.minstar(m0, m2), a.minstar(m01, m2))
        };
        for (j, (message, &sign)) in messages.iter_mut().zip(&workspace.signs).enumerate() {
            let magnitude = if j == i0 {
                to_i0
            } else if j == i1 {
                to_i1
            } else if j == i2 {
                m01
            } else {
                others
            };
            *message = (sign * parity).apply(magnitude);
        }
        parity
    }

    fn lambda_3min_3mag(
        &self,
        messages: &mut [A::Value],
        workspace: &mut Workspace<A::Value>,
    ) -> Sign {
        let parity = workspace.split(messages);
        let mut found = [(A::Value::default(), 0); 3];
        for min in found.iter_mut() {
            *min = minimum(&workspace.magnitudes);
            workspace.magnitudes[min.1] = self.bound;
        }
        let [(m0, i0), (m1, i1), (m2, _)] = found;
        let a = self.arithmetic;
        let to_i0 = a.minstar(m1, m2);
        let to_i1 = a.minstar(m0, m2);
        let others = a.minstar(m0, m1);
        for (j, (message, &sign)) in messages.iter_mut().zip(&workspace.signs).enumerate() {
            let magnitude = if j == i0 {
                to_i0
            } else if j == i1 {
                to_i1
            } else {
                others
            };
            *message = (sign * parity).apply(magnitude);
        }
        parity
    }

    fn split_row(
        &self,
        messages: &mut [A::Value],
        workspace: &mut Workspace<A::Value>,
        variant: SplitRowVariant,
        scale: ExtrinsicScale,
        partitions: usize,
    ) -> Sign {
        workspace.split(messages);
        let width = messages.len() / partitions;
        let threshold = self.threshold;
        workspace.partitions.clear();
        for (magnitudes, signs) in workspace
            .magnitudes
            .chunks_mut(width)
            .zip(workspace.signs.chunks(width))
        {
            let (min1, min1_index) = bounded_minimum(magnitudes, self.bound);
            magnitudes[min1_index] = self.bound;
            let (min2, _) = bounded_minimum(magnitudes, self.bound);
            workspace.partitions.push(Partition {
                sign: signs.iter().copied().product(),
                min1,
                min1_index,
                min2,
                enabled: min1 <= threshold,
            });
        }

        let parts = &workspace.partitions;
        let neighbor_enabled = |p: usize| {
            if p == 0 {
                parts[1].enabled
            } else if p == partitions - 1 {
                parts[p - 1].enabled
            } else {
                parts[p - 1].enabled || parts[p + 1].enabled
            }
        };
        for (p, ((outputs, signs), part)) in messages
            .chunks_mut(width)
            .zip(workspace.signs.chunks(width))
            .zip(parts)
            .enumerate()
        {
            let local = (part.min1, part.min2);
            let (min1, min2) = match variant {
                SplitRowVariant::Improved | SplitRowVariant::SelfCorrecting => {
                    if part.min1 <= threshold {
                        if part.min2 > threshold && neighbor_enabled(p) {
                            (part.min1, threshold)
                        } else {
                            local
                        }
                    } else if neighbor_enabled(p) {
                        (threshold, threshold)
                    } else {
                        local
                    }
                }
                SplitRowVariant::Threshold => {
                    if part.min1 > threshold && neighbor_enabled(p) {
                        (threshold, threshold)
                    } else {
                        local
                    }
                }
            };
            let min1 = self.arithmetic.scale_extrinsic(min1, scale);
            let min2 = self.arithmetic.scale_extrinsic(min2, scale);
            for (j, (output, &sign)) in outputs.iter_mut().zip(signs).enumerate() {
                let magnitude = if j == part.min1_index { min2 } else { min1 };
                *output = (sign * part.sign).apply(magnitude);
            }
        }

        // Only signs travel between partitions
        for p in 1..partitions {
            let (left, right) = messages.split_at_mut(p * width);
            let previous = &mut left[(p - 1) * width..];
            let current = &mut right[..width];
            for x in previous.iter_mut() {
                *x = parts[p].sign.apply(*x);
            }
            for x in current.iter_mut() {
                *x = parts[p - 1].sign.apply(*x);
            }
        }
        parts.iter().map(|part| part.sign).product()
    }
}
