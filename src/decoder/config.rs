//! Decoder configuration.
//!
//! The [`DecoderConfig`] collects the parameters that define the decoder
//! hardware: the size of the code, the parallelism of the memories and of the
//! check node functional units, the check node algorithm and the
//! quantization.

use super::{arithmetic::Quantization, check_node::CheckNodeAlgorithm, Error};

/// Structure of the code.
///
/// This determines how the channel values are distributed in the APP memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CodeStructure {
    /// Generic structured code.
    ///
    /// All the variable nodes are stored with the same folded layout.
    #[default]
    Structured,
    /// Irregular repeat-accumulate code.
    ///
    /// The parity part of the codeword is reordered when it is stored in the
    /// APP memory, and the first lane of the last variable node group is the
    /// start of the accumulator chain (see
    /// [`Route::Virtual`](super::router::Route::Virtual)).
    Ira,
}

/// Decoder configuration.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DecoderConfig {
    /// Number of variable nodes (codeword length) `N`.
    pub num_variable_nodes: usize,
    /// Number of check nodes `C`.
    pub num_check_nodes: usize,
    /// Maximum check node degree.
    ///
    /// Each check node group has this number of edge slots in the routing
    /// tables.
    pub max_check_degree: usize,
    /// Source parallelism.
    ///
    /// Parallelism of the code construction. It must be a multiple of the
    /// lane count. The quotient is the folding factor of the APP memory.
    pub source_parallelism: usize,
    /// Number of check node functional units (destination parallelism).
    pub lanes: usize,
    /// Structure of the code.
    pub code_structure: CodeStructure,
    /// Check node algorithm.
    pub algorithm: CheckNodeAlgorithm,
    /// Quantization parameters.
    pub quantization: Quantization,
}

impl DecoderConfig {
    /// Checks that the configuration is consistent.
    ///
    /// [`Decoder::new`](super::Decoder::new) calls this function, so it is
    /// only needed to detect errors earlier.
    pub fn validate(&self) -> Result<(), Error> {
        if self.lanes == 0 {
            return Err(Error::ZeroLanes);
        }
        if self.source_parallelism == 0 || self.source_parallelism % self.lanes != 0 {
            return Err(Error::Parallelism {
                source_parallelism: self.source_parallelism,
                lanes: self.lanes,
            });
        }
        if self.num_check_nodes > self.num_variable_nodes {
            return Err(Error::CheckNodes {
                check_nodes: self.num_check_nodes,
                variable_nodes: self.num_variable_nodes,
            });
        }
        match self.code_structure {
            CodeStructure::Structured => {
                check_multiple(
                    "variable nodes",
                    self.num_variable_nodes,
                    self.source_parallelism,
                )?;
                check_multiple("check nodes", self.num_check_nodes, self.lanes)?;
            }
            CodeStructure::Ira => {
                check_multiple(
                    "systematic nodes",
                    self.num_systematic_nodes(),
                    self.source_parallelism,
                )?;
                check_multiple(
                    "check nodes",
                    self.num_check_nodes,
                    self.source_parallelism,
                )?;
            }
        }
        if self.quantization.extrinsic_max <= 0 || self.quantization.app_max <= 0 {
            return Err(Error::Quantization("saturation bounds must be positive"));
        }
        if self.quantization.fractional_bits > 16 {
            return Err(Error::Quantization("too many fractional bits"));
        }
        self.algorithm.validate(self.max_check_degree)
    }

    /// Returns `true` if the code is an IRA code.
    pub fn is_ira(&self) -> bool {
        self.code_structure == CodeStructure::Ira
    }

    /// Returns the number of systematic nodes `K = N - C`.
    pub fn num_systematic_nodes(&self) -> usize {
        self.num_variable_nodes - self.num_check_nodes
    }

    /// Returns the number of check node groups `C / lanes`.
    pub fn num_check_node_groups(&self) -> usize {
        self.num_check_nodes / self.lanes
    }

    /// Returns the number of variable node groups `N / lanes`.
    ///
    /// This is the number of addresses of the APP memory.
    pub fn num_variable_node_groups(&self) -> usize {
        self.num_variable_nodes / self.lanes
    }

    /// Returns the folding factor `source_parallelism / lanes`.
    pub fn fold(&self) -> usize {
        self.source_parallelism / self.lanes
    }

    /// Returns the number of edge slots per lane.
    ///
    /// This is the number of addresses of the message memory.
    pub fn num_edge_slots(&self) -> usize {
        self.num_check_node_groups() * self.max_check_degree
    }
}

fn check_multiple(what: &'static str, value: usize, divisor: usize) -> Result<(), Error> {
    if value % divisor == 0 {
        Ok(())
    } else {
        Err(Error::NotMultiple {
            what,
            value,
            divisor,
        })
    }
}
