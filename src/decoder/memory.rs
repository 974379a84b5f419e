//! APP and message memories.
//!
//! The APP memory stores one value per variable node, arranged as
//! `[lane][address]`, where the address is the variable node group. The
//! message memory stores one extrinsic check to variable message per edge,
//! arranged as `[lane][edge slot]`. This module implements the distribution
//! of the channel values into the APP memory (and its inverse), and the
//! assembly and write-back of check node messages.

use super::{
    arithmetic::{DecoderArithmetic, Sign},
    config::DecoderConfig,
    router::{Route, Router},
};
use ndarray::{Array2, ArrayViewMut1};
use num_traits::{Signed, Zero};

/// Decoder decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Decisions<T> {
    /// APP LLRs, in natural order.
    pub llrs: Vec<T>,
    /// Hard decisions, in natural order.
    ///
    /// A bit is `1` if its LLR is negative.
    pub bits: Vec<u8>,
}

/// Layout of the APP memory.
///
/// Maps the (lane, address) positions of the APP memory to indices of the
/// codeword. The code construction has a source parallelism which is a
/// multiple of the lane count, so each lane stores `fold` consecutive
/// variable nodes of a source group in consecutive addresses.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Layout {
    lanes: usize,
    fold: usize,
    addresses: usize,
    uniform_addresses: usize,
    systematic: usize,
    parity_stride: usize,
}

impl Layout {
    /// Creates the layout of the APP memory.
    ///
    /// If `parity_reordering` is `true`, the parity part of the codeword
    /// (the last `C` variable nodes) is interleaved as the accumulator of an
    /// IRA code requires. Otherwise the whole codeword uses the same folded
    /// layout.
    pub fn new(config: &DecoderConfig, parity_reordering: bool) -> Layout {
        let lanes = config.lanes;
        let addresses = config.num_variable_node_groups();
        let systematic = config.num_systematic_nodes();
        Layout {
            lanes,
            fold: config.fold(),
            addresses,
            uniform_addresses: if parity_reordering {
                systematic / lanes
            } else {
                addresses
            },
            systematic,
            parity_stride: config.num_check_nodes / config.source_parallelism,
        }
    }

    /// Returns the number of addresses of the APP memory.
    pub fn num_addresses(&self) -> usize {
        self.addresses
    }

    /// Returns the codeword index stored at a position of the APP memory.
    pub fn channel_index(&self, lane: usize, address: usize) -> usize {
        let fold = self.fold;
        if address < self.uniform_addresses {
            (address / fold) * self.lanes * fold + lane * fold + address % fold
        } else {
            let i = address - self.uniform_addresses;
            self.systematic
                + i / fold
                + (i % fold) * self.parity_stride
                + lane * self.parity_stride * fold
        }
    }

    /// Distributes channel values into the APP memory.
    ///
    /// # Panics
    ///
    /// This function panics if `channel` is shorter than the codeword.
    pub fn distribute<T: Copy>(&self, channel: &[T], app: &mut Array2<T>) {
        for ((lane, address), value) in app.indexed_iter_mut() {
            *value = channel[self.channel_index(lane, address)];
        }
    }

    /// Reads the APP memory back into natural order and computes hard
    /// decisions.
    pub fn collect<T: Signed + PartialOrd + Copy>(&self, app: &Array2<T>) -> Decisions<T> {
        let mut llrs = vec![T::zero(); self.lanes * self.addresses];
        for ((lane, address), &value) in app.indexed_iter() {
            llrs[self.channel_index(lane, address)] = value;
        }
        let bits = llrs.iter().map(|&x| u8::from(x < T::zero())).collect();
        Decisions { llrs, bits }
    }
}

/// APP and message memories.
#[derive(Debug, Clone)]
pub struct Memory<T> {
    /// APP memory, indexed as `[lane][address]`.
    pub app: Array2<T>,
    /// Message memory, indexed as `[lane][edge slot]`.
    pub messages: Array2<T>,
}

impl<T: Signed + PartialOrd + Copy> Memory<T> {
    /// Assembles the inputs of a check node.
    ///
    /// For each edge slot, the input is the APP value minus the message
    /// written to this edge in the previous iteration, saturated to the
    /// extrinsic range. Unconnected and virtual edges get the neutral element
    /// (the extrinsic bound).
    ///
    /// If `self_correcting` is `true`, an input whose sign differs from the
    /// input of the previous iteration stored in `zeta` is replaced by zero,
    /// unless the stored value is zero. The (possibly replaced) input is
    /// stored in `zeta`.
    ///
    /// Returns `true` if the APP values read satisfy the parity check.
    #[allow(clippy::too_many_arguments)]
    pub fn gather<A: DecoderArithmetic<Value = T>>(
        &self,
        arithmetic: &A,
        router: &Router,
        group: usize,
        unit: usize,
        self_correcting: bool,
        mut zeta: ArrayViewMut1<T>,
        inputs: &mut [T],
    ) -> bool {
        let bound = arithmetic.extrinsic_max();
        let mut parity = Sign::Positive;
        for (slot, (route, input)) in router.routes(group, unit).zip(inputs.iter_mut()).enumerate() {
            let (lane, address, edge) = match route {
                Route::Unconnected => {
                    *input = bound;
                    continue;
                }
                Route::Connected {
                    lane,
                    address,
                    edge,
                }
                | Route::Virtual {
                    lane,
                    address,
                    edge,
                } => (lane, address, edge),
            };
            let app = self.app[[lane, address]];
            let mut value = app - self.messages[[lane, edge]];
            if self_correcting {
                let previous = zeta[slot];
                if !previous.is_zero() && Sign::of(value) != Sign::of(previous) {
                    value = T::zero();
                }
                zeta[slot] = value;
            }
            if let Route::Virtual { .. } = route {
                *input = bound;
            } else {
                parity = parity * Sign::of(app);
                *input = arithmetic.saturate(value, bound);
            }
        }
        parity == Sign::Positive
    }

    /// Writes back the outputs of a check node.
    ///
    /// For each connected edge, the old message is removed from the APP value
    /// and the new message is added, saturating after each step. Virtual
    /// edges write a zero message.
    pub fn scatter<A: DecoderArithmetic<Value = T>>(
        &mut self,
        arithmetic: &A,
        router: &Router,
        group: usize,
        unit: usize,
        outputs: &[T],
    ) {
        for (route, &output) in router.routes(group, unit).zip(outputs) {
            let (lane, address, edge, output) = match route {
                Route::Unconnected => continue,
                Route::Connected {
                    lane,
                    address,
                    edge,
                } => (lane, address, edge, output),
                Route::Virtual {
                    lane,
                    address,
                    edge,
                } => (lane, address, edge, T::zero()),
            };
            let app = &mut self.app[[lane, address]];
            let message = &mut self.messages[[lane, edge]];
            let extrinsic = arithmetic.saturate_app(*app - *message);
            *app = arithmetic.saturate_app(extrinsic + output);
            *message = output;
        }
    }

    /// Evaluates the parity of a check node on the APP memory.
    ///
    /// Returns `true` if the hard decisions of the connected variable nodes
    /// satisfy the check. Unconnected and virtual edges do not contribute.
    pub fn app_parity(&self, router: &Router, group: usize, unit: usize) -> bool {
        router
            .routes(group, unit)
            .filter_map(|route| match route {
                Route::Connected { lane, address, .. } => Some(Sign::of(self.app[[lane, address]])),
                _ => None,
            })
            .product::<Sign>()
            == Sign::Positive
    }
}
