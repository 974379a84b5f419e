//! Edge routing.
//!
//! The Tanner graph is described by two tables, indexed by
//! `group * max_check_degree + slot`. For each edge slot of a check node
//! group, the address table gives the variable node group that the edge
//! connects to (or `-1` if the slot is unused), and the shift table gives the
//! cyclic shift that selects the lane of the APP memory for each check node of
//! the group.

use super::{config::DecoderConfig, Error};

/// Routing tables.
///
/// The tables are built for a particular lane count, since the shifts are
/// taken modulo the number of lanes.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RoutingTables {
    lanes: usize,
    max_check_degree: usize,
    addresses: Vec<i32>,
    shifts: Vec<i32>,
}

impl RoutingTables {
    /// Creates routing tables.
    ///
    /// The `addresses` and `shifts` tables are indexed by
    /// `group * max_check_degree + slot`. An address of `-1` marks an
    /// unconnected slot. The contents of the tables are checked against the
    /// decoder configuration when the decoder is built.
    pub fn new(
        lanes: usize,
        max_check_degree: usize,
        addresses: Vec<i32>,
        shifts: Vec<i32>,
    ) -> RoutingTables {
        RoutingTables {
            lanes,
            max_check_degree,
            addresses,
            shifts,
        }
    }

    /// Returns the lane count the tables were built for.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Returns the number of edge slots per check node group.
    pub fn max_check_degree(&self) -> usize {
        self.max_check_degree
    }

    /// Returns the address table.
    pub fn addresses(&self) -> &[i32] {
        &self.addresses
    }

    /// Returns the shift table.
    pub fn shifts(&self) -> &[i32] {
        &self.shifts
    }

    /// Returns the number of check node groups described by the tables.
    pub fn num_groups(&self) -> usize {
        if self.max_check_degree == 0 {
            0
        } else {
            self.addresses.len() / self.max_check_degree
        }
    }

    /// Reverses the direction of the cyclic shifts.
    ///
    /// Each non-zero shift `s` is replaced by `lanes - s`. This converts
    /// tables generated for a hardware that rotates in the opposite direction.
    pub fn flip_shift_direction(&mut self) {
        let lanes = self.lanes as i32;
        for shift in self.shifts.iter_mut().filter(|s| **s > 0) {
            *shift = lanes - *shift;
        }
    }

    /// Checks the tables against a decoder configuration.
    ///
    /// Every connected edge slot must address an existing variable node group
    /// and have a shift in `0..lanes`.
    pub fn validate(&self, config: &DecoderConfig) -> Result<(), Error> {
        if self.lanes != config.lanes {
            return Err(Error::TableLanes {
                tables: self.lanes,
                lanes: config.lanes,
            });
        }
        if self.max_check_degree != config.max_check_degree {
            return Err(Error::TableDegree {
                tables: self.max_check_degree,
                degree: config.max_check_degree,
            });
        }
        let expected = config.num_edge_slots();
        for found in [self.addresses.len(), self.shifts.len()] {
            if found != expected {
                return Err(Error::TableLength { expected, found });
            }
        }
        let groups = config.num_variable_node_groups();
        for (slot, (&address, &shift)) in self.addresses.iter().zip(&self.shifts).enumerate() {
            if address == -1 {
                continue;
            }
            if address < 0 || address as usize >= groups {
                return Err(Error::TableAddress {
                    slot,
                    address,
                    groups,
                });
            }
            if shift < 0 || shift as usize >= self.lanes {
                return Err(Error::TableShift {
                    slot,
                    shift,
                    lanes: self.lanes,
                });
            }
        }
        Ok(())
    }
}

/// Destination of an edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Route {
    /// Regular edge.
    Connected {
        /// Lane of the APP memory.
        lane: usize,
        /// Address of the APP memory (variable node group).
        address: usize,
        /// Address of the message memory.
        edge: usize,
    },
    /// Unused edge slot.
    ///
    /// The check node sees the neutral element and no memory is accessed.
    Unconnected,
    /// First edge of the accumulator chain of an IRA code.
    ///
    /// The check node sees the neutral element and the message written back
    /// for this edge is zero.
    Virtual {
        /// Lane of the APP memory.
        lane: usize,
        /// Address of the APP memory (variable node group).
        address: usize,
        /// Address of the message memory.
        edge: usize,
    },
}

/// Edge router.
///
/// Resolves the edge slots of the check node functional units using the
/// routing tables.
#[derive(Debug, Clone)]
pub struct Router<'a> {
    tables: &'a RoutingTables,
    lanes: usize,
    degree: usize,
    accumulator_start: Option<usize>,
}

impl<'a> Router<'a> {
    /// Creates a router.
    ///
    /// The tables must have been validated against `config`.
    pub fn new(tables: &'a RoutingTables, config: &DecoderConfig) -> Router<'a> {
        Router {
            tables,
            lanes: config.lanes,
            degree: config.max_check_degree,
            accumulator_start: config
                .is_ira()
                .then(|| config.num_variable_node_groups() - 1),
        }
    }

    /// Returns the number of edge slots per check node.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the number of check node groups.
    pub fn num_groups(&self) -> usize {
        self.tables.num_groups()
    }

    /// Resolves an edge slot of a check node functional unit.
    ///
    /// The check node is the one processed by the functional unit `unit` when
    /// the check node group `group` is processed.
    pub fn resolve(&self, group: usize, unit: usize, slot: usize) -> Route {
        let edge = group * self.degree + slot;
        let address = self.tables.addresses[edge];
        if address < 0 {
            return Route::Unconnected;
        }
        let address = address as usize;
        let shift = self.tables.shifts[edge] as usize;
        let lane = (shift + unit) % self.lanes;
        if unit == 0 && shift == self.lanes - 1 && Some(address) == self.accumulator_start {
            Route::Virtual {
                lane,
                address,
                edge,
            }
        } else {
            Route::Connected {
                lane,
                address,
                edge,
            }
        }
    }

    /// Returns an iterator over the routes of all the edge slots of a check
    /// node.
    pub fn routes(&self, group: usize, unit: usize) -> impl Iterator<Item = Route> + '_ {
        (0..self.degree).map(move |slot| self.resolve(group, unit, slot))
    }
}
