//! Quasi-cyclic base matrices.
//!
//! This module compiles the base (exponent) matrix of a quasi-cyclic LDPC code
//! into the [`RoutingTables`] and [`DecoderConfig`] of a decoder whose lane
//! count equals the circulant size. Each row of the base matrix becomes a
//! check node group, and each column a variable node group.
//!
//! The text format is one row per line, with whitespace separated integers.
//! An entry of `-1` denotes an all-zero block, and a non-negative entry `s`
//! denotes the identity matrix cyclically shifted by `s` columns. Empty lines
//! and lines starting with `#` are ignored.
//!
//! # Examples
//!
//! ```
//! # use ldpc_hwdec::base_matrix::BaseMatrix;
//! let base: BaseMatrix = "0 1 -1\n2 -1 0".parse().unwrap();
//! let tables = base.routing_tables(4).unwrap();
//! assert_eq!(tables.addresses(), &[0, 1, 0, 2]);
//! assert_eq!(tables.shifts(), &[0, 1, 2, 0]);
//! ```

use crate::decoder::{
    arithmetic::Quantization,
    check_node::CheckNodeAlgorithm,
    config::{CodeStructure, DecoderConfig},
    router::RoutingTables,
};
use thiserror::Error;

/// Base matrix error.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Error {
    /// The matrix has no entries.
    #[error("the base matrix is empty")]
    Empty,
    /// An entry could not be parsed.
    #[error("invalid entry '{entry}' in line {line}")]
    Parse {
        /// Line number (starting by 1).
        line: usize,
        /// Entry that failed to parse.
        entry: String,
    },
    /// An entry is smaller than -1.
    #[error("invalid shift {shift} in line {line}")]
    NegativeShift {
        /// Line number (starting by 1).
        line: usize,
        /// Shift found.
        shift: i32,
    },
    /// A row has a different number of entries than the first one.
    #[error("line {line} has {found} entries, but the matrix has {expected} columns")]
    Ragged {
        /// Line number (starting by 1).
        line: usize,
        /// Number of entries found.
        found: usize,
        /// Number of columns of the matrix.
        expected: usize,
    },
    /// A shift is too large for the circulant size.
    #[error("shift {shift} in row {row}, column {column} is not smaller than the circulant size {lanes}")]
    Shift {
        /// Row of the entry.
        row: usize,
        /// Column of the entry.
        column: usize,
        /// Shift found.
        shift: usize,
        /// Circulant size.
        lanes: usize,
    },
}

/// Base matrix of a quasi-cyclic LDPC code.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BaseMatrix {
    rows: Vec<Vec<Option<usize>>>,
    num_cols: usize,
}

impl BaseMatrix {
    /// Returns the number of rows (check node groups).
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns (variable node groups).
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Returns the shift of an entry, or `None` for a zero block.
    ///
    /// # Panics
    ///
    /// This function panics if the entry is out of range.
    pub fn entry(&self, row: usize, column: usize) -> Option<usize> {
        self.rows[row][column]
    }

    /// Returns the largest number of non-zero blocks in a row.
    ///
    /// This is the maximum check node degree of the code.
    pub fn max_row_weight(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().flatten().count())
            .max()
            .unwrap_or(0)
    }

    /// Builds the routing tables for a circulant size of `lanes`.
    ///
    /// The edge slots of each check node group list the non-zero blocks of
    /// the corresponding row in column order. Rows with fewer blocks than the
    /// maximum row weight are padded with unconnected slots.
    pub fn routing_tables(&self, lanes: usize) -> Result<RoutingTables, Error> {
        let degree = self.max_row_weight();
        let mut addresses = Vec::with_capacity(self.num_rows() * degree);
        let mut shifts = Vec::with_capacity(self.num_rows() * degree);
        for (row, entries) in self.rows.iter().enumerate() {
            let mut weight = 0;
            for (column, &entry) in entries.iter().enumerate() {
                let Some(shift) = entry else { continue };
                if shift >= lanes {
                    return Err(Error::Shift {
                        row,
                        column,
                        shift,
                        lanes,
                    });
                }
                addresses.push(column as i32);
                shifts.push(shift as i32);
                weight += 1;
            }
            for _ in weight..degree {
                addresses.push(-1);
                shifts.push(0);
            }
        }
        Ok(RoutingTables::new(lanes, degree, addresses, shifts))
    }

    /// Builds the decoder configuration for a circulant size of `lanes`.
    ///
    /// The code is treated as a generic structured code whose source
    /// parallelism is the circulant size.
    pub fn config(
        &self,
        lanes: usize,
        algorithm: CheckNodeAlgorithm,
        quantization: Quantization,
    ) -> DecoderConfig {
        DecoderConfig {
            num_variable_nodes: self.num_cols * lanes,
            num_check_nodes: self.num_rows() * lanes,
            max_check_degree: self.max_row_weight(),
            source_parallelism: lanes,
            lanes,
            code_structure: CodeStructure::Structured,
            algorithm,
            quantization,
        }
    }
}

impl std::str::FromStr for BaseMatrix {
    type Err = Error;

    fn from_str(s: &str) -> Result<BaseMatrix, Error> {
        let mut rows = Vec::new();
        let mut num_cols = None;
        for (j, line) in s.lines().enumerate() {
            let line_number = j + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|entry| {
                    let shift = entry.parse::<i32>().map_err(|_| Error::Parse {
                        line: line_number,
                        entry: entry.to_string(),
                    })?;
                    match shift {
                        -1 => Ok(None),
                        s if s >= 0 => Ok(Some(s as usize)),
                        s => Err(Error::NegativeShift {
                            line: line_number,
                            shift: s,
                        }),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            let expected = *num_cols.get_or_insert(row.len());
            if row.len() != expected {
                return Err(Error::Ragged {
                    line: line_number,
                    found: row.len(),
                    expected,
                });
            }
            rows.push(row);
        }
        match num_cols {
            Some(num_cols) => Ok(BaseMatrix { rows, num_cols }),
            None => Err(Error::Empty),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::arithmetic::ExtrinsicScale;

    #[test]
    fn parse() {
        let base: BaseMatrix = "# comment\n 0 -1 3\n\n2 1 -1\n".parse().unwrap();
        assert_eq!(base.num_rows(), 2);
        assert_eq!(base.num_cols(), 3);
        assert_eq!(base.entry(0, 0), Some(0));
        assert_eq!(base.entry(0, 1), None);
        assert_eq!(base.entry(1, 1), Some(1));
        assert_eq!(base.max_row_weight(), 2);
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<BaseMatrix>(), Err(Error::Empty));
        assert_eq!(
            "0 1\n2 x".parse::<BaseMatrix>(),
            Err(Error::Parse {
                line: 2,
                entry: "x".to_string()
            })
        );
        assert_eq!(
            "0 1\n2 -3".parse::<BaseMatrix>(),
            Err(Error::NegativeShift { line: 2, shift: -3 })
        );
        assert_eq!(
            "0 1\n\n2".parse::<BaseMatrix>(),
            Err(Error::Ragged {
                line: 3,
                found: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn tables() {
        let base: BaseMatrix = "0 -1 3 1\n2 1 -1 -1".parse().unwrap();
        let tables = base.routing_tables(4).unwrap();
        assert_eq!(tables.lanes(), 4);
        assert_eq!(tables.max_check_degree(), 3);
        assert_eq!(tables.addresses(), &[0, 2, 3, 0, 1, -1]);
        assert_eq!(tables.shifts(), &[0, 3, 1, 2, 1, 0]);
        assert_eq!(
            base.routing_tables(3),
            Err(Error::Shift {
                row: 0,
                column: 2,
                shift: 3,
                lanes: 3
            })
        );
    }

    #[test]
    fn config() {
        let base: BaseMatrix = "0 -1 3 1\n2 1 -1 -1".parse().unwrap();
        let config = base.config(
            4,
            CheckNodeAlgorithm::MinSum {
                scale: ExtrinsicScale::SevenEighths,
            },
            Quantization::six_bit(),
        );
        assert_eq!(config.num_variable_nodes, 16);
        assert_eq!(config.num_check_nodes, 8);
        assert_eq!(config.max_check_degree, 3);
        config.validate().unwrap();
        base.routing_tables(4).unwrap().validate(&config).unwrap();
    }
}
