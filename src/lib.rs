//! # LDPC hardware decoder
//!
//! `ldpc_hwdec` is a bit-accurate model of the iterative message passing
//! engine of a hardware LDPC decoder. It reproduces the fixed point
//! arithmetic, the folded memory addressing and the check node algorithms of
//! an ASIC or FPGA datapath, so that its results can be compared bit by bit
//! against a hardware implementation.
//!
//! The decoder is in the [`decoder`] module. The Tanner graph is given by
//! routing tables, which can be compiled from the base matrix of a
//! quasi-cyclic code with [`base_matrix`]. The [`simulation`] module and the
//! CLI tool (see [`cli`]) run BER simulations over an AWGN channel.

#![warn(missing_docs)]

pub mod base_matrix;
pub mod cli;
pub mod decoder;
pub mod rand;
pub mod simulation;
