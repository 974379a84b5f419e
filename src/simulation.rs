//! Simulation.
//!
//! This module contains utilities to simulate the BER in an AWGN channel.

pub mod ber;
pub mod channel;
