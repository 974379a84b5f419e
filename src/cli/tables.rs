//! Routing tables CLI subcommand.
//!
//! This subcommand compiles a base matrix into the address and shift tables
//! loaded by the decoder, checks them against the decoder configuration, and
//! prints them with one line per check node group.
//!
//! # Examples
//!
//! ```shell
//! $ ldpc-hwdec tables --lanes 7 code.txt
//! ```
//!
//! Each line lists the `address:shift` pairs of the edge slots of a group,
//! with `-` for unconnected slots. The `--flip` option prints the tables for a
//! datapath that rotates in the opposite direction.

use crate::{
    base_matrix::BaseMatrix,
    cli::{DecoderArgs, Run},
    decoder::router::RoutingTables,
};
use clap::Parser;
use std::{error::Error, io::Write, path::PathBuf};

/// Routing tables CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Prints the decoder routing tables of a base matrix")]
pub struct Args {
    /// Base matrix file for the code
    pub base_matrix: PathBuf,
    /// Number of lanes (circulant size)
    #[arg(long)]
    pub lanes: usize,
    /// Reverse the direction of the cyclic shifts
    #[arg(long)]
    pub flip: bool,
    /// Decoder parameters
    #[command(flatten)]
    pub decoder_args: DecoderArgs,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let base: BaseMatrix = std::fs::read_to_string(&self.base_matrix)?.parse()?;
        let config = base.config(
            self.lanes,
            self.decoder_args.algorithm()?,
            self.decoder_args.quantization(),
        );
        config.validate()?;
        let mut tables = base.routing_tables(self.lanes)?;
        tables.validate(&config)?;
        if self.flip {
            tables.flip_shift_direction();
        }
        write_tables(std::io::stdout().lock(), &tables)?;
        Ok(())
    }
}

fn write_tables<W: Write>(mut f: W, tables: &RoutingTables) -> std::io::Result<()> {
    let degree = tables.max_check_degree();
    for group in 0..tables.num_groups() {
        let slots = group * degree..(group + 1) * degree;
        let entries = tables.addresses()[slots.clone()]
            .iter()
            .zip(&tables.shifts()[slots])
            .map(|(&address, &shift)| {
                if address < 0 {
                    "-".to_string()
                } else {
                    format!("{address}:{shift}")
                }
            })
            .collect::<Vec<_>>();
        writeln!(f, "{group:4}: {}", entries.join(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format() {
        let base: BaseMatrix = "0 -1 3 1\n2 1 -1 -1".parse().unwrap();
        let mut tables = base.routing_tables(4).unwrap();
        let mut out = Vec::new();
        write_tables(&mut out, &tables).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   0: 0:0 2:3 3:1\n   1: 0:2 1:1 -\n"
        );
        tables.flip_shift_direction();
        let mut out = Vec::new();
        write_tables(&mut out, &tables).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   0: 0:0 2:1 3:3\n   1: 0:2 1:3 -\n"
        );
    }
}
