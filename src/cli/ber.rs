//! BER test CLI subcommand.
//!
//! This subcommand can be used to perform a BER test of the decoder on a
//! quasi-cyclic LDPC code given by its base matrix (see
//! [`base_matrix`](crate::base_matrix) for the file format).
//!
//! # Examples
//!
//! A code with circulant size 96 can be simulated with the layered
//! schedule and the lambda-min algorithm with
//! ```shell
//! $ ldpc-hwdec ber --lanes 96 --algorithm lambda-min --lambda 3 \
//!       --min-ebn0 1.0 --max-ebn0 3.05 --step-ebn0 0.25 code.txt
//! ```

use crate::{
    base_matrix::BaseMatrix,
    cli::{DecoderArgs, Run},
    decoder::factory::{DecoderFactory, DecoderImplementation},
    simulation::ber::{BerTest, Report, Reporter, Statistics},
};
use clap::{Parser, ValueEnum};
use console::Term;
use std::{
    error::Error,
    fs::File,
    io::Write,
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    time::Duration,
};

/// BER test CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Performs a BER simulation")]
pub struct Args<Dec: DecoderFactory + ValueEnum = DecoderImplementation> {
    /// Base matrix file for the code
    pub base_matrix: PathBuf,
    /// Number of lanes (circulant size)
    #[arg(long)]
    pub lanes: usize,
    /// Output file for simulation results
    #[arg(long)]
    pub output_file: Option<PathBuf>,
    /// Decoder implementation
    #[arg(long, default_value = "FixedPoint")]
    pub decoder: Dec,
    /// Decoder parameters
    #[command(flatten)]
    pub decoder_args: DecoderArgs,
    /// Minimum Eb/N0 (dB)
    #[arg(long)]
    pub min_ebn0: f64,
    /// Maximum Eb/N0 (dB)
    #[arg(long)]
    pub max_ebn0: f64,
    /// Eb/N0 step (dB)
    #[arg(long)]
    pub step_ebn0: f64,
    /// Maximum number of iterations
    #[arg(long, default_value = "20")]
    pub max_iter: usize,
    /// Number of frame errors to collect
    #[arg(long, default_value = "100")]
    pub frame_errors: u64,
    /// Seed of the noise generator
    #[arg(long, default_value = "0")]
    pub seed: u64,
}

impl<Dec: DecoderFactory + ValueEnum> Run for Args<Dec> {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let base: BaseMatrix = std::fs::read_to_string(&self.base_matrix)?.parse()?;
        let config = base.config(
            self.lanes,
            self.decoder_args.algorithm()?,
            self.decoder_args.quantization(),
        );
        let tables = base.routing_tables(self.lanes)?;
        let mut output_file = if let Some(f) = &self.output_file {
            Some(File::create(f)?)
        } else {
            None
        };
        let ebn0s = self.ebn0s();
        let (report_tx, report_rx) = mpsc::channel();
        let reporter = Reporter {
            tx: report_tx,
            interval: Duration::from_millis(500),
        };
        let test = BerTest::new(
            self.decoder.clone(),
            config,
            tables,
            self.decoder_args.schedule(),
            self.frame_errors,
            self.max_iter,
            &ebn0s,
            self.seed,
            Some(reporter),
        )?;
        self.write_details(std::io::stdout(), &test)?;
        if let Some(f) = &mut output_file {
            self.write_details(&*f, &test)?;
        }
        let mut progress = Progress::new(report_rx, output_file);
        let progress = std::thread::spawn(move || progress.run());
        test.run()?;
        match progress.join() {
            Ok(result) => result.map_err(|e| e as Box<dyn Error>),
            Err(_) => Err("progress reporting thread panicked".into()),
        }
    }
}

impl<Dec: DecoderFactory + ValueEnum> Args<Dec> {
    fn ebn0s(&self) -> Vec<f32> {
        let num_ebn0s = ((self.max_ebn0 - self.min_ebn0) / self.step_ebn0).floor() as usize + 1;
        (0..num_ebn0s)
            .map(|k| (self.min_ebn0 + k as f64 * self.step_ebn0) as f32)
            .collect()
    }

    fn write_details<W: Write>(&self, mut f: W, test: &BerTest<Dec>) -> std::io::Result<()> {
        writeln!(f, "BER TEST PARAMETERS")?;
        writeln!(f, "-------------------")?;
        writeln!(f, "Simulation:")?;
        writeln!(f, " - Minimum Eb/N0: {:.2} dB", self.min_ebn0)?;
        writeln!(f, " - Maximum Eb/N0: {:.2} dB", self.max_ebn0)?;
        writeln!(f, " - Eb/N0 step: {:.2} dB", self.step_ebn0)?;
        writeln!(f, " - Number of frame errors: {}", self.frame_errors)?;
        writeln!(f, " - Seed: {}", self.seed)?;
        writeln!(f, "LDPC code:")?;
        writeln!(f, " - Base matrix: {}", self.base_matrix.display())?;
        writeln!(f, " - Information bits (k): {}", test.k())?;
        writeln!(f, " - Codeword size (N): {}", test.n())?;
        writeln!(f, " - Code rate: {:.3}", test.rate())?;
        writeln!(f, "LDPC decoder:")?;
        writeln!(f, " - Implementation: {}", self.decoder)?;
        writeln!(f, " - Lanes: {}", self.lanes)?;
        match self.decoder_args.algorithm() {
            Ok(algorithm) => writeln!(f, " - Algorithm: {algorithm}")?,
            Err(e) => writeln!(f, " - Algorithm: {e}")?,
        }
        writeln!(f, " - Schedule: {}", self.decoder_args.schedule())?;
        let quantization = self.decoder_args.quantization();
        writeln!(
            f,
            " - Quantization: {} fractional bits, extrinsic max {}, APP max {}",
            quantization.fractional_bits, quantization.extrinsic_max, quantization.app_max
        )?;
        writeln!(f, " - Maximum iterations: {}", self.max_iter)?;
        writeln!(f)?;
        Ok(())
    }
}

#[derive(Debug)]
struct Progress {
    rx: Receiver<Report>,
    term: Term,
    output_file: Option<File>,
}

impl Progress {
    fn new(rx: Receiver<Report>, output_file: Option<File>) -> Progress {
        Progress {
            rx,
            term: Term::stdout(),
            output_file,
        }
    }

    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        ctrlc::set_handler({
            let term = self.term.clone();
            move || {
                let _ = term.write_line("");
                let _ = term.show_cursor();
                std::process::exit(0);
            }
        })?;

        let ret = self.work();
        self.term.write_line("")?;
        self.term.show_cursor()?;
        ret
    }

    fn work(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        self.term.set_title("ldpc-hwdec ber");
        self.term.hide_cursor()?;
        self.term.write_line(Self::format_header())?;
        if let Some(f) = &mut self.output_file {
            writeln!(f, "{}", Self::format_header())?;
        }
        let mut last_stats: Option<Statistics> = None;
        loop {
            // The sender is dropped without a Finished report only if the
            // BER test fails, and the error is reported by the test.
            let Ok(report) = self.rx.recv() else {
                return Ok(());
            };
            let Report::Statistics(stats) = report else {
                // BER test has finished
                if let (Some(f), Some(s)) = (&mut self.output_file, &last_stats) {
                    writeln!(f, "{}", Self::format_progress(s))?;
                }
                return Ok(());
            };
            if let Some(s) = &last_stats {
                if s.ebn0_db != stats.ebn0_db {
                    if let Some(f) = &mut self.output_file {
                        writeln!(f, "{}", Self::format_progress(s))?;
                    }
                } else {
                    self.term.move_cursor_up(1)?;
                    self.term.clear_line()?;
                }
            }
            self.term.write_line(&Self::format_progress(&stats))?;
            last_stats = Some(stats);
        }
    }

    fn format_header() -> &'static str {
        "  Eb/N0 |   Frames | Bit errs | Frame er | False de |     BER |     FER | Avg iter | Throughp | Elapsed\n\
         --------|----------|----------|----------|----------|---------|---------|----------|----------|----------"
    }

    fn format_progress(stats: &Statistics) -> String {
        format!(
            "{:7.2} | {:8} | {:8} | {:8} | {:8} | {:7.2e} | {:7.2e} | {:8.1} | {:8.3} | {}",
            stats.ebn0_db,
            stats.num_frames,
            stats.bit_errors,
            stats.frame_errors,
            stats.false_decodes,
            stats.ber,
            stats.fer,
            stats.average_iterations,
            stats.throughput_mbps,
            humantime::format_duration(Duration::from_secs(stats.elapsed.as_secs()))
        )
    }
}
