// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod i2s;
mod render;
mod solve;
mod sysclk;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Clock-tree solver tasks", long_about = None)]
#[command(version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// STM32F4 main PLL: fastest SYSCLK with a 48 MHz USB clock
    Sysclk {
        /// SYSCLK ceiling in Hz
        #[arg(long, default_value_t = 180_000_000)]
        max: i64,
        /// List every legal setting instead of the best one
        #[arg(long)]
        all: bool,
        /// List every setting giving exactly this SYSCLK (no VCO window checks)
        #[arg(long, conflicts_with_all = ["max", "all"])]
        exact: Option<i64>,
    },
    /// STM32F4 PLLI2S: settings for an audio sample rate
    I2s {
        /// Target sample rate in Hz, e.g. 44100 or 35156.25
        #[arg(long)]
        fs: String,
        /// Channel length in bits (16 or 32); both when omitted
        #[arg(long)]
        chlen: Option<u32>,
        /// Master clock output enabled; both when omitted
        #[arg(long)]
        mckoe: Option<bool>,
        /// Relative tolerance
        #[arg(long, default_value_t = clocktree::DEFAULT_TOLERANCE)]
        tolerance: f64,
        /// Print only the first N settings
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Solve a declarative JSON clock tree
    Solve {
        /// Path to the tree config
        config: PathBuf,
        /// Report only the best match (needs an objective)
        #[arg(long)]
        best: bool,
    },
    /// Evaluate one assignment of a declarative JSON clock tree
    Eval {
        /// Path to the tree config
        config: PathBuf,
        /// Stage values as NAME=VALUE
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sysclk { max, all, exact } => sysclk::run(max, all, exact),
        Commands::I2s { fs, chlen, mckoe, tolerance, limit } => {
            i2s::run(&fs, chlen, mckoe, tolerance, limit)
        }
        Commands::Solve { config, best } => solve::run(&config, best),
        Commands::Eval { config, assignments } => solve::eval(&config, &assignments),
    }
}
