use super::commands;
use super::commands::asr::AsrQuery;
use clap::{ArgAction, Parser, Subcommand};
use plmkit_core::InterpolationScheme;
use plmkit_io::AMP_THRESHOLD;
use plmkit_models::ESM2Models;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "plmkit", author, version, about, long_about = None)]
pub struct Cli {
    /// Raise the default log level (-v debug, -vv trace). Per-target
    /// `RUST_LOG` directives still apply on top.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode sequences along an interpolation path between two proteins
    Interpolate {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Number of points on the path, endpoints included
        #[arg(long, default_value_t = 10)]
        steps: usize,
        #[arg(long, default_value = "linear")]
        scheme: InterpolationScheme,
        #[arg(long, default_value = "t6-8m")]
        model: ESM2Models,
        #[arg(long)]
        cpu: bool,
        /// safetensors file holding `mean` and `std` embedding statistics
        #[arg(long)]
        normalizer: Option<PathBuf>,
        /// Write JSON records here instead of a table on stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Query a FireProt ASR posterior table
    Asr {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        node: i64,
        #[command(subcommand)]
        query: AsrQuery,
    },
    /// Count predicted antimicrobial peptides per sequence length
    Amp {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = AMP_THRESHOLD)]
        threshold: f64,
    },
}

impl Cli {
    pub fn init_logging(&self) {
        let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let filter = log_filter(self.verbose, env.as_deref());
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Interpolate {
                start,
                end,
                steps,
                scheme,
                model,
                cpu,
                normalizer,
                output,
            } => commands::interpolate::execute(commands::interpolate::InterpolateArgs {
                start,
                end,
                steps,
                scheme,
                model,
                cpu,
                normalizer,
                output,
            }),
            Commands::Asr { input, node, query } => commands::asr::execute(input, node, query),
            Commands::Amp { input, threshold } => commands::amp::execute(input, threshold),
        }
    }
}

/// `RUST_LOG` directives (default `info`), with `-v`/`-vv` replacing the
/// default level. Target-specific directives are kept.
fn log_filter(verbose: u8, env: Option<&str>) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(env.unwrap_or_default());
    match verbose {
        0 => filter,
        1 => filter.add_directive(LevelFilter::DEBUG.into()),
        _ => filter.add_directive(LevelFilter::TRACE.into()),
    }
}
