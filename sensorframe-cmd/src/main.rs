mod decode;
mod list;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sensorframe::Verbosity;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode captures of demodulated bit rows.
    ///
    /// Each input line is one capture written as `{bits}hex`, with multiple rows
    /// separated by whitespace or `/`. Blank lines and lines starting with `#` are
    /// ignored.
    Decode {
        /// Input file. Reads stdin if not provided or `-`.
        input: Option<PathBuf>,

        /// Decoder diagnostics; repeat for more detail.
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Enable these decoders in addition to the defaults.
        #[arg(short, long, value_delimiter = ',', value_name = "csv")]
        enable: Vec<String>,

        /// Disable these decoders.
        #[arg(short, long, value_delimiter = ',', value_name = "csv")]
        disable: Vec<String>,

        /// Only run these decoders.
        #[arg(long, value_delimiter = ',', value_name = "csv", conflicts_with = "enable")]
        only: Vec<String>,

        /// Reject 7-in-1 frames that fail the digest instead of reporting them as degraded.
        #[arg(long, action)]
        strict_digest: bool,

        /// Number of decode threads. Defaults to the number of CPUs.
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
    /// List available decoders.
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
}

fn verbosity(count: u8) -> Verbosity {
    match count {
        0 => Verbosity::Quiet,
        1 => Verbosity::Verbose,
        2 => Verbosity::Debug,
        _ => Verbosity::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Decode { verbose, .. } => match verbosity(*verbose) {
            Verbosity::Quiet | Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        },
        Commands::List { .. } => "info",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("SENSORFRAME_LOG").unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Decode {
            input,
            verbose,
            enable,
            disable,
            only,
            strict_digest,
            threads,
            format,
        } => decode::decode(
            input.as_deref(),
            &decode::Selection {
                enable,
                disable,
                only,
                strict_digest,
            },
            verbosity(verbose),
            threads,
            &format,
        ),
        Commands::List { format } => list::list(&format),
    }
}
