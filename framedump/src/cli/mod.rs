use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod decode;
mod probe;

pub use decode::DecodeCommand;
pub use probe::ProbeCommand;

#[derive(Parser, Debug)]
#[command(name = "framedump")]
#[command(about = "Decode video streams into greymap or raw YUV frame files")]
pub struct Args {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames from one or more media files
    Decode(DecodeCommand),
    /// Print the streams of a media file and exit
    Probe(ProbeCommand),
}

impl Args {
    pub fn run(self) -> Result<()> {
        init_logging(self.verbose, self.quiet)?;

        match self.command {
            Command::Decode(cmd) => cmd.run(),
            Command::Probe(cmd) => cmd.run(),
        }
    }
}

fn default_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    }
}

/**
    Log to stderr, honouring `RUST_LOG` over the verbosity flags.
*/
fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install log subscriber")
}
