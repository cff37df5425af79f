use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "safesurf-guard", version, about = "Blurs page images until a classifier clears them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch a page and classify every image it shows
    Watch {
        /// Page to load and poll for new images
        url: Url,
    },
    /// Print scanned/blocked counters
    Stats,
    /// Turn protection on or off, or show the current setting
    Protection {
        #[arg(value_enum)]
        state: ProtectionState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtectionState {
    On,
    Off,
    Status,
}
