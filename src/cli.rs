use clap::{Parser, Subcommand};
use mkvtidy_av::Parser as ProbeParser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkvtidy")]
#[command(author, version, about = "Probe media files and tidy them into clean matroska")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and display its tracks
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Tool to probe with: mkvmerge, ffprobe or mediainfo (default: first that works)
        #[arg(long)]
        parser: Option<ProbeParser>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remux files into matroska without re-encoding
    Remux {
        /// Files to remux
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Re-encode files into matroska
    Convert {
        /// Files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Use HandBrake instead of ffmpeg
        #[arg(long)]
        handbrake: bool,
    },

    /// Re-encode files into matroska with de-interlacing
    Deinterlace {
        /// Files to de-interlace
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remux files into matroska and remove tracks in unwanted languages
    Process {
        /// Files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
