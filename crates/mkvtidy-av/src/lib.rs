//! # mkvtidy-av
//!
//! Media probing, track selection and matroska conversion.
//!
//! This crate provides:
//! - Probe adapters that turn `mkvmerge`, `ffprobe` and `mediainfo` output
//!   into one [`MediaInfo`] model
//! - [`TrackSelection`] for partitioning tracks into keep and drop sets
//! - [`Converter`] for remuxing, re-encoding, merging and de-interlacing into
//!   matroska with an atomic replace of the original
//!
//! External programs are reached through a [`ToolSet`], which can be built
//! with a custom [`ToolInvoker`] for tests.
//!
//! ## Example
//!
//! ```no_run
//! use mkvtidy_av::{probe, ConvertOptions, Converter, Parser, ToolSet, ToolsConfig, TrackSelection, TrackState};
//! use std::path::Path;
//!
//! let tools = ToolSet::discover(&ToolsConfig::default());
//! let input = Path::new("/media/movie.mkv");
//!
//! let info = probe::probe(&tools, input, Parser::MkvMerge)?;
//! let mut selection = TrackSelection::from_media_by(&info, |t| {
//!     t.is_language_unknown() || t.language == "eng"
//! });
//! selection.set_state(TrackState::Keep, TrackState::Remove);
//!
//! let converter = Converter::new(tools, ConvertOptions::default());
//! converter.remux_to_mkv_selected(input, &selection.selected())?;
//! # Ok::<(), mkvtidy_av::Error>(())
//! ```

pub mod cancel;
pub mod convert;
mod error;
pub mod language;
pub mod probe;
pub mod select;
pub mod tools;

pub use cancel::CancelFlag;
pub use convert::{ConvertOptions, Converter};
pub use error::{Error, Result};
pub use probe::{probe_any, MediaInfo, Parser, Track, TrackKind, TrackState};
pub use select::{TrackKey, TrackSelection};
pub use tools::{ProcessInvoker, ToolInfo, ToolInvoker, ToolKind, ToolOutput, ToolSet, ToolsConfig};
