//! Media file probing.
//!
//! Each supported tool has a pure adapter that maps its raw output onto the
//! canonical [`MediaInfo`] model:
//!
//! - [`mkvmerge::parse`] for `mkvmerge --identify` JSON
//! - [`ffprobe::parse`] for `ffprobe` JSON
//! - [`mediainfo::parse`] for `mediainfo` XML
//!
//! [`probe`] runs the matching tool through a [`ToolSet`] and feeds its
//! output to the adapter.

pub mod ffprobe;
pub mod mediainfo;
pub mod mkvmerge;
mod types;

pub use types::*;

use crate::tools::{ToolKind, ToolSet};
use crate::{Error, Result};
use std::path::Path;

/// MediaInfo prints a stub document for files it cannot open.
const MIN_MEDIAINFO_XML_LEN: usize = 100;

/// Probe a media file with the tool behind `parser`.
pub fn probe(tools: &ToolSet, path: &Path, parser: Parser) -> Result<MediaInfo> {
    let file = path.to_string_lossy().to_string();

    let info = match parser {
        Parser::MkvMerge => {
            let args = vec![
                "--identify".to_string(),
                file,
                "--identification-format".to_string(),
                "json".to_string(),
            ];
            let output = tools.run(ToolKind::MkvMerge, &args)?;
            // Identification is stricter than muxing, warnings are not accepted
            if output.exit_code != 0 {
                return Err(Error::tool_failed(
                    "mkvmerge",
                    format!("identify exited with code {}", output.exit_code),
                ));
            }
            mkvmerge::parse(&output.stdout)?
        }
        Parser::FfProbe => {
            let args: Vec<String> = [
                "-loglevel",
                "quiet",
                "-show_streams",
                "-show_format",
                "-show_chapters",
                "-print_format",
                "json",
            ]
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(file))
            .collect();
            let output = tools.run_checked(ToolKind::FfProbe, &args)?;
            ffprobe::parse(&output.stdout)?
        }
        Parser::MediaInfo => {
            let args = vec!["--Output=XML".to_string(), file];
            let output = tools.run_checked(ToolKind::MediaInfo, &args)?;
            if output.stdout.len() < MIN_MEDIAINFO_XML_LEN {
                return Err(Error::parse_error(
                    "mediainfo",
                    format!("output too short ({} bytes)", output.stdout.len()),
                ));
            }
            mediainfo::parse(&output.stdout)?
        }
    };

    tracing::debug!(
        file = %path.display(),
        parser = %parser,
        tracks = info.count(),
        has_errors = info.has_errors,
        "Probed media file"
    );

    Ok(info)
}

/// Probe with mkvmerge, then ffprobe, then mediainfo, returning the first
/// model that parses.
pub fn probe_any(tools: &ToolSet, path: &Path) -> Result<MediaInfo> {
    let mut last_error = None;

    for parser in [Parser::MkvMerge, Parser::FfProbe, Parser::MediaInfo] {
        match probe(tools, path, parser) {
            Ok(info) => return Ok(info),
            Err(e) => {
                tracing::warn!(file = %path.display(), parser = %parser, error = %e, "Probe failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::InvalidInput(path.display().to_string())))
}
