//! FFprobe JSON adapter.

use super::types::*;
use crate::{language, Error, Result};
use serde::Deserialize;
use std::time::Duration;

const TOOL: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
    #[serde(default)]
    chapters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    format_name: String,
    duration: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    #[serde(default)]
    codec_type: String,
    codec_name: Option<String>,
    codec_long_name: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

/// Build a [`MediaInfo`] from `ffprobe -show_streams -show_format -print_format json` output.
///
/// Stream indexes are used for both `id` and `number`. Attached pictures
/// and attachment streams are counted as attachments.
pub fn parse(json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    if output.streams.is_empty() {
        return Err(Error::parse_error(TOOL, "no streams reported"));
    }

    let mut info = MediaInfo::new(Parser::FfProbe);

    for stream in output.streams {
        if stream.codec_type == "attachment" || stream.disposition.attached_pic == 1 {
            info.attachments += 1;
            continue;
        }

        let kind = match stream.codec_type.as_str() {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            "subtitle" => TrackKind::Subtitle,
            other => {
                tracing::debug!(index = stream.index, codec_type = other, "Ignoring ffprobe stream");
                continue;
            }
        };
        info.push(to_track(kind, stream));
    }

    if let Some(format) = output.format {
        info.duration = format
            .duration
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default();
        info.has_tags = format.tags.title.is_some_and(|t| !t.is_empty());
        info.container = format.format_name;
    }

    info.chapters = output.chapters.len();
    info.has_errors = info.any_track_errors();

    Ok(info)
}

fn to_track(kind: TrackKind, stream: FfprobeStream) -> Track {
    let mut has_errors = false;

    // ffprobe reports the tag language, which can disagree with the track language
    let language = match language::normalize(stream.tags.language.as_deref()) {
        Ok(code) => code,
        Err(raw) => {
            tracing::warn!(language = raw, "Invalid language");
            has_errors = true;
            language::UNDETERMINED
        }
    };

    let mut required = |value: Option<String>, field: &str| match value.filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            tracing::warn!(index = stream.index, field, "Stream is missing a codec field");
            has_errors = true;
            "Unknown".to_string()
        }
    };
    let format = required(stream.codec_name, "codec_name");
    let codec = required(stream.codec_long_name, "codec_long_name");

    Track {
        kind,
        format,
        codec,
        language: language.to_string(),
        id: stream.index,
        source_id: stream.index.to_string(),
        parser: None,
        number: stream.index,
        state: TrackState::None,
        title: stream.tags.title.filter(|t| !t.is_empty()),
        default: stream.disposition.default == 1,
        has_errors,
    }
}
