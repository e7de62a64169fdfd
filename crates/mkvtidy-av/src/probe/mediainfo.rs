//! MediaInfo XML adapter.
//!
//! MediaInfo reports container track ids in `ID` and the demuxer stream
//! order in `StreamOrder`. Embedded sub-streams (closed captions inside a
//! video track, cores inside an audio track) get ids such as `3-CC1`.

use super::types::*;
use crate::{language, Error, Result};
use serde::Deserialize;
use std::time::Duration;

const TOOL: &str = "mediainfo";

#[derive(Debug, Deserialize)]
struct MediaInfoXml {
    media: MediaInfoMedia,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(rename = "track", default)]
    tracks: Vec<MediaInfoTrack>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoTrack {
    #[serde(rename = "@type")]
    track_type: String,
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "StreamOrder")]
    stream_order: Option<String>,
    #[serde(rename = "Format")]
    format: Option<String>,
    #[serde(rename = "CodecID")]
    codec_id: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Default")]
    default: Option<String>,
    #[serde(rename = "MuxingMode")]
    muxing_mode: Option<String>,
    #[serde(rename = "Duration")]
    duration: Option<String>,
}

/// Build a [`MediaInfo`] from `mediainfo --Output=XML` output.
pub fn parse(xml: &str) -> Result<MediaInfo> {
    let output: MediaInfoXml = quick_xml::de::from_str(xml)?;

    if output.media.tracks.is_empty() {
        return Err(Error::parse_error(TOOL, "no tracks reported"));
    }

    let mut info = MediaInfo::new(Parser::MediaInfo);

    for track in output.media.tracks {
        let kind = match track.track_type.as_str() {
            "General" => {
                info.container = track.format.unwrap_or_default();
                info.duration = track
                    .duration
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64)
                    .unwrap_or_default();
                continue;
            }
            "Video" => TrackKind::Video,
            "Audio" => {
                let is_sub_track = track.codec_id.as_deref().map_or(true, str::is_empty)
                    && track.id.as_deref().is_some_and(|id| id.contains('-'));
                if is_sub_track {
                    tracing::warn!(id = track.id.as_deref().unwrap_or(""), "Skipping audio sub-track");
                    continue;
                }
                TrackKind::Audio
            }
            "Text" => TrackKind::Subtitle,
            _ => continue,
        };
        info.push(to_track(kind, track)?);
    }

    info.has_errors = info.any_track_errors();

    Ok(info)
}

fn to_track(kind: TrackKind, track: MediaInfoTrack) -> Result<Track> {
    let raw_id = track.id.as_deref().unwrap_or("").trim();
    let id = leading_number(raw_id)
        .ok_or_else(|| Error::parse_error(TOOL, format!("invalid {kind} track id: {raw_id:?}")))?;
    let number = track.stream_order.as_deref().and_then(leading_number).unwrap_or(0);

    let mut has_errors = false;

    let language = match language::normalize(track.language.as_deref()) {
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
            tracing::warn!(id, field, "Track is missing a codec field");
            has_errors = true;
            "Unknown".to_string()
        }
    };
    let format = required(track.format, "Format");
    let codec = required(track.codec_id, "CodecID");

    // VOBSUB without a muxing mode hangs some players; remuxing does not fix it
    if kind == TrackKind::Subtitle
        && codec.eq_ignore_ascii_case("S_VOBSUB")
        && track.muxing_mode.as_deref().map_or(true, str::is_empty)
    {
        tracing::warn!(id, "MuxingMode not specified for S_VOBSUB codec");
        has_errors = true;
    }

    Ok(Track {
        kind,
        format,
        codec,
        language: language.to_string(),
        id,
        source_id: raw_id.to_string(),
        parser: None,
        number,
        state: TrackState::None,
        title: track.title.filter(|t| !t.is_empty()),
        default: track.default.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("Yes")),
        has_errors,
    })
}

/// Integer prefix of ids like `3` or `3-CC1`.
fn leading_number(value: &str) -> Option<u32> {
    let digits: &str = value
        .trim()
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("");
    digits.parse().ok()
}
