//! mkvmerge `--identify` JSON adapter.

use super::types::*;
use crate::{language, Error, Result};
use serde::Deserialize;
use std::time::Duration;

const TOOL: &str = "mkvmerge";

#[derive(Debug, Deserialize)]
struct MkvMergeOutput {
    container: MkvContainer,
    #[serde(default)]
    tracks: Vec<MkvTrack>,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
    #[serde(default)]
    chapters: Vec<serde_json::Value>,
    #[serde(default)]
    global_tags: Vec<serde_json::Value>,
    #[serde(default)]
    track_tags: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MkvContainer {
    #[serde(rename = "type", default)]
    container_type: String,
    #[serde(default)]
    properties: MkvContainerProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvContainerProperties {
    /// Nanoseconds.
    duration: Option<u64>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MkvTrack {
    id: u32,
    #[serde(rename = "type")]
    track_type: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: MkvTrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvTrackProperties {
    codec_id: Option<String>,
    track_name: Option<String>,
    #[serde(default)]
    default_track: bool,
    language: Option<String>,
    tag_language: Option<String>,
    number: Option<u32>,
}

/// Build a [`MediaInfo`] from `mkvmerge --identify --identification-format json` output.
///
/// Container duration is reported in nanoseconds. Any container that is not
/// Matroska is flagged with `has_errors`.
pub fn parse(json: &str) -> Result<MediaInfo> {
    let output: MkvMergeOutput = serde_json::from_str(json)?;

    if output.tracks.is_empty() {
        return Err(Error::parse_error(TOOL, "no tracks reported"));
    }

    let is_matroska = output.container.container_type.eq_ignore_ascii_case("Matroska");
    let mut info = MediaInfo::new(Parser::MkvMerge);

    for track in output.tracks {
        let kind = match track.track_type.to_lowercase().as_str() {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            "subtitles" => TrackKind::Subtitle,
            other => {
                tracing::debug!(id = track.id, track_type = other, "Ignoring mkvmerge track");
                continue;
            }
        };
        info.push(to_track(kind, track, is_matroska));
    }

    info.remove_cover_art();

    info.container = output.container.container_type;
    info.attachments = output.attachments.len();
    info.chapters = output.chapters.len();
    info.duration = Duration::from_nanos(output.container.properties.duration.unwrap_or(0));
    info.has_errors = info.any_track_errors();
    info.has_tags = !output.global_tags.is_empty()
        || !output.track_tags.is_empty()
        || info.attachments > 0
        || output
            .container
            .properties
            .title
            .as_deref()
            .is_some_and(|t| !t.is_empty());

    if !is_matroska {
        tracing::warn!(container = %info.container, "MKV container type is not Matroska");
        info.has_errors = true;
    }

    Ok(info)
}

fn to_track(kind: TrackKind, track: MkvTrack, is_matroska: bool) -> Track {
    let props = track.properties;
    let mut has_errors = false;

    // Only Matroska is expected to carry codec ids for every track
    let codec = match props.codec_id.filter(|c| !c.is_empty()) {
        Some(codec) => codec,
        None if !is_matroska => "Unknown".to_string(),
        None => {
            tracing::warn!(id = track.id, "Track is missing a codec id");
            has_errors = true;
            "Unknown".to_string()
        }
    };

    if let (Some(tag), Some(lang)) = (props.tag_language.as_deref(), props.language.as_deref()) {
        if !tag.is_empty() && !lang.is_empty() && !tag.eq_ignore_ascii_case(lang) {
            tracing::warn!(tag_language = tag, language = lang, "Tag and track language mismatch");
            has_errors = true;
        }
    }

    let language = match language::normalize(props.language.as_deref()) {
        Ok(code) => code,
        Err(raw) => {
            tracing::warn!(language = raw, "Invalid language");
            has_errors = true;
            language::UNDETERMINED
        }
    };

    let format = if track.codec.is_empty() {
        codec.clone()
    } else {
        track.codec
    };

    Track {
        kind,
        format,
        codec,
        language: language.to_string(),
        id: track.id,
        source_id: track.id.to_string(),
        parser: None,
        number: props.number.unwrap_or(track.id + 1),
        state: TrackState::None,
        title: props.track_name.filter(|t| !t.is_empty()),
        default: props.default_track,
        has_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATROSKA: &str = r#"{
        "attachments": [{"id": 1, "content_type": "image/jpeg", "file_name": "cover.jpg"}],
        "chapters": [{"num_entries": 12}],
        "container": {
            "properties": {"duration": 5400000000000, "title": "Movie"},
            "recognized": true,
            "supported": true,
            "type": "Matroska"
        },
        "global_tags": [],
        "track_tags": [],
        "tracks": [
            {"codec": "AVC/H.264/MPEG-4p10", "id": 0, "type": "video",
             "properties": {"codec_id": "V_MPEG4/ISO/AVC", "default_track": true, "language": "und", "number": 1}},
            {"codec": "AC-3", "id": 1, "type": "audio",
             "properties": {"codec_id": "A_AC3", "default_track": true, "language": "eng", "number": 2, "track_name": "Surround"}},
            {"codec": "AC-3", "id": 2, "type": "audio",
             "properties": {"codec_id": "A_AC3", "language": "zho", "number": 3}},
            {"codec": "SubRip/SRT", "id": 3, "type": "subtitles",
             "properties": {"codec_id": "S_TEXT/UTF8", "language": "eng", "tag_language": "fre", "number": 4}},
            {"codec": "VobSub", "id": 4, "type": "subtitles",
             "properties": {"codec_id": "S_VOBSUB", "language": "xyz", "number": 5}}
        ]
    }"#;

    #[test]
    fn test_parse_matroska() {
        let info = parse(MATROSKA).unwrap();

        assert_eq!(info.parser, Parser::MkvMerge);
        assert_eq!(info.container, "Matroska");
        assert_eq!(info.video.len(), 1);
        assert_eq!(info.audio.len(), 2);
        assert_eq!(info.subtitle.len(), 2);
        assert_eq!(info.attachments, 1);
        assert_eq!(info.chapters, 1);
        assert_eq!(info.duration, Duration::from_secs(5400));
        assert!(info.has_tags);
        assert!(info.has_errors);

        let video = &info.video[0];
        assert_eq!(video.format, "AVC/H.264/MPEG-4p10");
        assert_eq!(video.codec, "V_MPEG4/ISO/AVC");
        assert_eq!(video.id, 0);
        assert_eq!(video.number, 1);
        assert!(video.default);
        assert!(video.is_language_unknown());

        assert_eq!(info.audio[0].title.as_deref(), Some("Surround"));
        assert_eq!(info.audio[1].language, "chi");
        assert!(!info.audio[1].has_errors);
    }

    #[test]
    fn test_language_anomalies() {
        let info = parse(MATROSKA).unwrap();

        let mismatch = &info.subtitle[0];
        assert_eq!(mismatch.language, "eng");
        assert!(mismatch.has_errors);

        let invalid = &info.subtitle[1];
        assert_eq!(invalid.language, "und");
        assert!(invalid.has_errors);
    }

    #[test]
    fn test_non_matroska_container() {
        let json = r#"{
            "container": {"properties": {}, "type": "AVI"},
            "tracks": [
                {"codec": "MPEG-4p2", "id": 0, "type": "video", "properties": {}},
                {"codec": "MP3", "id": 1, "type": "audio", "properties": {"language": "eng"}}
            ]
        }"#;
        let info = parse(json).unwrap();

        assert_eq!(info.container, "AVI");
        assert!(info.has_errors);
        assert!(!info.has_tags);
        assert_eq!(info.video[0].codec, "Unknown");
        assert!(!info.video[0].has_errors);
        assert_eq!(info.duration, Duration::ZERO);
    }

    #[test]
    fn test_cover_art_removed() {
        let json = r#"{
            "container": {"properties": {}, "type": "Matroska"},
            "tracks": [
                {"codec": "HEVC/H.265/MPEG-H", "id": 0, "type": "video", "properties": {"codec_id": "V_MPEGH/ISO/HEVC"}},
                {"codec": "MJPEG", "id": 1, "type": "video", "properties": {"codec_id": "V_MJPEG"}}
            ]
        }"#;
        let info = parse(json).unwrap();
        assert_eq!(info.video.len(), 1);
        assert_eq!(info.video[0].id, 0);
        assert!(!info.has_errors);
    }

    #[test]
    fn test_no_tracks_is_error() {
        let json = r#"{"container": {"type": "Matroska"}, "tracks": []}"#;
        assert!(matches!(parse(json), Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse("not json").is_err());
        assert!(parse(r#"{"tracks": []}"#).is_err());
    }
}
