//! Canonical track and media information types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::language;

/// The probing tool whose output produced a [`MediaInfo`].
///
/// Track `id` and `number` values are only meaningful to the tool family
/// that produced them, so a model must never be used to build commands for
/// a different family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parser {
    /// `mkvmerge --identify`, ids are mkvmerge track ids.
    MkvMerge,
    /// `ffprobe`, ids are stream indexes.
    FfProbe,
    /// `mediainfo`, ids are container track ids, numbers are stream order.
    MediaInfo,
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parser::MkvMerge => write!(f, "mkvmerge"),
            Parser::FfProbe => write!(f, "ffprobe"),
            Parser::MediaInfo => write!(f, "mediainfo"),
        }
    }
}

impl std::str::FromStr for Parser {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mkvmerge" | "mkv" => Ok(Parser::MkvMerge),
            "ffprobe" => Ok(Parser::FfProbe),
            "mediainfo" => Ok(Parser::MediaInfo),
            _ => Err(format!("Unknown parser: {}", s)),
        }
    }
}

/// Kind of elementary stream a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    /// All kinds in canonical order.
    pub const ALL: [TrackKind; 3] = [TrackKind::Video, TrackKind::Audio, TrackKind::Subtitle];
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "Video"),
            TrackKind::Audio => write!(f, "Audio"),
            TrackKind::Subtitle => write!(f, "Subtitle"),
        }
    }
}

/// Decided action for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    #[default]
    None,
    Keep,
    Remove,
    ReMux,
    ReEncode,
    DeInterlace,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackState::None => "None",
            TrackState::Keep => "Keep",
            TrackState::Remove => "Remove",
            TrackState::ReMux => "ReMux",
            TrackState::ReEncode => "ReEncode",
            TrackState::DeInterlace => "DeInterlace",
        };
        f.write_str(name)
    }
}

/// A single audio, video or subtitle track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Which kind of stream this is.
    pub kind: TrackKind,
    /// Display codec name (e.g. "AVC/H.264/MPEG-4p10", "h264", "AVC").
    pub format: String,
    /// Codec identifier (e.g. "V_MPEG4/ISO/AVC").
    pub codec: String,
    /// ISO-639-2/B language code, `und` when unknown.
    pub language: String,
    /// Index used by the producing tool's own track selection options.
    pub id: u32,
    /// Identifier exactly as the tool printed it, unique within one file.
    /// Differs from `id` for embedded streams such as mediainfo's `3-CC1`.
    pub source_id: String,
    /// Tool that produced this track, stamped by [`MediaInfo::push`].
    #[serde(skip)]
    pub parser: Option<Parser>,
    /// Secondary index used by edit-in-place tools.
    pub number: u32,
    /// Disposition decided by policy, `None` after probing.
    pub state: TrackState,
    /// Track title.
    pub title: Option<String>,
    /// Whether the default-track flag is set.
    pub default: bool,
    /// Whether a non-fatal anomaly was found while normalizing.
    pub has_errors: bool,
}

impl Track {
    /// Create a track with the required fields; everything else defaults.
    pub fn new(kind: TrackKind, format: impl Into<String>, codec: impl Into<String>, id: u32) -> Self {
        Self {
            kind,
            format: format.into(),
            codec: codec.into(),
            language: language::UNDETERMINED.to_string(),
            id,
            source_id: id.to_string(),
            parser: None,
            number: id,
            state: TrackState::None,
            title: None,
            default: false,
            has_errors: false,
        }
    }

    /// Whether the language is empty or `und`.
    pub fn is_language_unknown(&self) -> bool {
        language::is_undetermined(&self.language)
    }

    /// Emit one structured log line describing this track.
    pub fn log(&self, prefix: &str) {
        tracing::info!(
            kind = %self.kind,
            format = %self.format,
            codec = %self.codec,
            language = %self.language,
            id = self.id,
            number = self.number,
            state = %self.state,
            title = self.title.as_deref().unwrap_or(""),
            default = self.default,
            has_errors = self.has_errors,
            "{prefix}"
        );
    }
}

/// Canonical description of a media file as seen by one probing tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Tool that produced this model.
    pub parser: Parser,
    /// Video tracks in tool order.
    pub video: Vec<Track>,
    /// Audio tracks in tool order.
    pub audio: Vec<Track>,
    /// Subtitle tracks in tool order.
    pub subtitle: Vec<Track>,
    /// Container type as reported by the tool (e.g. "Matroska").
    pub container: String,
    /// Number of attachments.
    pub attachments: usize,
    /// Number of chapters.
    pub chapters: usize,
    /// Total duration.
    pub duration: Duration,
    /// Whether any track or the container has a non-fatal anomaly.
    pub has_errors: bool,
    /// Whether the container or any track carries tags worth stripping.
    pub has_tags: bool,
}

impl MediaInfo {
    /// Create an empty model tagged with the given parser.
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            video: Vec::new(),
            audio: Vec::new(),
            subtitle: Vec::new(),
            container: String::new(),
            attachments: 0,
            chapters: 0,
            duration: Duration::ZERO,
            has_errors: false,
            has_tags: false,
        }
    }

    /// Tracks of one kind.
    pub fn tracks_of(&self, kind: TrackKind) -> &[Track] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
            TrackKind::Subtitle => &self.subtitle,
        }
    }

    /// Mutable tracks of one kind.
    pub fn tracks_of_mut(&mut self, kind: TrackKind) -> &mut Vec<Track> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
            TrackKind::Subtitle => &mut self.subtitle,
        }
    }

    /// All tracks, video first, then audio, then subtitles.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.video
            .iter()
            .chain(self.audio.iter())
            .chain(self.subtitle.iter())
    }

    /// Append a track to the list matching its kind.
    ///
    /// # Panics
    ///
    /// Panics if the track was already stamped by a different parser.
    pub fn push(&mut self, mut track: Track) {
        let parser = *track.parser.get_or_insert(self.parser);
        assert_eq!(
            parser, self.parser,
            "cannot push a {} track into a {} model",
            parser, self.parser
        );
        self.tracks_of_mut(track.kind).push(track);
    }

    /// Find a track by kind and id.
    pub fn find(&self, kind: TrackKind, id: u32) -> Option<&Track> {
        self.tracks_of(kind).iter().find(|t| t.id == id)
    }

    /// Total number of tracks.
    pub fn count(&self) -> usize {
        self.video.len() + self.audio.len() + self.subtitle.len()
    }

    /// Whether there are no tracks at all.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Assign the same state to every track.
    pub fn set_state(&mut self, state: TrackState) {
        for kind in TrackKind::ALL {
            for track in self.tracks_of_mut(kind) {
                track.state = state;
            }
        }
    }

    /// Whether any track has a non-fatal anomaly.
    pub fn any_track_errors(&self) -> bool {
        self.tracks().any(|t| t.has_errors)
    }

    /// Drop video tracks that are embedded cover art rather than content.
    pub fn remove_cover_art(&mut self) {
        self.video.retain(|track| {
            if is_cover_art(track) {
                tracing::debug!(id = track.id, format = %track.format, "Removing cover art track");
                false
            } else {
                true
            }
        });
    }

    /// Emit one structured log line per track.
    pub fn log(&self, prefix: &str) {
        for track in self.tracks() {
            track.log(prefix);
        }
    }
}

fn is_cover_art(track: &Track) -> bool {
    const IMAGE_FORMATS: &[&str] = &["mjpeg", "mjpg", "jpeg", "jpg", "png", "bmp", "gif"];
    let format = track.format.to_lowercase();
    let codec = track.codec.to_lowercase();
    IMAGE_FORMATS
        .iter()
        .any(|image| format.contains(image) || codec.contains(image))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaInfo {
        let mut info = MediaInfo::new(Parser::MkvMerge);
        info.push(Track::new(TrackKind::Video, "AVC/H.264/MPEG-4p10", "V_MPEG4/ISO/AVC", 0));
        info.push(Track::new(TrackKind::Audio, "AC-3", "A_AC3", 1));
        info.push(Track::new(TrackKind::Subtitle, "SubRip/SRT", "S_TEXT/UTF8", 2));
        info.push(Track::new(TrackKind::Video, "MJPEG", "V_MS/VFW/FOURCC", 3));
        info
    }

    #[test]
    fn test_push_routes_by_kind() {
        let info = sample();
        assert_eq!(info.video.len(), 2);
        assert_eq!(info.audio.len(), 1);
        assert_eq!(info.subtitle.len(), 1);
        assert_eq!(info.count(), 4);
    }

    #[test]
    fn test_tracks_order() {
        let info = sample();
        let ids: Vec<u32> = info.tracks().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_remove_cover_art() {
        let mut info = sample();
        info.remove_cover_art();
        assert_eq!(info.video.len(), 1);
        assert_eq!(info.video[0].id, 0);
    }

    #[test]
    fn test_set_state() {
        let mut info = sample();
        info.set_state(TrackState::Keep);
        assert!(info.tracks().all(|t| t.state == TrackState::Keep));
    }

    #[test]
    fn test_new_track_defaults() {
        let track = Track::new(TrackKind::Audio, "AAC", "A_AAC", 4);
        assert_eq!(track.number, 4);
        assert_eq!(track.state, TrackState::None);
        assert!(track.is_language_unknown());
        assert!(!track.has_errors);
    }

    #[test]
    fn test_parser_from_str() {
        assert_eq!("mkvmerge".parse::<Parser>().ok(), Some(Parser::MkvMerge));
        assert_eq!("FFprobe".parse::<Parser>().ok(), Some(Parser::FfProbe));
        assert_eq!("mediainfo".parse::<Parser>().ok(), Some(Parser::MediaInfo));
        assert!("handbrake".parse::<Parser>().is_err());
    }
}
