//! Probe and selection integration tests using captured tool output.

use mkvtidy_av::{
    probe, Error, Parser, ToolInvoker, ToolKind, ToolOutput, ToolSet, TrackKind, TrackSelection,
    TrackState,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const MKVMERGE_JSON: &str = r#"{
  "attachments": [],
  "chapters": [{"num_entries": 12}],
  "container": {
    "properties": {"duration": 5423456000000, "title": "Some Movie"},
    "recognized": true,
    "supported": true,
    "type": "Matroska"
  },
  "errors": [],
  "file_name": "/media/movie.mkv",
  "global_tags": [],
  "track_tags": [],
  "tracks": [
    {"codec": "AVC/H.264/MPEG-4p10", "id": 0, "type": "video",
     "properties": {"codec_id": "V_MPEG4/ISO/AVC", "default_track": true, "language": "und", "number": 1}},
    {"codec": "DTS-HD Master Audio", "id": 1, "type": "audio",
     "properties": {"codec_id": "A_DTS", "default_track": true, "language": "eng", "number": 2, "track_name": "Surround 7.1"}},
    {"codec": "AC-3", "id": 2, "type": "audio",
     "properties": {"codec_id": "A_AC3", "default_track": false, "language": "fre", "number": 3}},
    {"codec": "SubRip/SRT", "id": 3, "type": "subtitles",
     "properties": {"codec_id": "S_TEXT/UTF8", "default_track": false, "language": "eng", "number": 4}},
    {"codec": "HDMV PGS", "id": 4, "type": "subtitles",
     "properties": {"codec_id": "S_HDMV/PGS", "default_track": false, "language": "spa", "number": 5}},
    {"codec": "SubRip/SRT", "id": 5, "type": "subtitles",
     "properties": {"codec_id": "S_TEXT/UTF8", "default_track": false, "number": 6}}
  ]
}"#;

const FFPROBE_JSON: &str = r#"{
  "streams": [
    {"index": 0, "codec_name": "mpeg4", "codec_long_name": "MPEG-4 part 2", "codec_type": "video",
     "disposition": {"default": 0, "attached_pic": 0}},
    {"index": 1, "codec_name": "mp3", "codec_long_name": "MP3 (MPEG audio layer 3)", "codec_type": "audio",
     "disposition": {"default": 0, "attached_pic": 0}}
  ],
  "format": {"filename": "/media/old.avi", "format_name": "avi", "duration": "1325.040000"}
}"#;

/// Returns canned stdout per tool, exit code 2 for tools without output.
struct CannedInvoker(HashMap<&'static str, &'static str>);

impl ToolInvoker for CannedInvoker {
    fn run(&self, program: &Path, _args: &[String]) -> mkvtidy_av::Result<ToolOutput> {
        let name = program.file_name().unwrap().to_string_lossy().to_string();
        Ok(match self.0.get(name.as_str()) {
            Some(stdout) => ToolOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
            None => ToolOutput {
                exit_code: 2,
                stdout: String::new(),
                stderr: "unsupported file".to_string(),
            },
        })
    }
}

fn tools(outputs: &[(&'static str, &'static str)]) -> ToolSet {
    ToolSet::with_invoker(
        ToolKind::ALL.map(|kind| (kind, PathBuf::from(kind.executable()))),
        Arc::new(CannedInvoker(outputs.iter().copied().collect())),
    )
}

#[test]
fn test_probe_mkvmerge_model() {
    let tools = tools(&[("mkvmerge", MKVMERGE_JSON)]);
    let info = probe::probe(&tools, Path::new("/media/movie.mkv"), Parser::MkvMerge).unwrap();

    assert_eq!(info.parser, Parser::MkvMerge);
    assert_eq!(info.container, "Matroska");
    assert_eq!(info.duration, Duration::from_nanos(5_423_456_000_000));
    assert_eq!(info.chapters, 1);
    assert!(info.has_tags);
    assert!(!info.has_errors);
    assert_eq!(info.video.len(), 1);
    assert_eq!(info.audio.len(), 2);
    assert_eq!(info.subtitle.len(), 3);

    let main_audio = info.find(TrackKind::Audio, 1).unwrap();
    assert_eq!(main_audio.number, 2);
    assert_eq!(main_audio.title.as_deref(), Some("Surround 7.1"));
    assert!(main_audio.default);
    assert!(info.find(TrackKind::Subtitle, 5).unwrap().is_language_unknown());
}

#[test]
fn test_probe_any_uses_ffprobe_for_legacy_files() {
    let tools = tools(&[("ffprobe", FFPROBE_JSON)]);
    let info = probe::probe_any(&tools, Path::new("/media/old.avi")).unwrap();

    assert_eq!(info.parser, Parser::FfProbe);
    assert_eq!(info.container, "avi");
    assert_eq!(info.count(), 2);
    assert_eq!(info.duration, Duration::from_secs_f64(1325.04));
}

#[test]
fn test_probe_any_reports_last_failure() {
    let tools = tools(&[("mediainfo", "<MediaInfo/>")]);
    let result = probe::probe_any(&tools, Path::new("/media/broken.mkv"));
    assert!(matches!(result, Err(Error::ParseError { ref tool, .. }) if tool == "mediainfo"));
}

#[test]
fn test_language_selection_from_probe() {
    let tools = tools(&[("mkvmerge", MKVMERGE_JSON)]);
    let info = probe::probe(&tools, Path::new("/media/movie.mkv"), Parser::MkvMerge).unwrap();

    let keep_languages = ["eng"];
    let mut selection = TrackSelection::from_media_by(&info, |t| {
        t.kind == TrackKind::Video
            || t.is_language_unknown()
            || keep_languages.contains(&t.language.as_str())
    });
    selection.set_state(TrackState::Keep, TrackState::Remove);

    let kept = selection.selected();
    let dropped = selection.not_selected();
    assert_eq!(kept.parser, Parser::MkvMerge);
    assert_eq!(kept.tracks().map(|t| t.id).collect::<Vec<_>>(), vec![0, 1, 3, 5]);
    assert_eq!(dropped.tracks().map(|t| t.id).collect::<Vec<_>>(), vec![2, 4]);
    assert!(dropped.tracks().all(|t| t.state == TrackState::Remove));
    assert_eq!(kept.count() + dropped.count(), info.count());
}

#[test]
fn test_mediainfo_captions_survive_selection() {
    let xml = r#"<MediaInfo><media ref="/media/show.ts">
<track type="General"><Format>MPEG-TS</Format></track>
<track type="Video"><StreamOrder>0</StreamOrder><ID>1</ID><Format>AVC</Format><CodecID>27</CodecID></track>
<track type="Text" typeorder="1"><ID>1-CC1</ID><Format>EIA-608</Format><CodecID>c608</CodecID><Language>en</Language></track>
<track type="Text" typeorder="2"><ID>1-CC3</ID><Format>EIA-608</Format><CodecID>c608</CodecID><Language>es</Language></track>
</media></MediaInfo>"#;
    let info = probe::mediainfo::parse(xml).unwrap();
    assert_eq!(info.subtitle.len(), 2);

    let selection = TrackSelection::from_media_by(&info, |t| t.language != "spa");
    assert_eq!(selection.len(), info.count());
    assert_eq!(
        selection.selected().subtitle.iter().map(|t| t.source_id.as_str()).collect::<Vec<_>>(),
        vec!["1-CC1"]
    );
    assert_eq!(selection.not_selected().subtitle[0].source_id, "1-CC3");
}
