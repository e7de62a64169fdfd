//! Rewriting media files into matroska.
//!
//! Every operation follows the same replace protocol:
//!
//! 1. The output is the input path with an `.mkv` extension, the tool writes
//!    to the input path with a `.tmp` extension.
//! 2. In dry-run mode nothing runs and the input path is returned.
//! 3. A failed tool run removes the temporary file; if the operation has a
//!    fallback tool it is tried next unless cancellation was requested.
//! 4. A successful run is renamed over the output. A failed rename fails the
//!    operation and the temporary file is left behind.
//! 5. The input is deleted unless it is the output (compared
//!    case-insensitively).

use crate::cancel::CancelFlag;
use crate::probe::{MediaInfo, Parser, TrackKind};
use crate::tools::{ToolKind, ToolSet};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension of the canonical output container.
pub const MKV_EXTENSION: &str = "mkv";

/// Extension of the in-progress output file.
pub const TEMP_EXTENSION: &str = "tmp";

/// mkvmerge options applied to every mux.
const MERGE_OPTIONS: &[&str] = &[
    "--disable-track-statistics-tags",
    "--no-global-tags",
    "--no-track-tags",
    "--no-attachments",
    "--no-buttons",
    "--flush-on-close",
];

/// Encoder settings and run mode for a [`Converter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// ffmpeg video encoder.
    pub video_codec: String,
    /// ffmpeg constant rate factor.
    pub video_quality: u8,
    /// ffmpeg encoder preset.
    pub video_preset: String,
    /// ffmpeg audio encoder.
    pub audio_codec: String,
    /// HandBrake `--encoder` value, may carry extra HandBrake options.
    pub handbrake_video: String,
    /// HandBrake `--aencoder` value, may carry extra HandBrake options.
    pub handbrake_audio: String,
    /// Log the commands instead of running them.
    pub dry_run: bool,
    /// Limit every tool run to this much media.
    pub snippet: Option<Duration>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_quality: 20,
            video_preset: "medium".to_string(),
            audio_codec: "ac3".to_string(),
            handbrake_video: "x264 --quality 20 --encoder-preset medium".to_string(),
            handbrake_audio: "copy --audio-fallback ac3".to_string(),
            dry_run: false,
            snippet: None,
        }
    }
}

/// Output path for `input`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension(MKV_EXTENSION)
}

/// Temporary path the tools write to for `input`.
///
/// Never the input itself: an input that already has the temporary
/// extension gets a second one.
pub fn temp_path(input: &Path) -> PathBuf {
    let temp = input.with_extension(TEMP_EXTENSION);
    if same_path(&temp, input) {
        let mut name = input.as_os_str().to_os_string();
        name.push(".");
        name.push(TEMP_EXTENSION);
        PathBuf::from(name)
    } else {
        temp
    }
}

/// Whether `path` has the canonical container extension.
pub fn is_mkv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MKV_EXTENSION))
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn push_all(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[track_caller]
fn assert_parser(info: &MediaInfo, expected: Parser, operation: &str) {
    assert_eq!(
        info.parser, expected,
        "{operation} requires {expected} track ids, got a {} selection",
        info.parser
    );
}

/// One tool run of an operation.
#[derive(Debug, Clone)]
struct Attempt {
    tool: ToolKind,
    args: Vec<String>,
}

impl Attempt {
    fn new(tool: ToolKind, args: Vec<String>) -> Self {
        Self { tool, args }
    }
}

/// Drives mkvmerge, ffmpeg and HandBrake to produce matroska files.
#[derive(Debug, Clone)]
pub struct Converter {
    tools: ToolSet,
    options: ConvertOptions,
    cancel: CancelFlag,
}

impl Converter {
    pub fn new(tools: ToolSet, options: ConvertOptions) -> Self {
        Self {
            tools,
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `cancel` between tool runs.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Re-encode with ffmpeg.
    ///
    /// Without `keep` every stream is mapped, video and audio are encoded
    /// and subtitles copied. With `keep` only those streams are mapped; kept
    /// video and audio streams are encoded if they are in `reencode` (or
    /// `reencode` is `None`) and copied otherwise.
    ///
    /// # Panics
    ///
    /// Panics if a selection was not produced by ffprobe, or if `reencode`
    /// is given without `keep`.
    pub fn convert_to_mkv(
        &self,
        input: &Path,
        keep: Option<&MediaInfo>,
        reencode: Option<&MediaInfo>,
    ) -> Result<PathBuf> {
        if let Some(keep) = keep {
            assert_parser(keep, Parser::FfProbe, "convert_to_mkv");
        }
        if let Some(reencode) = reencode {
            assert!(keep.is_some(), "convert_to_mkv: reencode subset requires a keep selection");
            assert_parser(reencode, Parser::FfProbe, "convert_to_mkv");
        }

        let args = self.ffmpeg_convert_args(input, &temp_path(input), keep, reencode);
        self.rewrite("convert", input, vec![Attempt::new(ToolKind::FfMpeg, args)])
    }

    /// Remux every track, choosing the tool order from the input extension.
    ///
    /// Matroska inputs go through mkvmerge first and ffmpeg on failure;
    /// anything else goes through ffmpeg first since mkvmerge rejects some
    /// legacy containers.
    pub fn remux_to_mkv(&self, input: &Path) -> Result<PathBuf> {
        let temp = temp_path(input);
        let mkvmerge = Attempt::new(ToolKind::MkvMerge, self.mkvmerge_remux_args(input, &temp, None));
        let ffmpeg = Attempt::new(ToolKind::FfMpeg, self.ffmpeg_remux_args(input, &temp));

        let attempts = if is_mkv(input) {
            vec![mkvmerge, ffmpeg]
        } else {
            vec![ffmpeg, mkvmerge]
        };
        self.rewrite("remux", input, attempts)
    }

    /// Remux with mkvmerge keeping only the tracks in `keep`.
    ///
    /// A track kind with nothing kept is excluded entirely.
    ///
    /// # Panics
    ///
    /// Panics if `keep` was not produced by mkvmerge or `input` is not a
    /// matroska file.
    pub fn remux_to_mkv_selected(&self, input: &Path, keep: &MediaInfo) -> Result<PathBuf> {
        assert_parser(keep, Parser::MkvMerge, "remux_to_mkv_selected");
        assert!(
            is_mkv(input),
            "remux_to_mkv_selected requires a matroska input: {}",
            input.display()
        );

        let args = self.mkvmerge_remux_args(input, &temp_path(input), Some(keep));
        self.rewrite("remux", input, vec![Attempt::new(ToolKind::MkvMerge, args)])
    }

    /// Mux the `keep_one` tracks of `source_one` with every track of
    /// `source_two`, dropping chapters.
    ///
    /// The output is named after `source_one`, which is deleted afterwards
    /// unless it is the output. `source_two` is never deleted.
    ///
    /// # Panics
    ///
    /// Panics if `keep_one` was not produced by mkvmerge.
    pub fn merge_to_mkv(
        &self,
        source_one: &Path,
        keep_one: &MediaInfo,
        source_two: &Path,
    ) -> Result<PathBuf> {
        assert_parser(keep_one, Parser::MkvMerge, "merge_to_mkv");

        let args = self.mkvmerge_merge_args(source_one, &temp_path(source_one), keep_one, source_two);
        self.rewrite("merge", source_one, vec![Attempt::new(ToolKind::MkvMerge, args)])
    }

    /// Re-encode every track with HandBrake, with decomb enabled.
    pub fn deinterlace_to_mkv(&self, input: &Path) -> Result<PathBuf> {
        let args = self.handbrake_args(input, &temp_path(input), true);
        self.rewrite("deinterlace", input, vec![Attempt::new(ToolKind::HandBrake, args)])
    }

    /// Re-encode every track with HandBrake.
    pub fn convert_to_mkv_handbrake(&self, input: &Path) -> Result<PathBuf> {
        let args = self.handbrake_args(input, &temp_path(input), false);
        self.rewrite("convert", input, vec![Attempt::new(ToolKind::HandBrake, args)])
    }

    fn rewrite(
        &self,
        operation: &'static str,
        input: &Path,
        attempts: Vec<Attempt>,
    ) -> Result<PathBuf> {
        let output = output_path(input);
        let temp = temp_path(input);

        if self.options.dry_run {
            for attempt in &attempts {
                tracing::info!(
                    operation,
                    tool = %attempt.tool,
                    args = %attempt.args.join(" "),
                    "Dry run, not running tool"
                );
            }
            return Ok(input.to_path_buf());
        }

        let mut last_error = None;

        for (n, attempt) in attempts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(operation, file = %input.display(), tool = %attempt.tool, "Cancelled, skipping tool");
                return Err(Error::Cancelled);
            }
            if n > 0 {
                tracing::warn!(operation, file = %input.display(), tool = %attempt.tool, "Falling back");
            }

            match self.run_attempt(attempt, &temp) {
                Ok(()) => return self.finish(operation, input, &output, &temp),
                Err(e) => {
                    tracing::warn!(operation, file = %input.display(), tool = %attempt.tool, error = %e, "Tool run failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::InvalidInput(format!("no tool to {} {}", operation, input.display()))
        }))
    }

    fn run_attempt(&self, attempt: &Attempt, temp: &Path) -> Result<()> {
        remove_temp(temp);
        match self.tools.run_checked(attempt.tool, &attempt.args) {
            Ok(_) => Ok(()),
            Err(e) => {
                remove_temp(temp);
                Err(e)
            }
        }
    }

    fn finish(
        &self,
        operation: &'static str,
        input: &Path,
        output: &Path,
        temp: &Path,
    ) -> Result<PathBuf> {
        fs::rename(temp, output).map_err(|e| {
            Error::replace(output, format!("rename from {} failed: {}", temp.display(), e))
        })?;

        if !same_path(input, output) {
            fs::remove_file(input)
                .map_err(|e| Error::replace(input, format!("failed to delete original: {}", e)))?;
        }

        tracing::info!(operation, input = %input.display(), output = %output.display(), "Conversion complete");
        Ok(output.to_path_buf())
    }

    fn mkvmerge_prefix(&self, temp: &Path) -> Vec<String> {
        let mut args = Vec::new();
        push_all(&mut args, MERGE_OPTIONS);
        if let Some(snippet) = self.options.snippet {
            args.push("--split".to_string());
            args.push(format!("parts:00:00:00-{}", format_hms(snippet)));
        }
        args.push("--output".to_string());
        args.push(path_arg(temp));
        args
    }

    fn mkvmerge_remux_args(&self, input: &Path, temp: &Path, keep: Option<&MediaInfo>) -> Vec<String> {
        let mut args = self.mkvmerge_prefix(temp);
        if let Some(keep) = keep {
            args.extend(track_filter_args(keep));
        }
        args.push(path_arg(input));
        args
    }

    fn mkvmerge_merge_args(
        &self,
        source_one: &Path,
        temp: &Path,
        keep_one: &MediaInfo,
        source_two: &Path,
    ) -> Vec<String> {
        let mut args = self.mkvmerge_prefix(temp);
        args.extend(track_filter_args(keep_one));
        args.push("--no-chapters".to_string());
        args.push(path_arg(source_one));
        args.push("--no-chapters".to_string());
        args.push(path_arg(source_two));
        args
    }

    fn ffmpeg_snippet(&self, args: &mut Vec<String>) {
        if let Some(snippet) = self.options.snippet {
            args.push("-t".to_string());
            args.push(snippet.as_secs().to_string());
        }
    }

    fn ffmpeg_remux_args(&self, input: &Path, temp: &Path) -> Vec<String> {
        let mut args = Vec::new();
        push_all(&mut args, &["-hide_banner", "-y", "-i"]);
        args.push(path_arg(input));
        push_all(&mut args, &["-map", "0", "-c", "copy"]);
        self.ffmpeg_snippet(&mut args);
        push_all(&mut args, &["-f", "matroska"]);
        args.push(path_arg(temp));
        args
    }

    fn ffmpeg_convert_args(
        &self,
        input: &Path,
        temp: &Path,
        keep: Option<&MediaInfo>,
        reencode: Option<&MediaInfo>,
    ) -> Vec<String> {
        let opts = &self.options;
        let mut args = Vec::new();
        push_all(&mut args, &["-hide_banner", "-y", "-i"]);
        args.push(path_arg(input));

        match keep {
            None => {
                push_all(&mut args, &["-map", "0", "-c:v", opts.video_codec.as_str()]);
                args.push("-crf".to_string());
                args.push(opts.video_quality.to_string());
                push_all(&mut args, &["-preset", opts.video_preset.as_str()]);
                push_all(&mut args, &["-c:a", opts.audio_codec.as_str(), "-c:s", "copy"]);
            }
            Some(keep) => {
                for track in keep.tracks() {
                    args.push("-map".to_string());
                    args.push(format!("0:{}", track.id));
                }
                // Output stream indexes follow the map order
                for (index, track) in keep.tracks().enumerate() {
                    let encode = reencode.map_or(true, |r| r.find(track.kind, track.id).is_some());
                    match track.kind {
                        TrackKind::Video if encode => {
                            args.push(format!("-c:{index}"));
                            args.push(opts.video_codec.clone());
                            args.push(format!("-crf:{index}"));
                            args.push(opts.video_quality.to_string());
                            args.push(format!("-preset:{index}"));
                            args.push(opts.video_preset.clone());
                        }
                        TrackKind::Audio if encode => {
                            args.push(format!("-c:{index}"));
                            args.push(opts.audio_codec.clone());
                        }
                        _ => {
                            args.push(format!("-c:{index}"));
                            args.push("copy".to_string());
                        }
                    }
                }
            }
        }

        self.ffmpeg_snippet(&mut args);
        push_all(&mut args, &["-f", "matroska"]);
        args.push(path_arg(temp));
        args
    }

    fn handbrake_args(&self, input: &Path, temp: &Path, deinterlace: bool) -> Vec<String> {
        let opts = &self.options;
        let mut args = vec!["--input".to_string(), path_arg(input)];
        args.push("--output".to_string());
        args.push(path_arg(temp));
        push_all(&mut args, &["--format", "av_mkv", "--encoder"]);
        args.extend(opts.handbrake_video.split_whitespace().map(str::to_string));
        push_all(&mut args, &["--all-audio", "--aencoder"]);
        args.extend(opts.handbrake_audio.split_whitespace().map(str::to_string));
        push_all(&mut args, &["--all-subtitles"]);
        if deinterlace {
            push_all(&mut args, &["--comb-detect", "--decomb"]);
        }
        if let Some(snippet) = opts.snippet {
            push_all(&mut args, &["--start-at", "seconds:0", "--stop-at"]);
            args.push(format!("seconds:{}", snippet.as_secs()));
        }
        args
    }
}

/// mkvmerge per-kind track filters for the tracks kept in `keep`.
fn track_filter_args(keep: &MediaInfo) -> Vec<String> {
    let filters = [
        (TrackKind::Video, "--video-tracks", "--no-video"),
        (TrackKind::Audio, "--audio-tracks", "--no-audio"),
        (TrackKind::Subtitle, "--subtitle-tracks", "--no-subtitles"),
    ];

    let mut args = Vec::new();
    for (kind, include, exclude) in filters {
        let ids: Vec<String> = keep
            .tracks_of(kind)
            .iter()
            .map(|t| t.id.to_string())
            .collect();
        if ids.is_empty() {
            args.push(exclude.to_string());
        } else {
            args.push(include.to_string());
            args.push(ids.join(","));
        }
    }
    args
}

fn remove_temp(temp: &Path) {
    if temp.exists() {
        if let Err(e) = fs::remove_file(temp) {
            tracing::warn!(file = %temp.display(), error = %e, "Failed to remove temporary file");
        }
    }
}
