use mkvtidy_av::ConvertOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use mkvtidy_av::ToolsConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub convert: ConvertConfig,

    #[serde(default)]
    pub process: ProcessConfig,
}

impl Config {
    /// Options handed to the converter.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            video_codec: self.convert.video_codec.clone(),
            video_quality: self.convert.video_quality,
            video_preset: self.convert.video_preset.clone(),
            audio_codec: self.convert.audio_codec.clone(),
            handbrake_video: self.convert.handbrake_video.clone(),
            handbrake_audio: self.convert.handbrake_audio.clone(),
            dry_run: self.process.dry_run,
            snippet: self.process.snippet_seconds.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertConfig {
    /// ffmpeg video encoder (default: "libx264")
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Constant rate factor, lower is better quality (default: 20)
    #[serde(default = "default_video_quality")]
    pub video_quality: u8,

    /// ffmpeg encoder preset (default: "medium")
    #[serde(default = "default_video_preset")]
    pub video_preset: String,

    /// ffmpeg audio encoder (default: "ac3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// HandBrake video encoder and its options
    #[serde(default = "default_handbrake_video")]
    pub handbrake_video: String,

    /// HandBrake audio encoder and its options
    #[serde(default = "default_handbrake_audio")]
    pub handbrake_audio: String,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_video_quality() -> u8 {
    20
}

fn default_video_preset() -> String {
    "medium".to_string()
}

fn default_audio_codec() -> String {
    "ac3".to_string()
}

fn default_handbrake_video() -> String {
    "x264 --quality 20 --encoder-preset medium".to_string()
}

fn default_handbrake_audio() -> String {
    "copy --audio-fallback ac3".to_string()
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            video_quality: default_video_quality(),
            video_preset: default_video_preset(),
            audio_codec: default_audio_codec(),
            handbrake_video: default_handbrake_video(),
            handbrake_audio: default_handbrake_audio(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessConfig {
    /// Audio and subtitle languages to keep, tracks in other languages are
    /// removed. Tracks with no language are always kept.
    #[serde(default = "default_keep_languages")]
    pub keep_languages: Vec<String>,

    /// Files processed at the same time
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Log commands without running them
    #[serde(default)]
    pub dry_run: bool,

    /// Only process this many seconds of each file, for trying settings
    #[serde(default)]
    pub snippet_seconds: Option<u64>,
}

fn default_keep_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_parallelism() -> usize {
    1
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            keep_languages: default_keep_languages(),
            parallelism: default_parallelism(),
            dry_run: false,
            snippet_seconds: None,
        }
    }
}
