//! Per-file pipelines and the worker pool that runs them.
//!
//! Each file goes through its stages in order and owns its own model and
//! selection. Files are independent, so the pool runs up to `parallelism`
//! of them at once on the blocking thread pool.

use anyhow::Result;
use mkvtidy_av::convert::is_mkv;
use mkvtidy_av::{language, probe, CancelFlag, Converter, Error, Parser, Track, TrackKind, TrackSelection, TrackState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What to do with each file of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Remux every track into matroska.
    Remux,
    /// Re-encode with ffmpeg.
    Convert,
    /// Re-encode with HandBrake.
    ConvertHandBrake,
    /// Re-encode with HandBrake and de-interlace.
    Deinterlace,
    /// Remux into matroska and drop unwanted languages.
    Process,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Remux => "remux",
            Operation::Convert => "convert",
            Operation::ConvertHandBrake => "convert (HandBrake)",
            Operation::Deinterlace => "deinterlace",
            Operation::Process => "process",
        };
        f.write_str(name)
    }
}

/// Result of one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<PathBuf>,
}

/// Runs an [`Operation`] against single files.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    converter: Converter,
    keep_languages: Vec<String>,
}

impl FileProcessor {
    /// Create a processor. Keep languages are normalized to ISO-639-2/B,
    /// unknown ones are dropped with a warning.
    pub fn new(converter: Converter, keep_languages: &[String]) -> Self {
        let keep_languages = keep_languages
            .iter()
            .filter_map(|lang| match language::lookup(lang) {
                Some(code) => Some(code.to_string()),
                None => {
                    tracing::warn!("Ignoring unknown keep language '{}'", lang);
                    None
                }
            })
            .collect();

        Self {
            converter,
            keep_languages,
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn run(&self, operation: Operation, input: &Path) -> mkvtidy_av::Result<PathBuf> {
        match operation {
            Operation::Remux => self.converter.remux_to_mkv(input),
            Operation::Convert => self.converter.convert_to_mkv(input, None, None),
            Operation::ConvertHandBrake => self.converter.convert_to_mkv_handbrake(input),
            Operation::Deinterlace => self.converter.deinterlace_to_mkv(input),
            Operation::Process => self.process(input),
        }
    }

    fn wants(&self, track: &Track) -> bool {
        track.kind == TrackKind::Video
            || track.is_language_unknown()
            || self.keep_languages.iter().any(|lang| *lang == track.language)
    }

    /// Remux into matroska if needed, then drop audio and subtitle tracks in
    /// unwanted languages.
    ///
    /// When no audio track is in a wanted language every audio track is
    /// kept, a file without sound is never produced.
    pub fn process(&self, input: &Path) -> mkvtidy_av::Result<PathBuf> {
        let cancel = self.converter.cancel_flag();

        let path = if is_mkv(input) {
            input.to_path_buf()
        } else {
            self.converter.remux_to_mkv(input)?
        };

        if !is_mkv(&path) {
            // Dry run reports the original path, there is no matroska file to probe
            tracing::info!("Dry run, skipping track selection for {:?}", path);
            return Ok(path);
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let info = probe::probe(self.converter.tools(), &path, Parser::MkvMerge)?;
        if info.has_errors {
            tracing::warn!("{:?} has track anomalies", path);
        }

        let mut selection = TrackSelection::from_media_by(&info, |t| self.wants(t));
        if selection.selected().audio.is_empty() && !info.audio.is_empty() {
            tracing::warn!("No audio track in a wanted language, keeping all audio in {:?}", path);
            for track in &info.audio {
                selection.move_track(track, true);
            }
        }
        selection.set_state(TrackState::Keep, TrackState::Remove);
        selection.log("Keep", "Remove");

        if selection.not_selected().is_empty() {
            tracing::info!("Nothing to remove from {:?}", path);
            return Ok(path);
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.converter.remux_to_mkv_selected(&path, &selection.selected())
    }
}

/// Run `operation` over `files`, at most `parallelism` at a time.
///
/// Files not yet started when cancellation is requested are reported as
/// cancelled. Outcomes are returned in input order.
pub async fn run_all(
    processor: Arc<FileProcessor>,
    operation: Operation,
    files: Vec<PathBuf>,
    parallelism: usize,
) -> Vec<FileOutcome> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for file in files {
        let sem = semaphore.clone();
        let processor = processor.clone();

        let input = file.clone();
        handles.push((
            input,
            tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(anyhow::anyhow!("worker pool closed: {}", e)),
                };

                if processor.converter().cancel_flag().is_cancelled() {
                    return Err(anyhow::Error::from(Error::Cancelled));
                }

                tracing::info!("Starting {} of {:?}", operation, file);
                let result =
                    tokio::task::spawn_blocking(move || processor.run(operation, &file)).await;

                match result {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(anyhow::Error::from(e)),
                    Err(e) => Err(anyhow::anyhow!("worker failed: {}", e)),
                }
            }),
        ));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (input, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("worker failed: {}", e)),
        };
        match &result {
            Ok(output) => tracing::info!("Finished {:?} -> {:?}", input, output),
            Err(e) => tracing::error!("Failed {:?}: {:#}", input, e),
        }
        outcomes.push(FileOutcome { input, result });
    }

    outcomes
}

/// Set `cancel` on Ctrl+C or SIGTERM.
pub async fn cancel_on_signal(cancel: CancelFlag) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("Cancellation requested, finishing running tools");
    cancel.cancel();
}
