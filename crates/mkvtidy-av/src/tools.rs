//! External tool detection and invocation.
//!
//! The [`ToolSet`] resolves the location of every external program once and
//! carries the [`ToolInvoker`] used to run them, so tests can substitute a
//! scripted invoker for real processes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// External programs the crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    MkvMerge,
    FfMpeg,
    FfProbe,
    MediaInfo,
    HandBrake,
}

impl ToolKind {
    /// All known tools.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::MkvMerge,
        ToolKind::FfMpeg,
        ToolKind::FfProbe,
        ToolKind::MediaInfo,
        ToolKind::HandBrake,
    ];

    /// Executable name searched for on `PATH`.
    pub fn executable(&self) -> &'static str {
        match self {
            ToolKind::MkvMerge => "mkvmerge",
            ToolKind::FfMpeg => "ffmpeg",
            ToolKind::FfProbe => "ffprobe",
            ToolKind::MediaInfo => "mediainfo",
            ToolKind::HandBrake => "HandBrakeCLI",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolKind::FfMpeg | ToolKind::FfProbe => "-version",
            _ => "--version",
        }
    }

    /// Whether an exit code means success for this tool family.
    ///
    /// mkvmerge returns 1 when it finished with warnings; the output is
    /// still complete.
    pub fn accepts(&self, exit_code: i32) -> bool {
        match self {
            ToolKind::MkvMerge => matches!(exit_code, 0 | 1),
            _ => exit_code == 0,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Optional explicit tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub mkvmerge_path: Option<PathBuf>,

    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub mediainfo_path: Option<PathBuf>,

    #[serde(default)]
    pub handbrake_path: Option<PathBuf>,
}

impl ToolsConfig {
    fn path_for(&self, kind: ToolKind) -> Option<&Path> {
        match kind {
            ToolKind::MkvMerge => self.mkvmerge_path.as_deref(),
            ToolKind::FfMpeg => self.ffmpeg_path.as_deref(),
            ToolKind::FfProbe => self.ffprobe_path.as_deref(),
            ToolKind::MediaInfo => self.mediainfo_path.as_deref(),
            ToolKind::HandBrake => self.handbrake_path.as_deref(),
        }
    }
}

/// Exit code and captured output of one tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Process exit code, -1 when terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Capability to run an external program to completion.
///
/// Implementations block until the process exits. A launched process is
/// never interrupted; cancellation is checked by callers between runs.
pub trait ToolInvoker: Send + Sync {
    /// Run `program` with `args`, returning its exit code and output.
    ///
    /// Only failing to start the process is an error; a non-zero exit code
    /// is reported through [`ToolOutput::exit_code`].
    fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput>;
}

/// [`ToolInvoker`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ToolInvoker for ProcessInvoker {
    fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput> {
        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(program.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        Ok(ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Availability information for a tool, returned by [`ToolSet::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// First line of the version output, if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Resolved tool locations plus the invoker used to run them.
#[derive(Clone)]
pub struct ToolSet {
    paths: HashMap<ToolKind, PathBuf>,
    invoker: Arc<dyn ToolInvoker>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet").field("paths", &self.paths).finish()
    }
}

impl ToolSet {
    /// Discover tools, preferring configured paths that exist over `PATH`.
    ///
    /// Tools that cannot be found are left out; [`ToolSet::require`]
    /// reports them when they are actually needed.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut paths = HashMap::new();

        for kind in ToolKind::ALL {
            let resolved = match config.path_for(kind) {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(tool = %kind, path = %p.display(), "Configured tool path does not exist, searching PATH");
                    which::which(kind.executable()).ok()
                }
                None => which::which(kind.executable()).ok(),
            };

            if let Some(path) = resolved {
                paths.insert(kind, path);
            }
        }

        Self {
            paths,
            invoker: Arc::new(ProcessInvoker),
        }
    }

    /// Build a tool set from explicit paths and a custom invoker.
    pub fn with_invoker(
        paths: impl IntoIterator<Item = (ToolKind, PathBuf)>,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            invoker,
        }
    }

    /// Path of a tool, or [`Error::ToolNotFound`].
    pub fn require(&self, kind: ToolKind) -> Result<&Path> {
        self.paths
            .get(&kind)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::tool_not_found(kind.executable()))
    }

    /// Run a tool and return its output regardless of exit code.
    pub fn run(&self, kind: ToolKind, args: &[String]) -> Result<ToolOutput> {
        let program = self.require(kind)?;
        tracing::debug!(tool = %kind, args = %args.join(" "), "Running tool");
        self.invoker.run(program, args)
    }

    /// Run a tool and fail unless its family accepts the exit code.
    pub fn run_checked(&self, kind: ToolKind, args: &[String]) -> Result<ToolOutput> {
        let output = self.run(kind, args)?;
        if !kind.accepts(output.exit_code) {
            return Err(Error::tool_failed(
                kind.executable(),
                format!("exited with code {}: {}", output.exit_code, output.stderr.trim()),
            ));
        }
        if output.exit_code != 0 {
            tracing::warn!(tool = %kind, exit_code = output.exit_code, "Tool completed with warnings");
        }
        Ok(output)
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        ToolKind::ALL
            .iter()
            .map(|&kind| match self.paths.get(&kind) {
                Some(path) => {
                    let version = self
                        .invoker
                        .run(path, &[kind.version_arg().to_string()])
                        .ok()
                        .filter(|out| out.exit_code == 0)
                        .and_then(|out| out.stdout.lines().next().map(str::to_string));
                    ToolInfo {
                        name: kind.executable().to_string(),
                        available: version.is_some(),
                        version,
                        path: Some(path.clone()),
                    }
                }
                None => ToolInfo {
                    name: kind.executable().to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoInvoker(i32);

    impl ToolInvoker for EchoInvoker {
        fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput> {
            Ok(ToolOutput {
                exit_code: self.0,
                stdout: format!("{} {}\nsecond line", program.display(), args.join(" ")),
                stderr: "boom".to_string(),
            })
        }
    }

    fn tool_set(exit_code: i32) -> ToolSet {
        ToolSet::with_invoker(
            [(ToolKind::MkvMerge, PathBuf::from("/usr/bin/mkvmerge")), (ToolKind::FfMpeg, PathBuf::from("/usr/bin/ffmpeg"))],
            Arc::new(EchoInvoker(exit_code)),
        )
    }

    #[test]
    fn test_accepts_exit_codes() {
        assert!(ToolKind::MkvMerge.accepts(0));
        assert!(ToolKind::MkvMerge.accepts(1));
        assert!(!ToolKind::MkvMerge.accepts(2));
        assert!(ToolKind::FfMpeg.accepts(0));
        assert!(!ToolKind::FfMpeg.accepts(1));
        assert!(!ToolKind::HandBrake.accepts(-1));
    }

    #[test]
    fn test_require_missing_tool() {
        let tools = tool_set(0);
        assert!(tools.require(ToolKind::MkvMerge).is_ok());
        assert!(matches!(
            tools.require(ToolKind::HandBrake),
            Err(Error::ToolNotFound { .. })
        ));
    }

    #[test]
    fn test_run_checked_warning_code() {
        assert!(tool_set(1).run_checked(ToolKind::MkvMerge, &[]).is_ok());
        let err = tool_set(1).run_checked(ToolKind::FfMpeg, &[]).unwrap_err();
        assert!(err.to_string().contains("exited with code 1"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_check_all_reports_every_tool() {
        let infos = tool_set(0).check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["mkvmerge", "ffmpeg", "ffprobe", "mediainfo", "HandBrakeCLI"]);
        assert!(infos[0].available);
        assert_eq!(infos[0].version.as_deref(), Some("/usr/bin/mkvmerge --version"));
        assert_eq!(infos[1].version.as_deref(), Some("/usr/bin/ffmpeg -version"));
        assert!(!infos[2].available);
    }

    #[test]
    fn test_process_invoker_missing_program() {
        let result = ProcessInvoker.run(Path::new("nonexistent_tool_xyz_12345"), &[]);
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }

    #[test]
    fn test_discover_with_default_config() {
        // Nothing is guaranteed to be installed, but discovery must not panic.
        let tools = ToolSet::discover(&ToolsConfig::default());
        assert_eq!(tools.check_all().len(), ToolKind::ALL.len());
    }
}
