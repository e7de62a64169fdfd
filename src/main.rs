mod cli;

use mkvtidy::config;
use mkvtidy::processor::{self, FileProcessor, Operation};
use mkvtidy_av::{probe, CancelFlag, Converter, MediaInfo, ToolSet};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mkvtidy=debug,mkvtidy_av=debug".to_string()
        } else {
            "mkvtidy=info,mkvtidy_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { file, parser, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            probe_file(&config, &file, parser, json)
        }
        Commands::Remux { files } => run_batch(&cli_options(&cli.config, cli.dry_run)?, Operation::Remux, files),
        Commands::Convert { files, handbrake } => {
            let operation = if handbrake {
                Operation::ConvertHandBrake
            } else {
                Operation::Convert
            };
            run_batch(&cli_options(&cli.config, cli.dry_run)?, operation, files)
        }
        Commands::Deinterlace { files } => {
            run_batch(&cli_options(&cli.config, cli.dry_run)?, Operation::Deinterlace, files)
        }
        Commands::Process { files } => {
            run_batch(&cli_options(&cli.config, cli.dry_run)?, Operation::Process, files)
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

/// Load config and apply the global `--dry-run` override.
fn cli_options(config_path: &Option<PathBuf>, dry_run: bool) -> Result<config::Config> {
    let mut config = config::load_config_or_default(config_path.as_deref())?;
    if dry_run {
        config.process.dry_run = true;
    }
    Ok(config)
}

fn run_batch(config: &config::Config, operation: Operation, files: Vec<PathBuf>) -> Result<()> {
    for file in &files {
        if !file.exists() {
            anyhow::bail!("File does not exist: {:?}", file);
        }
    }

    let cancel = CancelFlag::new();
    let tools = ToolSet::discover(&config.tools);
    let converter = Converter::new(tools, config.convert_options()).with_cancel(cancel.clone());
    let processor = Arc::new(FileProcessor::new(converter, &config.process.keep_languages));

    if config.process.dry_run {
        println!("[DRY RUN] Commands are logged, no files are changed");
    }

    let total = files.len();
    let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let outcomes = rt.block_on(async {
        tokio::spawn(processor::cancel_on_signal(cancel));
        processor::run_all(processor, operation, files, config.process.parallelism).await
    });

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(output) => println!("✓ {} -> {}", outcome.input.display(), output.display()),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {:#}", outcome.input.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to {}", failed, total, operation);
    }

    Ok(())
}

fn probe_file(
    config: &config::Config,
    file: &Path,
    parser: Option<mkvtidy_av::Parser>,
    json: bool,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolSet::discover(&config.tools);
    let media_info = match parser {
        Some(parser) => probe::probe(&tools, file, parser),
        None => probe::probe_any(&tools, file),
    }
    .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&media_info)?;
        println!("{}", json_str);
    } else {
        print_media_info(file, &media_info);
    }

    Ok(())
}

fn print_media_info(file: &Path, media_info: &MediaInfo) {
    println!("File: {}", file.display());
    println!("Parser: {}", media_info.parser);
    println!("Container: {}", media_info.container);
    let secs = media_info.duration.as_secs();
    println!("Duration: {:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    println!("Attachments: {}", media_info.attachments);
    println!("Chapters: {}", media_info.chapters);
    if media_info.has_tags {
        println!("Tags: yes");
    }
    if media_info.has_errors {
        println!("Errors: yes");
    }

    for kind in mkvtidy_av::TrackKind::ALL {
        let tracks = media_info.tracks_of(kind);
        println!("\n{} Tracks: {}", kind, tracks.len());
        for track in tracks {
            print!(
                "  [{}] #{} {} ({}) {}",
                track.id, track.number, track.format, track.codec, track.language
            );
            if let Some(ref title) = track.title {
                print!(" \"{}\"", title);
            }
            if track.default {
                print!(" [default]");
            }
            if track.has_errors {
                print!(" [error]");
            }
            println!();
        }
    }
}

fn check_tools(config: &config::Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolSet::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Keep languages: {}", config.process.keep_languages.join(", "));
    println!("  Parallelism: {}", config.process.parallelism);
    println!("  Dry run: {}", config.process.dry_run);
    println!(
        "  Video: {} crf {} preset {}",
        config.convert.video_codec, config.convert.video_quality, config.convert.video_preset
    );
    println!("  Audio: {}", config.convert.audio_codec);
    if let Some(secs) = config.process.snippet_seconds {
        println!("  Snippet: {}s", secs);
    }

    Ok(())
}
