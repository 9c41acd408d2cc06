//! Framekit - Media command adapter for frame interpolation
//!
//! Command-line entry point exposing every ffmpeg/ffprobe operation the
//! library knows how to build, plus probing of media files.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use framekit::cli::{AnimationArg, Args, CodecArg, Commands, ProbeFact};
use framekit::config::{Config, VideoCodec};
use framekit::error::FramekitError;
use framekit::media::{AnimationFormat, MediaProcessor, MediaProcessorFactory, Operation, Resolution, Tool};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("framekit.toml").exists() {
                info!("Found framekit.toml in current directory, loading...");
                Config::from_file("framekit.toml")?
            } else {
                Config::default()
            }
        }
    };

    let processor = MediaProcessorFactory::create_processor(config.media.clone());

    match args.command {
        Commands::ExtractFrames { input, output_dir, dedupe, size, delete_source } => {
            let size = size.as_deref().map(parse_resolution).transpose()?;
            let operation = Operation::ExtractFrames {
                input,
                frames_dir: output_dir,
                dedupe,
                size,
            };
            processor.perform(&operation, delete_source).await?;
        }
        Commands::ExtractFrame { input, frame, hdr } => {
            let operation = Operation::ExtractSingleFrame {
                input,
                frame_number: frame,
                hdr,
            };
            report_written(processor.perform(&operation, false).await?);
        }
        Commands::Encode { input_dir, output, fps, crf, codec, prefix, format, loop_times, delete_source } => {
            let operation = Operation::FramesToVideo {
                frames_dir: input_dir,
                output,
                codec: codec_or_default(codec, &config),
                crf: crf.unwrap_or(config.encoding.crf),
                fps,
                prefix,
                image_format: format.unwrap_or_else(|| config.encoding.image_format.clone()),
                loop_times,
            };
            report_written(processor.perform(&operation, delete_source).await?);
        }
        Commands::Animate { input_dir, fps, format, optimize, prefix } => {
            let format = match format {
                AnimationArg::Gif => AnimationFormat::Gif,
                AnimationArg::Apng => AnimationFormat::Apng,
            };
            let operation = Operation::FramesToAnimation {
                frames_dir: input_dir,
                format,
                optimize_palette: optimize,
                fps,
                prefix,
            };
            report_written(processor.perform(&operation, false).await?);
        }
        Commands::ConvertFps { input, output, fps, crf, codec } => {
            let operation = Operation::ConvertFramerate {
                input,
                output,
                codec: codec_or_default(codec, &config),
                crf: crf.unwrap_or(config.encoding.crf),
                fps,
            };
            report_written(processor.perform(&operation, false).await?);
        }
        Commands::Loop { input, times, reencode, delete_source } => {
            let reencode = reencode.then_some((config.encoding.codec, config.encoding.crf));
            let operation = Operation::LoopVideo { input, times, reencode };
            report_written(processor.perform(&operation, delete_source).await?);
        }
        Commands::Speed { input, percent, delete_source } => {
            let operation = Operation::ChangeSpeed { input, speed_percent: percent };
            report_written(processor.perform(&operation, delete_source).await?);
        }
        Commands::Convert { input, video_codec, audio_codec, crf, audio_kbps } => {
            let operation = Operation::Encode {
                input,
                video_codec,
                audio_codec,
                crf: crf.unwrap_or(config.encoding.crf),
                audio_kbps,
            };
            report_written(processor.perform(&operation, false).await?);
        }
        Commands::ExtractAudio { input, output } => {
            let written = processor.extract_audio(&input, &output).await?;
            report_written(Some(written));
        }
        Commands::MergeAudio { video, audio, audio_loop } => {
            processor.merge_audio(&video, &audio, audio_loop).await?;
        }
        Commands::ExtractAlpha { input_dir, output_dir } => {
            let count = processor.extract_alpha_dir(&input_dir, &output_dir).await?;
            println!("Extracted alpha channel of {} frames", count);
        }
        Commands::RemoveAlpha { input_dir, scratch_dir, color } => {
            let count = processor.remove_alpha_dir(&input_dir, &scratch_dir, &color).await?;
            println!("Removed alpha channel from {} frames", count);
        }
        Commands::MergeAlpha { rgb_dir, alpha_dir, delete_alpha } => {
            processor.merge_alpha_into_rgb(&rgb_dir, &alpha_dir, delete_alpha).await?;
        }
        Commands::Concat { list, output, loop_times } => {
            let operation = Operation::Concat {
                list_file: list,
                output,
                loop_times,
            };
            report_written(processor.perform(&operation, false).await?);
        }
        Commands::Probe { input, fact, json } => {
            let report = probe(&processor, &input, fact).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
        Commands::Check => {
            processor.check_availability().await?;
            for tool in [Tool::Ffmpeg, Tool::Ffprobe] {
                println!("{}", processor.version_info(tool).await?);
            }
        }
    }

    info!("Framekit completed successfully");
    Ok(())
}

/// Probe facts of one file; `None` means the fact could not be read
#[derive(Debug, Default, Serialize)]
struct ProbeReport {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Option<Resolution>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_codec: Option<Option<String>>,
}

impl ProbeReport {
    fn print(&self) {
        fn show<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(T::to_string).unwrap_or_else(|| "unknown".to_string())
        }

        println!("File: {}", self.path.display());
        if let Some(frames) = &self.frames {
            println!("Frames: {}", show(frames));
        }
        if let Some(fps) = &self.fps {
            println!("FPS: {}", show(fps));
        }
        if let Some(size) = &self.size {
            println!("Size: {}", show(size));
        }
        if let Some(duration) = &self.duration_ms {
            println!("Duration: {}", duration.map(format_duration).unwrap_or_else(|| "unknown".to_string()));
        }
        if let Some(codec) = &self.audio_codec {
            println!("Audio codec: {}", codec.as_deref().unwrap_or("none"));
        }
    }
}

async fn probe(processor: &MediaProcessor, input: &Path, fact: ProbeFact) -> Result<ProbeReport> {
    let wants = |f: ProbeFact| fact == ProbeFact::All || fact == f;
    let mut report = ProbeReport {
        path: input.to_path_buf(),
        ..Default::default()
    };

    if wants(ProbeFact::Frames) {
        report.frames = Some(processor.get_frame_count(input).await?);
    }
    if wants(ProbeFact::Fps) {
        report.fps = Some(processor.get_framerate(input).await?);
    }
    if wants(ProbeFact::Size) {
        report.size = Some(processor.get_size(input).await?);
    }
    if wants(ProbeFact::Duration) {
        report.duration_ms = Some(processor.get_duration_ms(input).await?);
    }
    if wants(ProbeFact::AudioCodec) {
        report.audio_codec = Some(processor.get_audio_codec(input).await?);
    }
    Ok(report)
}

fn codec_or_default(codec: Option<CodecArg>, config: &Config) -> VideoCodec {
    match codec {
        Some(CodecArg::H264) => VideoCodec::H264,
        Some(CodecArg::H265) => VideoCodec::H265,
        None => config.encoding.codec,
    }
}

/// Parse a `WIDTHxHEIGHT` argument
fn parse_resolution(value: &str) -> Result<Resolution> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| FramekitError::InvalidArgument(format!("expected WIDTHxHEIGHT, got '{}'", value)))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| FramekitError::InvalidArgument(format!("invalid dimension '{}' in '{}'", v, value)))
    };
    Ok(Resolution {
        width: parse(width)?,
        height: parse(height)?,
    })
}

fn report_written(path: Option<PathBuf>) {
    if let Some(path) = path {
        println!("Wrote {}", path.display());
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".framekit").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "framekit.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("framekit.log").display());

    Ok(())
}

/// Format milliseconds as H:MM:SS.mmm
fn format_duration(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
