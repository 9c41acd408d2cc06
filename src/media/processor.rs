use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{Result, FramekitError};
use super::cleanup::{delete_source, remove_if_exists};
use super::commands::Tool;
use super::frames::{padding_width, sorted_files};
use super::operation::{audio_extension, is_wav, merge_temp_path, Operation, ProbeKind};
use super::parser::{self, Resolution};
use super::runner::{CommandRunner, ProcessOutput, ProcessRunner};
use super::MediaCommandBuilder;

/// Runs operations against ffmpeg/ffprobe and interprets the results
pub struct MediaProcessor {
    config: MediaConfig,
    builder: MediaCommandBuilder,
    runner: Box<dyn CommandRunner>,
}

impl MediaProcessor {
    /// Create a processor that spawns the configured binaries
    pub fn new(config: MediaConfig) -> Self {
        Self::with_runner(config, Box::new(ProcessRunner::new()))
    }

    /// Create a processor with a custom command runner
    pub fn with_runner(config: MediaConfig, runner: Box<dyn CommandRunner>) -> Self {
        let builder = MediaCommandBuilder::new(&config);
        Self { config, builder, runner }
    }

    async fn run(&self, operation: &Operation) -> Result<ProcessOutput> {
        let command = self.builder.build(operation)?;
        self.runner.run(&command).await
    }

    async fn execute(&self, operation: &Operation) -> Result<ProcessOutput> {
        let output = self.run(operation).await?;
        output.ensure_success(&operation.description())?;
        Ok(output)
    }

    /// Run a media-producing operation and optionally delete its source afterwards.
    ///
    /// Returns the file the operation wrote, if it writes a single file. The source
    /// is only deleted once the tool has exited successfully. Audio extraction,
    /// audio merging and the per-directory alpha passes have their own methods
    /// because they do extra file handling around the tool call.
    pub async fn perform(&self, operation: &Operation, delete_src: bool) -> Result<Option<PathBuf>> {
        if let Operation::Probe { .. } = operation {
            return Err(FramekitError::InvalidArgument(
                "probes do not produce media, use the probe methods".to_string(),
            ));
        }

        if let Operation::ExtractFrames { frames_dir, .. } = operation {
            fs::create_dir_all(frames_dir).await?;
        }

        info!("{}...", operation.description());
        self.execute(operation).await?;

        if delete_src {
            if let Some(source) = operation.source_path() {
                delete_source(source).await?;
            }
        }

        let output = operation.output_path();
        if let Some(path) = &output {
            info!("{} completed: {}", operation.description(), path.display());
        } else {
            info!("{} completed", operation.description());
        }
        Ok(output)
    }

    /// Copy the audio stream out of a video, choosing the container from its codec.
    ///
    /// The extension of `output` is replaced to match the codec. A partially
    /// written file is removed when the tool fails.
    pub async fn extract_audio<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<PathBuf> {
        let input = input.as_ref();
        let codec = self.get_audio_codec(input).await?;
        let output = output.as_ref().with_extension(audio_extension(codec.as_deref()));
        info!("Extracting audio from {} to {}", input.display(), output.display());

        let operation = Operation::ExtractAudio {
            input: input.to_path_buf(),
            output: output.clone(),
        };
        let result = self.run(&operation).await?;

        let checked = result.ensure_success(&operation.description()).and_then(|_| {
            if parser::reports_error(&result.text()) {
                Err(FramekitError::Subprocess {
                    description: operation.description(),
                    detail: result.last_line().to_string(),
                })
            } else {
                Ok(())
            }
        });

        if let Err(e) = checked {
            warn!("Audio extraction failed, removing {}", output.display());
            remove_if_exists(&output).await;
            return Err(e);
        }

        Ok(output)
    }

    /// Mux an audio track into a video in place.
    ///
    /// The result is written to a temp file that replaces the video only when the
    /// tool succeeds; otherwise the temp file is removed and the video is untouched.
    pub async fn merge_audio<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video: P,
        audio: Q,
        audio_loop: Option<i64>,
    ) -> Result<()> {
        let video = video.as_ref();
        let audio = audio.as_ref();
        info!("Merging audio from {} into {}", audio.display(), video.display());

        if is_wav(audio) {
            info!("Using MKV instead of MP4 to enable support for raw audio");
        }
        let temp = merge_temp_path(video, audio);

        let operation = Operation::MergeAudio {
            video: video.to_path_buf(),
            audio: audio.to_path_buf(),
            output: temp.clone(),
            audio_loop,
        };
        let result = self.run(&operation).await?;

        let checked = result.ensure_success(&operation.description()).and_then(|_| {
            if result.text().contains("Invalid data") {
                Err(FramekitError::Subprocess {
                    description: operation.description(),
                    detail: result.last_line().to_string(),
                })
            } else {
                Ok(())
            }
        });

        if let Err(e) = checked {
            warn!("Failed to merge audio: {}", e);
            remove_if_exists(&temp).await;
            return Err(e);
        }

        fs::remove_file(video).await?;
        fs::rename(&temp, video).await?;
        info!("Audio merge completed");
        Ok(())
    }

    /// Extract the alpha channel of every image in `rgb_dir` into `alpha_dir`, keeping file names
    pub async fn extract_alpha_dir<P: AsRef<Path>, Q: AsRef<Path>>(&self, rgb_dir: P, alpha_dir: Q) -> Result<usize> {
        let rgb_dir = rgb_dir.as_ref();
        let alpha_dir = alpha_dir.as_ref();
        fs::create_dir_all(alpha_dir).await?;

        let files = sorted_files(rgb_dir)?;
        info!("Extracting alpha channel of {} frames into {}", files.len(), alpha_dir.display());
        let pb = frame_progress(files.len());

        for file in &files {
            let name = file_name(file)?;
            let operation = Operation::ExtractAlpha {
                input: file.clone(),
                output: alpha_dir.join(name),
            };
            self.execute(&operation).await?;
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(files.len())
    }

    /// Flatten every image in `dir` onto a solid background, replacing the originals.
    ///
    /// `scratch_dir` receives the intermediate files before they are moved back.
    pub async fn remove_alpha_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        dir: P,
        scratch_dir: Q,
        fill_color: &str,
    ) -> Result<usize> {
        let dir = dir.as_ref();
        let scratch_dir = scratch_dir.as_ref();
        fs::create_dir_all(scratch_dir).await?;

        let files = sorted_files(dir)?;
        info!("Removing alpha channel from {} frames in {}", files.len(), dir.display());
        let pb = frame_progress(files.len());

        for file in &files {
            let size = self.get_size(file).await?.ok_or_else(|| {
                FramekitError::Media(format!("Could not read image size of {}", file.display()))
            })?;

            let mut scratch_name = std::ffi::OsString::from("_");
            scratch_name.push(file_name(file)?);
            let scratch = scratch_dir.join(scratch_name);

            let operation = Operation::RemoveAlpha {
                input: file.clone(),
                output: scratch.clone(),
                fill_color: fill_color.to_string(),
                size,
            };
            self.execute(&operation).await?;

            fs::remove_file(file).await?;
            fs::rename(&scratch, file).await?;
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(files.len())
    }

    /// Merge the alpha frames in `alpha_dir` back into the rgb frames in place
    pub async fn merge_alpha_into_rgb<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        rgb_dir: P,
        alpha_dir: Q,
        delete_alpha_dir: bool,
    ) -> Result<()> {
        let rgb_dir = rgb_dir.as_ref();
        let alpha_dir = alpha_dir.as_ref();

        let operation = Operation::MergeAlpha {
            rgb_dir: rgb_dir.to_path_buf(),
            rgb_padding: padding_width(rgb_dir, "", "png")?,
            alpha_dir: alpha_dir.to_path_buf(),
            alpha_padding: padding_width(alpha_dir, "", "png")?,
        };
        info!("Merging alpha frames from {} into {}", alpha_dir.display(), rgb_dir.display());
        self.execute(&operation).await?;

        if delete_alpha_dir {
            delete_source(alpha_dir).await?;
        }
        Ok(())
    }

    async fn probe(&self, input: &Path, kind: ProbeKind) -> Result<ProcessOutput> {
        let operation = Operation::Probe {
            input: input.to_path_buf(),
            kind,
        };
        // Probe exit codes are not meaningful; `ffmpeg -i` alone always exits non-zero
        self.run(&operation).await
    }

    /// Container duration in milliseconds
    pub async fn get_duration_ms<P: AsRef<Path>>(&self, input: P) -> Result<Option<u64>> {
        let input = input.as_ref();
        debug!("Reading duration of {} using ffprobe", input.display());
        let output = self.probe(input, ProbeKind::Duration).await?;
        Ok(parser::parse_duration_ms(&output.stdout))
    }

    /// Frame rate of the first video stream
    pub async fn get_framerate<P: AsRef<Path>>(&self, input: P) -> Result<Option<f64>> {
        let input = input.as_ref();
        debug!("Reading FPS of {} using ffmpeg", input.display());
        let output = self.probe(input, ProbeKind::Framerate).await?;
        Ok(parser::parse_framerate(&output.text()))
    }

    /// Width and height of the first video stream (or image)
    pub async fn get_size<P: AsRef<Path>>(&self, input: P) -> Result<Option<Resolution>> {
        let input = input.as_ref();
        let output = self.probe(input, ProbeKind::Size).await?;
        Ok(parser::parse_size(&output.stdout))
    }

    /// Codec of the first audio stream, `None` when there is no audio
    pub async fn get_audio_codec<P: AsRef<Path>>(&self, input: P) -> Result<Option<String>> {
        let input = input.as_ref();
        let output = self.probe(input, ProbeKind::AudioCodec).await?;
        let codec = parser::parse_audio_codec(&output.stdout);
        debug!("Audio codec of {}: {:?}", input.display(), codec);
        Ok(codec)
    }

    /// Total frame count of the first video stream.
    ///
    /// Reads ffprobe first (stream metadata, or a full count when
    /// `count_frames_slow` is set) and falls back to decoding with ffmpeg.
    pub async fn get_frame_count<P: AsRef<Path>>(&self, input: P) -> Result<Option<u64>> {
        let input = input.as_ref();
        let count_slow = self.config.count_frames_slow;

        debug!("Reading frame count of {} using ffprobe", input.display());
        if count_slow {
            info!("Counting total frames using ffprobe. This can take a moment...");
        }
        let output = self.probe(input, ProbeKind::FrameCount { count_slow }).await?;
        let frames = if count_slow {
            parser::parse_frame_count_counted(&output.stdout)
        } else {
            parser::parse_frame_count_metadata(&output.stdout)
        };
        if frames.is_some() {
            return Ok(frames);
        }

        debug!("Failed to get frame count using ffprobe, reading frame count using ffmpeg");
        let output = self.probe(input, ProbeKind::FrameCountDecode).await?;
        let frames = parser::parse_frame_count_decode(&output.text());
        if frames.is_none() {
            warn!("Failed to get total frame count of {}", input.display());
        }
        Ok(frames)
    }

    /// Check that both ffmpeg and ffprobe can be executed
    pub async fn check_availability(&self) -> Result<()> {
        for tool in [Tool::Ffmpeg, Tool::Ffprobe] {
            let command = self.builder.version_check(tool);
            let output = self.runner.run(&command).await?;
            output.ensure_success(&format!("{} version check", command.binary_path))?;
            info!("{} is available", command.binary_path);
        }
        Ok(())
    }

    /// First line of the tool's `-version` output
    pub async fn version_info(&self, tool: Tool) -> Result<String> {
        let command = self.builder.version_check(tool);
        let output = self.runner.run(&command).await?;
        output.ensure_success(&format!("{} version check", command.binary_path))?;
        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or("Unknown version")
            .to_string())
    }
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| FramekitError::InvalidArgument(format!("not a file path: {}", path.display())))
}

fn frame_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
