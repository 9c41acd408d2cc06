use std::path::Path;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{Result, FramekitError};
use super::commands::{
    format_decimal, format_fixed, path_arg, MediaCommand, Tool, DEDUPE_FILTER, EVEN_CROP_FILTER,
    HDR_TONEMAP_FILTER, PNG_COMPRESSION_LEVEL,
};
use super::frames::{pattern_with_width, sequence_pattern};
use super::operation::{AnimationFormat, Operation, ProbeKind};

/// Padding used for frames this crate extracts itself
pub const EXTRACTED_FRAME_PADDING: usize = 8;

const PALETTE_FILTER: &str = "split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";
const ALPHA_EXTRACT_FILTER: &str = "format=yuva444p16le,alphaextract,format=yuv420p";
const ALPHA_MERGE_FILTER: &str = "[0:v:0][1:v:0]alphamerge[out]";

/// Maps operations to ffmpeg/ffprobe command lines
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
    encode_threads: u32,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            encode_threads: config.encode_threads,
        }
    }

    fn ffmpeg(&self, description: String) -> MediaCommand {
        MediaCommand::new(Tool::Ffmpeg, &self.ffmpeg_path, description).arg("-hide_banner")
    }

    /// ffmpeg invocation that writes output, overwriting existing files
    fn ffmpeg_writer(&self, description: String) -> MediaCommand {
        self.ffmpeg(description).arg("-y")
    }

    fn ffprobe(&self, description: String) -> MediaCommand {
        MediaCommand::new(Tool::Ffprobe, &self.ffprobe_path, description).args(["-v", "panic"])
    }

    /// Build version check command
    pub fn version_check(&self, tool: Tool) -> MediaCommand {
        let binary = match tool {
            Tool::Ffmpeg => &self.ffmpeg_path,
            Tool::Ffprobe => &self.ffprobe_path,
        };
        MediaCommand::new(tool, binary, "Version check").arg("-version")
    }

    /// Build the command for an operation
    pub fn build(&self, operation: &Operation) -> Result<MediaCommand> {
        let description = operation.description();

        let command = match operation {
            Operation::ExtractFrames { input, frames_dir, dedupe, size } => {
                let mut cmd = self.ffmpeg_writer(description).input(input);
                if *dedupe {
                    cmd = cmd.args(["-copyts", "-r", "1000"]);
                }
                cmd = cmd
                    .args(["-compression_level", PNG_COMPRESSION_LEVEL])
                    .args(["-vsync", "0"]);
                cmd = if *dedupe {
                    cmd.args(["-frame_pts", "true"]).video_filter(DEDUPE_FILTER)
                } else {
                    cmd.args(["-pix_fmt", "rgb24"])
                };
                let size = size.filter(|s| s.width > 1 && s.height > 1);
                cmd.arg_opt("-s", size.map(|s| s.to_string()))
                    .output(pattern_with_width(frames_dir, "", EXTRACTED_FRAME_PADDING, "png"))
            }

            Operation::ExtractSingleFrame { input, frame_number, hdr } => {
                let select = format!("select=eq(n\\,{})", frame_number);
                let filter = if *hdr {
                    format!("{},{}", HDR_TONEMAP_FILTER, select)
                } else {
                    select
                };
                self.ffmpeg_writer(description)
                    .input(input)
                    .video_filter(filter)
                    .args(["-vframes", "1"])
                    .output(operation.output_path().unwrap_or_default())
            }

            Operation::FramesToVideo { frames_dir, output, codec, crf, fps, prefix, image_format, loop_times } => {
                let pattern = sequence_pattern(frames_dir, prefix, image_format)?;
                let threads = (self.encode_threads > 0).then(|| self.encode_threads.to_string());
                self.ffmpeg_writer(description)
                    .with_loop(*loop_times)
                    .arg("-framerate")
                    .arg(format_decimal(*fps))
                    .input(pattern)
                    .video_codec(codec.encoder())
                    .arg("-crf")
                    .arg(crf.to_string())
                    .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
                    .video_filter(EVEN_CROP_FILTER)
                    .arg_opt("-threads", threads)
                    .output(output)
            }

            Operation::FramesToAnimation { frames_dir, format, optimize_palette, fps, prefix } => {
                let pattern = sequence_pattern(frames_dir, prefix, "png")?;
                let cmd = self
                    .ffmpeg_writer(description)
                    .arg("-framerate")
                    .arg(format_decimal(*fps))
                    .input(pattern);
                let cmd = match format {
                    AnimationFormat::Apng => cmd.args(["-f", "apng", "-plays", "0"]),
                    AnimationFormat::Gif => cmd.args(["-f", "gif"]),
                };
                let palette = optimize_palette.then_some(PALETTE_FILTER);
                cmd.arg_opt("-vf", palette)
                    .output(operation.output_path().unwrap_or_default())
            }

            Operation::ConvertFramerate { input, output, codec, crf, fps } => {
                self.ffmpeg_writer(description)
                    .input(input)
                    .arg("-filter:v")
                    .arg(format!("fps=fps={}", format_decimal(*fps)))
                    .video_codec(codec.encoder())
                    .arg("-crf")
                    .arg(crf.to_string())
                    .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
                    .output(output)
            }

            Operation::LoopVideo { input, times, reencode } => {
                let cmd = self
                    .ffmpeg_writer(description)
                    .stream_loop(i64::from(*times))
                    .input(input);
                let cmd = match reencode {
                    Some((codec, crf)) => cmd
                        .video_codec(codec.encoder())
                        .arg("-crf")
                        .arg(crf.to_string())
                        .audio_codec("copy"),
                    None => cmd.copy_streams(),
                };
                cmd.output(operation.output_path().unwrap_or_default())
            }

            Operation::ChangeSpeed { input, speed_percent } => {
                if !(speed_percent.is_finite() && *speed_percent > 0.0) {
                    return Err(FramekitError::InvalidArgument(format!(
                        "speed must be a positive percentage, got {}",
                        speed_percent
                    )));
                }
                let scale = 1.0 / (speed_percent / 100.0);
                self.ffmpeg_writer(description)
                    .arg("-itsscale")
                    .arg(format_fixed(scale, 4))
                    .input(input)
                    .copy_streams()
                    .output(operation.output_path().unwrap_or_default())
            }

            Operation::Encode { input, video_codec, audio_codec, crf, audio_kbps } => {
                let cmd = self
                    .ffmpeg_writer(description)
                    .input(input)
                    .video_codec(video_codec.as_str())
                    .arg("-crf")
                    .arg(crf.to_string())
                    .args(["-pix_fmt", "yuv420p"]);
                let audio_codec = audio_codec.as_deref().map(str::trim).filter(|c| !c.is_empty());
                let cmd = match audio_codec {
                    Some(codec) => cmd
                        .audio_codec(codec)
                        .arg_opt("-b:a", audio_kbps.map(|kbps| format!("{}k", kbps))),
                    None => cmd.no_audio(),
                };
                cmd.output(operation.output_path().unwrap_or_default())
            }

            Operation::MergeAudio { video, audio, output, audio_loop } => {
                let mut cmd = self.ffmpeg_writer(description).input(video);
                if let Some(times) = audio_loop {
                    cmd = cmd.stream_loop(*times);
                }
                cmd.input(audio)
                    .arg("-shortest")
                    .copy_streams()
                    .output(output)
            }

            Operation::ExtractAudio { input, output } => {
                // Only error-level messages reach stderr, so error markers mean real failures
                self.ffmpeg_writer(description)
                    .args(["-loglevel", "error"])
                    .input(input)
                    .no_video()
                    .audio_codec("copy")
                    .output(output)
            }

            Operation::MergeAlpha { rgb_dir, rgb_padding, alpha_dir, alpha_padding } => {
                let rgb_pattern = pattern_with_width(rgb_dir, "", *rgb_padding, "png");
                self.ffmpeg_writer(description)
                    .input(&rgb_pattern)
                    .input(pattern_with_width(alpha_dir, "", *alpha_padding, "png"))
                    .args(["-filter_complex", ALPHA_MERGE_FILTER, "-map", "[out]"])
                    .output(&rgb_pattern)
            }

            Operation::ExtractAlpha { input, output } => {
                self.ffmpeg_writer(description)
                    .input(input)
                    .video_filter(ALPHA_EXTRACT_FILTER)
                    .output(output)
            }

            Operation::RemoveAlpha { input, output, fill_color, size } => {
                self.ffmpeg_writer(description)
                    .args(["-f", "lavfi"])
                    .arg("-i")
                    .arg(format!("color={}:s={}", fill_color, size))
                    .input(input)
                    .args(["-filter_complex", "overlay=0:0:shortest=1", "-pix_fmt", "rgb24"])
                    .output(output)
            }

            Operation::Concat { list_file, output, loop_times } => {
                let list_name = list_file
                    .file_name()
                    .ok_or_else(|| FramekitError::InvalidArgument(format!(
                        "concat list has no file name: {}",
                        list_file.display()
                    )))?;
                let mut cmd = self
                    .ffmpeg_writer(description)
                    .with_loop(*loop_times)
                    .args(["-vsync", "1", "-f", "concat", "-safe", "0"])
                    .input(list_name)
                    .copy_streams()
                    .args(["-movflags", "+faststart"])
                    .output(output);
                if let Some(parent) = list_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                    cmd = cmd.in_dir(parent);
                }
                cmd
            }

            Operation::Probe { input, kind } => self.probe(description, input, *kind),
        };

        debug!("Built {} command: {}", command.description, command.command_line());
        Ok(command)
    }

    fn probe(&self, description: String, input: &Path, kind: ProbeKind) -> MediaCommand {
        match kind {
            ProbeKind::Duration => self
                .ffprobe(description)
                .args(["-select_streams", "v:0", "-show_entries", "format=duration"])
                .args(["-of", "csv=s=x:p=0", "-sexagesimal"])
                .arg(path_arg(input)),
            ProbeKind::Framerate => self.ffmpeg(description).input(input),
            ProbeKind::Size => self
                .ffprobe(description)
                .args(["-select_streams", "v:0", "-show_entries", "stream=width,height"])
                .args(["-of", "csv=s=x:p=0"])
                .arg(path_arg(input)),
            ProbeKind::FrameCount { count_slow: false } => self
                .ffprobe(description)
                .args(["-select_streams", "v:0", "-show_entries", "stream=nb_frames"])
                .args(["-of", "default=noprint_wrappers=1"])
                .arg(path_arg(input)),
            ProbeKind::FrameCount { count_slow: true } => self
                .ffprobe(description)
                .arg("-count_frames")
                .args(["-select_streams", "v:0", "-show_entries", "stream=nb_read_frames"])
                .args(["-of", "default=nokey=1:noprint_wrappers=1"])
                .arg(path_arg(input)),
            ProbeKind::FrameCountDecode => self
                .ffmpeg(description)
                .input(input)
                .args(["-map", "0:v:0", "-c", "copy", "-f", "null", "-"]),
            ProbeKind::AudioCodec => self
                .ffprobe(description)
                .args(["-select_streams", "a", "-show_entries", "stream=codec_name"])
                .arg(path_arg(input)),
        }
    }
}

trait LoopExt {
    fn with_loop(self, times: Option<u32>) -> Self;
}

impl LoopExt for MediaCommand {
    /// Prepend an input loop only for positive counts
    fn with_loop(self, times: Option<u32>) -> Self {
        match times.filter(|&t| t > 0) {
            Some(times) => self.stream_loop(i64::from(times)),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, VideoCodec};
    use crate::media::parser::{parse_frame_count_metadata, Resolution};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::path::PathBuf;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new(&Config::default().media)
    }

    fn frames_to_video(frames_dir: &Path, loop_times: Option<u32>) -> Operation {
        Operation::FramesToVideo {
            frames_dir: frames_dir.to_path_buf(),
            output: PathBuf::from("/out/my video.mp4"),
            codec: VideoCodec::H264,
            crf: 20,
            fps: 29.97,
            prefix: "f".to_string(),
            image_format: "png".to_string(),
            loop_times,
        }
    }

    #[test]
    fn test_frames_to_video_infers_padding() {
        let dir = TempDir::new().unwrap();
        dir.child("f00000001.png").touch().unwrap();

        let cmd = builder().build(&frames_to_video(dir.path(), None)).unwrap();
        let pattern = path_arg(dir.path().join("f%08d.png"));

        assert_eq!(cmd.tool, Tool::Ffmpeg);
        assert!(cmd.args.windows(2).any(|w| w == ["-framerate", "29.97"]));
        assert!(cmd.args.windows(2).any(|w| w[0] == "-i" && w[1] == pattern));
        assert!(cmd.args.windows(2).any(|w| w == ["-crf", "20"]));
        assert!(!cmd.args.contains(&"-stream_loop".to_string()));
        assert!(!cmd.args.contains(&"-threads".to_string()));
        assert!(cmd.command_line().ends_with("\"/out/my video.mp4\""));
    }

    #[test]
    fn test_frames_to_video_loop_and_threads() {
        let dir = TempDir::new().unwrap();
        dir.child("f0001.png").touch().unwrap();

        let mut config = Config::default().media;
        config.encode_threads = 6;
        let cmd = MediaCommandBuilder::new(&config)
            .build(&frames_to_video(dir.path(), Some(3)))
            .unwrap();

        assert!(cmd.args.windows(2).any(|w| w == ["-stream_loop", "3"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-threads", "6"]));
    }

    #[test]
    fn test_frames_to_video_without_sample_fails() {
        let dir = TempDir::new().unwrap();
        let err = builder().build(&frames_to_video(dir.path(), None)).unwrap_err();
        assert!(matches!(err, FramekitError::NoSampleFile { .. }));
    }

    #[test]
    fn test_building_and_parsing_are_independent() {
        let dir = TempDir::new().unwrap();
        dir.child("f00000001.png").touch().unwrap();
        let op = frames_to_video(dir.path(), None);
        let probe_output = "nb_frames=100\n";

        let first_cmd = builder().build(&op).unwrap();
        let first_count = parse_frame_count_metadata(probe_output);
        let second_count = parse_frame_count_metadata(probe_output);
        let second_cmd = builder().build(&op).unwrap();

        assert_eq!(first_cmd, second_cmd);
        assert_eq!(first_count, Some(100));
        assert_eq!(first_count, second_count);
    }

    #[test]
    fn test_extract_frames_size_is_optional() {
        let op = Operation::ExtractFrames {
            input: PathBuf::from("in.mp4"),
            frames_dir: PathBuf::from("frames"),
            dedupe: false,
            size: Some(Resolution { width: 1, height: 720 }),
        };
        let cmd = builder().build(&op).unwrap();
        assert!(!cmd.args.contains(&"-s".to_string()));
        assert!(cmd.args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert_eq!(cmd.args.last().unwrap(), &path_arg(Path::new("frames").join("%08d.png")));

        let op = Operation::ExtractFrames {
            input: PathBuf::from("in.mp4"),
            frames_dir: PathBuf::from("frames"),
            dedupe: true,
            size: Some(Resolution { width: 1280, height: 720 }),
        };
        let cmd = builder().build(&op).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["-s", "1280x720"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-vf", "mpdecimate"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-r", "1000"]));
    }

    #[test]
    fn test_single_frame_hdr_uses_one_filter_chain() {
        let op = Operation::ExtractSingleFrame {
            input: PathBuf::from("clip.mp4"),
            frame_number: 12,
            hdr: true,
        };
        let cmd = builder().build(&op).unwrap();
        let filters: Vec<_> = cmd.args.iter().filter(|a| *a == "-vf").collect();
        assert_eq!(filters.len(), 1);
        assert!(cmd.command_line().contains("tonemap"));
        assert!(cmd.command_line().contains("select=eq(n\\,12)"));
        assert_eq!(cmd.args.last().unwrap(), "clip.mp4-frame12.png");
    }

    #[test]
    fn test_change_speed_formats_scale_with_dot() {
        let op = Operation::ChangeSpeed { input: PathBuf::from("clip.mp4"), speed_percent: 200.0 };
        let cmd = builder().build(&op).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["-itsscale", "0.5000"]));
        assert_eq!(cmd.args.last().unwrap(), "clip-200pcSpeed.mp4");
    }

    #[test]
    fn test_change_speed_rejects_zero() {
        let op = Operation::ChangeSpeed { input: PathBuf::from("clip.mp4"), speed_percent: 0.0 };
        assert!(matches!(builder().build(&op), Err(FramekitError::InvalidArgument(_))));
    }

    #[test]
    fn test_encode_audio_flags() {
        let with_audio = Operation::Encode {
            input: PathBuf::from("clip.mov"),
            video_codec: "libx264".to_string(),
            audio_codec: Some("aac".to_string()),
            crf: 23,
            audio_kbps: Some(192),
        };
        let cmd = builder().build(&with_audio).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-b:a", "192k"]));
        assert_eq!(cmd.args.last().unwrap(), "clip-convert.mp4");

        let no_bitrate = Operation::Encode {
            input: PathBuf::from("clip.mov"),
            video_codec: "libx264".to_string(),
            audio_codec: Some("aac".to_string()),
            crf: 23,
            audio_kbps: None,
        };
        let cmd = builder().build(&no_bitrate).unwrap();
        assert!(!cmd.args.contains(&"-b:a".to_string()));

        let no_audio = Operation::Encode {
            input: PathBuf::from("clip.mov"),
            video_codec: "libx265".to_string(),
            audio_codec: Some("  ".to_string()),
            crf: 23,
            audio_kbps: Some(192),
        };
        let cmd = builder().build(&no_audio).unwrap();
        assert!(cmd.args.contains(&"-an".to_string()));
        assert!(!cmd.args.contains(&"-c:a".to_string()));
        assert!(!cmd.args.contains(&"-b:a".to_string()));
    }

    #[test]
    fn test_loop_video_variants() {
        let copy = Operation::LoopVideo { input: PathBuf::from("a.mp4"), times: 2, reencode: None };
        let cmd = builder().build(&copy).unwrap();
        assert!(cmd.command_line().contains("-stream_loop 2 -i a.mp4 -c copy a-2xLoop.mp4"));

        let enc = Operation::LoopVideo {
            input: PathBuf::from("a.mp4"),
            times: 2,
            reencode: Some((VideoCodec::H265, 22)),
        };
        let cmd = builder().build(&enc).unwrap();
        assert!(cmd.command_line().contains("-c:v libx265 -crf 22 -c:a copy a-2xLoop.mp4"));
    }

    #[test]
    fn test_merge_audio_loop_is_optional() {
        let op = Operation::MergeAudio {
            video: PathBuf::from("v.mp4"),
            audio: PathBuf::from("a.m4a"),
            output: PathBuf::from("v.mp4-temp.mp4"),
            audio_loop: None,
        };
        let cmd = builder().build(&op).unwrap();
        assert!(cmd.command_line().ends_with("-i v.mp4 -i a.m4a -shortest -c copy v.mp4-temp.mp4"));

        let op = Operation::MergeAudio {
            video: PathBuf::from("v.mp4"),
            audio: PathBuf::from("a.m4a"),
            output: PathBuf::from("v.mp4-temp.mp4"),
            audio_loop: Some(-1),
        };
        let cmd = builder().build(&op).unwrap();
        assert!(cmd.command_line().contains("-i v.mp4 -stream_loop -1 -i a.m4a"));
    }

    #[test]
    fn test_extract_audio_logs_errors_only() {
        let op = Operation::ExtractAudio {
            input: PathBuf::from("/videos/terror_night.mp4"),
            output: PathBuf::from("/videos/audio.m4a"),
        };
        let cmd = builder().build(&op).unwrap();
        assert_eq!(
            cmd.command_line(),
            "-hide_banner -y -loglevel error -i /videos/terror_night.mp4 -vn -c:a copy /videos/audio.m4a"
        );
    }

    #[test]
    fn test_concat_runs_in_list_directory() {
        let op = Operation::Concat {
            list_file: PathBuf::from("/work/chunks/list.txt"),
            output: PathBuf::from("/work/out.mp4"),
            loop_times: None,
        };
        let cmd = builder().build(&op).unwrap();
        assert_eq!(cmd.working_dir, Some(PathBuf::from("/work/chunks")));
        assert!(cmd.args.windows(2).any(|w| w == ["-i", "list.txt"]));
    }

    #[test]
    fn test_merge_alpha_patterns() {
        let op = Operation::MergeAlpha {
            rgb_dir: PathBuf::from("rgb"),
            rgb_padding: 8,
            alpha_dir: PathBuf::from("alpha"),
            alpha_padding: 6,
        };
        let cmd = builder().build(&op).unwrap();
        let rgb = path_arg(Path::new("rgb").join("%08d.png"));
        let alpha = path_arg(Path::new("alpha").join("%06d.png"));
        assert!(cmd.args.windows(2).any(|w| w[0] == "-i" && w[1] == rgb));
        assert!(cmd.args.windows(2).any(|w| w[0] == "-i" && w[1] == alpha));
        assert_eq!(cmd.args.last().unwrap(), &rgb);
    }

    #[test]
    fn test_remove_alpha_uses_image_size() {
        let op = Operation::RemoveAlpha {
            input: PathBuf::from("frames/0001.png"),
            output: PathBuf::from("out/_0001.png"),
            fill_color: "black".to_string(),
            size: Resolution { width: 640, height: 360 },
        };
        let cmd = builder().build(&op).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["-i", "color=black:s=640x360"]));
    }

    #[test]
    fn test_probe_commands_target_right_tool() {
        let b = builder();
        let probe = |kind| Operation::Probe { input: PathBuf::from("clip one.mp4"), kind };

        let cmd = b.build(&probe(ProbeKind::Size)).unwrap();
        assert_eq!(cmd.tool, Tool::Ffprobe);
        assert_eq!(cmd.binary_path, "ffprobe");
        assert!(cmd.command_line().ends_with("\"clip one.mp4\""));

        let cmd = b.build(&probe(ProbeKind::Framerate)).unwrap();
        assert_eq!(cmd.tool, Tool::Ffmpeg);

        let cmd = b.build(&probe(ProbeKind::FrameCount { count_slow: true })).unwrap();
        assert!(cmd.args.contains(&"-count_frames".to_string()));

        let cmd = b.build(&probe(ProbeKind::FrameCount { count_slow: false })).unwrap();
        assert!(cmd.args.contains(&"stream=nb_frames".to_string()));

        let cmd = b.build(&probe(ProbeKind::Duration)).unwrap();
        assert!(cmd.args.contains(&"-sexagesimal".to_string()));
    }
}
