use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::VideoCodec;
use super::commands::format_decimal;
use super::parser::Resolution;

/// Container used when assembling frames into an animated image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationFormat {
    Gif,
    Apng,
}

/// Read-only inspections of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Container duration, sexagesimal
    Duration,
    /// Stream description printed by `ffmpeg -i`
    Framerate,
    /// First video stream's width and height
    Size,
    /// Frame count from stream metadata, or by decoding every frame when `count_slow`
    FrameCount { count_slow: bool },
    /// Full decode with ffmpeg, reading the progress log
    FrameCountDecode,
    /// Codec of the audio streams
    AudioCodec,
}

/// One external tool invocation and its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ExtractFrames {
        input: PathBuf,
        frames_dir: PathBuf,
        dedupe: bool,
        size: Option<Resolution>,
    },
    ExtractSingleFrame {
        input: PathBuf,
        frame_number: u64,
        hdr: bool,
    },
    FramesToVideo {
        frames_dir: PathBuf,
        output: PathBuf,
        codec: VideoCodec,
        crf: u32,
        fps: f64,
        prefix: String,
        image_format: String,
        loop_times: Option<u32>,
    },
    FramesToAnimation {
        frames_dir: PathBuf,
        format: AnimationFormat,
        optimize_palette: bool,
        fps: f64,
        prefix: String,
    },
    ConvertFramerate {
        input: PathBuf,
        output: PathBuf,
        codec: VideoCodec,
        crf: u32,
        fps: f64,
    },
    LoopVideo {
        input: PathBuf,
        times: u32,
        reencode: Option<(VideoCodec, u32)>,
    },
    ChangeSpeed {
        input: PathBuf,
        speed_percent: f64,
    },
    Encode {
        input: PathBuf,
        video_codec: String,
        audio_codec: Option<String>,
        crf: u32,
        audio_kbps: Option<u32>,
    },
    MergeAudio {
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
        audio_loop: Option<i64>,
    },
    ExtractAudio {
        input: PathBuf,
        output: PathBuf,
    },
    MergeAlpha {
        rgb_dir: PathBuf,
        rgb_padding: usize,
        alpha_dir: PathBuf,
        alpha_padding: usize,
    },
    ExtractAlpha {
        input: PathBuf,
        output: PathBuf,
    },
    RemoveAlpha {
        input: PathBuf,
        output: PathBuf,
        fill_color: String,
        size: Resolution,
    },
    Concat {
        list_file: PathBuf,
        output: PathBuf,
        loop_times: Option<u32>,
    },
    Probe {
        input: PathBuf,
        kind: ProbeKind,
    },
}

impl Operation {
    /// Human readable name used in logs and error messages
    pub fn description(&self) -> String {
        match self {
            Operation::ExtractFrames { .. } => "Frame extraction".to_string(),
            Operation::ExtractSingleFrame { frame_number, .. } => format!("Extract frame {}", frame_number),
            Operation::FramesToVideo { codec, crf, .. } => format!("{} encode (CRF {})", codec.encoder(), crf),
            Operation::FramesToAnimation { format, .. } => format!("{:?} animation", format),
            Operation::ConvertFramerate { fps, .. } => format!("Frame rate change to {}", format_decimal(*fps)),
            Operation::LoopVideo { times, .. } => format!("Loop video {}x", times),
            Operation::ChangeSpeed { speed_percent, .. } => format!("Speed change to {}%", format_decimal(*speed_percent)),
            Operation::Encode { video_codec, .. } => format!("{} encode", video_codec),
            Operation::MergeAudio { .. } => "Audio merge".to_string(),
            Operation::ExtractAudio { .. } => "Audio extraction".to_string(),
            Operation::MergeAlpha { .. } => "Alpha merge".to_string(),
            Operation::ExtractAlpha { .. } => "Alpha extraction".to_string(),
            Operation::RemoveAlpha { .. } => "Alpha removal".to_string(),
            Operation::Concat { .. } => "Video concatenation".to_string(),
            Operation::Probe { kind, .. } => format!("{:?} probe", kind),
        }
    }

    /// Input that a successful run makes redundant, removed when the caller asks to delete the source
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Operation::ExtractFrames { input, .. }
            | Operation::ExtractSingleFrame { input, .. }
            | Operation::ConvertFramerate { input, .. }
            | Operation::LoopVideo { input, .. }
            | Operation::ChangeSpeed { input, .. }
            | Operation::Encode { input, .. } => Some(input),
            Operation::FramesToVideo { frames_dir, .. }
            | Operation::FramesToAnimation { frames_dir, .. } => Some(frames_dir),
            _ => None,
        }
    }

    /// File the operation writes, when it writes a single file
    pub fn output_path(&self) -> Option<PathBuf> {
        match self {
            Operation::ExtractSingleFrame { input, frame_number, .. } => Some(single_frame_path(input, *frame_number)),
            Operation::FramesToVideo { output, .. }
            | Operation::ConvertFramerate { output, .. }
            | Operation::MergeAudio { output, .. }
            | Operation::ExtractAudio { output, .. }
            | Operation::ExtractAlpha { output, .. }
            | Operation::RemoveAlpha { output, .. } => Some(output.clone()),
            Operation::Concat { list_file, output, .. } => Some(concat_output_path(list_file, output)),
            Operation::FramesToAnimation { frames_dir, format, .. } => Some(animation_path(frames_dir, *format)),
            Operation::LoopVideo { input, times, .. } => Some(looped_path(input, *times)),
            Operation::ChangeSpeed { input, speed_percent } => Some(speed_path(input, *speed_percent)),
            Operation::Encode { input, .. } => Some(converted_path(input)),
            Operation::ExtractFrames { .. } | Operation::MergeAlpha { .. } | Operation::Probe { .. } => None,
        }
    }
}

/// Where a concat writes `output`; ffmpeg runs inside the list file's directory
pub fn concat_output_path(list_file: &Path, output: &Path) -> PathBuf {
    match list_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if output.is_relative() => dir.join(output),
        _ => output.to_path_buf(),
    }
}

fn normalized(path: &Path) -> PathBuf {
    // Drops trailing separators so suffixes attach to the last component
    path.components().collect()
}

/// Append text to the final path component, e.g. `clip.mp4` + `-temp.mp4`
pub fn append_to_path<P: AsRef<Path>>(path: P, suffix: &str) -> PathBuf {
    let mut raw: OsString = normalized(path.as_ref()).into_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Insert text between the file stem and its extension, e.g. `clip.mp4` -> `clip-4xLoop.mp4`
pub fn with_stem_suffix<P: AsRef<Path>>(path: P, suffix: &str) -> PathBuf {
    let path = path.as_ref();
    let mut stem: OsString = path.file_stem().map(OsString::from).unwrap_or_default();
    stem.push(suffix);
    if let Some(ext) = path.extension() {
        stem.push(".");
        stem.push(ext);
    }
    path.with_file_name(stem)
}

pub fn looped_path<P: AsRef<Path>>(input: P, times: u32) -> PathBuf {
    with_stem_suffix(input, &format!("-{}xLoop", times))
}

pub fn speed_path<P: AsRef<Path>>(input: P, speed_percent: f64) -> PathBuf {
    with_stem_suffix(input, &format!("-{}pcSpeed", format_decimal(speed_percent)))
}

pub fn converted_path<P: AsRef<Path>>(input: P) -> PathBuf {
    with_stem_suffix(input, "-convert").with_extension("mp4")
}

pub fn single_frame_path<P: AsRef<Path>>(input: P, frame_number: u64) -> PathBuf {
    append_to_path(input, &format!("-frame{}.png", frame_number))
}

pub fn animation_path<P: AsRef<Path>>(frames_dir: P, format: AnimationFormat) -> PathBuf {
    match format {
        AnimationFormat::Apng => append_to_path(frames_dir, "-anim.png"),
        AnimationFormat::Gif => append_to_path(frames_dir, ".gif"),
    }
}

/// Temp file for muxing audio; raw wav audio needs mkv instead of mp4
pub fn merge_temp_path<P: AsRef<Path>, Q: AsRef<Path>>(video: P, audio: Q) -> PathBuf {
    let temp = append_to_path(video, "-temp.mp4");
    if is_wav(audio) {
        temp.with_extension("mkv")
    } else {
        temp
    }
}

pub fn is_wav<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Container extension matching an audio codec for stream-copy extraction
pub fn audio_extension(codec: Option<&str>) -> &'static str {
    match codec {
        Some("vorbis") => "ogg",
        Some("mp2") => "mp2",
        Some("aac") => "m4a",
        _ => "wav",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        assert_eq!(looped_path("/v/clip.mp4", 4), PathBuf::from("/v/clip-4xLoop.mp4"));
        assert_eq!(speed_path("/v/clip.mkv", 50.0), PathBuf::from("/v/clip-50pcSpeed.mkv"));
        assert_eq!(speed_path("/v/clip.mkv", 12.5), PathBuf::from("/v/clip-12.5pcSpeed.mkv"));
        assert_eq!(converted_path("/v/clip.webm"), PathBuf::from("/v/clip-convert.mp4"));
        assert_eq!(single_frame_path("/v/clip.mp4", 10), PathBuf::from("/v/clip.mp4-frame10.png"));
    }

    #[test]
    fn test_animation_paths_ignore_trailing_separator() {
        assert_eq!(animation_path("/v/frames/", AnimationFormat::Gif), PathBuf::from("/v/frames.gif"));
        assert_eq!(animation_path("/v/frames", AnimationFormat::Apng), PathBuf::from("/v/frames-anim.png"));
    }

    #[test]
    fn test_merge_temp_path_uses_mkv_for_wav() {
        assert_eq!(merge_temp_path("/v/out.mp4", "/a/track.aac"), PathBuf::from("/v/out.mp4-temp.mp4"));
        assert_eq!(merge_temp_path("/v/out.mp4", "/a/track.WAV"), PathBuf::from("/v/out.mp4-temp.mkv"));
    }

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension(Some("vorbis")), "ogg");
        assert_eq!(audio_extension(Some("aac")), "m4a");
        assert_eq!(audio_extension(Some("mp2")), "mp2");
        assert_eq!(audio_extension(Some("opus")), "wav");
        assert_eq!(audio_extension(None), "wav");
    }

    #[test]
    fn test_concat_output_resolves_against_list_directory() {
        let relative = Operation::Concat {
            list_file: PathBuf::from("/work/chunks/list.txt"),
            output: PathBuf::from("out.mp4"),
            loop_times: None,
        };
        assert_eq!(relative.output_path(), Some(PathBuf::from("/work/chunks/out.mp4")));

        let absolute = Operation::Concat {
            list_file: PathBuf::from("/work/chunks/list.txt"),
            output: PathBuf::from("/renders/out.mp4"),
            loop_times: None,
        };
        assert_eq!(absolute.output_path(), Some(PathBuf::from("/renders/out.mp4")));

        assert_eq!(concat_output_path(Path::new("list.txt"), Path::new("out.mp4")), PathBuf::from("out.mp4"));
    }

    #[test]
    fn test_output_path_for_probe_is_none() {
        let op = Operation::Probe { input: PathBuf::from("a.mp4"), kind: ProbeKind::Size };
        assert_eq!(op.output_path(), None);
        assert_eq!(op.description(), "Size probe");
    }
}
