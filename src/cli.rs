use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every frame of a video as numbered PNGs
    ExtractFrames {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the frames
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Drop near-duplicate frames
        #[arg(long)]
        dedupe: bool,

        /// Scale frames to WIDTHxHEIGHT
        #[arg(long)]
        size: Option<String>,

        /// Delete the input after a successful run
        #[arg(long)]
        delete_source: bool,
    },

    /// Extract a single frame as PNG next to the input
    ExtractFrame {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Zero-based frame number
        #[arg(short, long)]
        frame: u64,

        /// Tonemap HDR input to SDR
        #[arg(long)]
        hdr: bool,
    },

    /// Encode a directory of numbered frames into a video
    Encode {
        /// Directory containing the frames
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Output frame rate
        #[arg(long)]
        fps: f64,

        /// Constant rate factor (defaults to the configured value)
        #[arg(long)]
        crf: Option<u32>,

        /// Video codec (defaults to the configured value)
        #[arg(long, value_enum)]
        codec: Option<CodecArg>,

        /// Frame filename prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Frame image format (defaults to the configured value)
        #[arg(long)]
        format: Option<String>,

        /// Loop the frame sequence this many extra times
        #[arg(long)]
        loop_times: Option<u32>,

        /// Delete the frames directory after a successful run
        #[arg(long)]
        delete_source: bool,
    },

    /// Assemble a directory of frames into a GIF or APNG
    Animate {
        /// Directory containing the frames
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Animation frame rate
        #[arg(long)]
        fps: f64,

        /// Output format
        #[arg(long, value_enum, default_value = "gif")]
        format: AnimationArg,

        /// Generate an optimized palette
        #[arg(long)]
        optimize: bool,

        /// Frame filename prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Re-encode a video at a different frame rate
    ConvertFps {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Target frame rate
        #[arg(long)]
        fps: f64,

        /// Constant rate factor (defaults to the configured value)
        #[arg(long)]
        crf: Option<u32>,

        /// Video codec (defaults to the configured value)
        #[arg(long, value_enum)]
        codec: Option<CodecArg>,
    },

    /// Loop a video a number of times
    Loop {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Number of extra loops
        #[arg(short, long)]
        times: u32,

        /// Re-encode instead of stream copy
        #[arg(long)]
        reencode: bool,

        /// Delete the input after a successful run
        #[arg(long)]
        delete_source: bool,
    },

    /// Change playback speed without re-encoding
    Speed {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// New speed in percent (200 = twice as fast)
        #[arg(short, long)]
        percent: f64,

        /// Delete the input after a successful run
        #[arg(long)]
        delete_source: bool,
    },

    /// Transcode a video to MP4
    Convert {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Video encoder name
        #[arg(long, default_value = "libx264")]
        video_codec: String,

        /// Audio encoder name; omit to drop audio
        #[arg(long)]
        audio_codec: Option<String>,

        /// Constant rate factor (defaults to the configured value)
        #[arg(long)]
        crf: Option<u32>,

        /// Audio bitrate in kbit/s
        #[arg(long)]
        audio_kbps: Option<u32>,
    },

    /// Copy the audio track out of a video
    ExtractAudio {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file (extension is chosen from the codec)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mux an audio track into a video in place
    MergeAudio {
        /// Video file to modify
        #[arg(short, long)]
        video: PathBuf,

        /// Audio file to add
        #[arg(short, long)]
        audio: PathBuf,

        /// Loop the audio this many times (-1 = until the video ends)
        #[arg(long, allow_hyphen_values = true)]
        audio_loop: Option<i64>,
    },

    /// Split the alpha channel of every frame into a separate directory
    ExtractAlpha {
        /// Directory with RGBA frames
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory receiving the alpha frames
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Flatten every frame in a directory onto a solid color
    RemoveAlpha {
        /// Directory with RGBA frames, modified in place
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Scratch directory for intermediate files
        #[arg(short, long)]
        scratch_dir: PathBuf,

        /// Background color
        #[arg(long, default_value = "black")]
        color: String,
    },

    /// Merge alpha frames back into RGB frames
    MergeAlpha {
        /// Directory with RGB frames, modified in place
        #[arg(short, long)]
        rgb_dir: PathBuf,

        /// Directory with alpha frames
        #[arg(short, long)]
        alpha_dir: PathBuf,

        /// Delete the alpha directory afterwards
        #[arg(long)]
        delete_alpha: bool,
    },

    /// Concatenate the videos listed in an ffmpeg concat file
    Concat {
        /// Concat list file
        #[arg(short, long)]
        list: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Loop the result this many extra times
        #[arg(long)]
        loop_times: Option<u32>,
    },

    /// Inspect a media file
    Probe {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        /// Fact to read
        #[arg(long, value_enum, default_value = "all")]
        fact: ProbeFact,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe can be executed
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CodecArg {
    H264,
    H265,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AnimationArg {
    Gif,
    Apng,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProbeFact {
    All,
    Frames,
    Fps,
    Size,
    Duration,
    AudioCodec,
}
