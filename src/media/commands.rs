use std::fmt;
use std::path::{Path, PathBuf};

/// Crops frames to even dimensions before encoding
pub const EVEN_CROP_FILTER: &str = "crop=trunc(iw/2)*2:trunc(ih/2)*2";

/// Drops near-duplicate frames during extraction
pub const DEDUPE_FILTER: &str = "mpdecimate";

/// Tonemaps HDR input down to SDR bt709
pub const HDR_TONEMAP_FILTER: &str = "zscale=t=linear:npl=100,format=gbrpf32le,zscale=p=bt709,tonemap=tonemap=hable:desat=0,zscale=t=bt709:m=bt709:r=tv,format=yuv420p";

/// PNG compression level used for extracted frames
pub const PNG_COMPRESSION_LEVEL: &str = "3";

/// Which external binary a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub tool: Tool,
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub working_dir: Option<PathBuf>,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(tool: Tool, binary_path: S1, description: S2) -> Self {
        Self {
            tool,
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            working_dir: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a flag and its value only when the value is present
    pub fn arg_opt<S: Into<String>>(self, flag: &str, value: Option<S>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path_arg(path))
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path_arg(path))
    }

    /// Run the tool from a specific directory
    pub fn in_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy all streams
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Loop the next input; negative counts loop forever
    pub fn stream_loop(self, times: i64) -> Self {
        self.arg("-stream_loop").arg(times.to_string())
    }

    /// Render the command's arguments as one string, quoting where needed
    pub fn command_line(&self) -> String {
        self.args
            .iter()
            .map(|arg| quote_arg(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_arg(&self.binary_path), self.command_line())
    }
}

/// Convert a path into a command argument
pub fn path_arg<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().to_string()
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '$' | '`'))
}

/// Wrap an argument in double quotes if it contains whitespace or shell metacharacters
pub fn quote_arg(arg: &str) -> String {
    if needs_quoting(arg) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// Format a decimal with `.` as separator using the shortest exact representation
pub fn format_decimal(value: f64) -> String {
    // Rust float formatting ignores locale
    format!("{}", value)
}

/// Format a decimal with a fixed number of fractional digits
pub fn format_fixed(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_with_whitespace_are_quoted() {
        let cmd = MediaCommand::new(Tool::Ffmpeg, "ffmpeg", "test")
            .input("/videos/my clip.mp4")
            .output("/out/plain.mp4");
        assert_eq!(cmd.command_line(), "-i \"/videos/my clip.mp4\" /out/plain.mp4");
    }

    #[test]
    fn test_quoting_is_consistent() {
        assert_eq!(quote_arg("/a/b.mp4"), "/a/b.mp4");
        assert_eq!(quote_arg("a\tb"), "\"a\tb\"");
        assert_eq!(quote_arg("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_arg("select=eq(n\\,5)"), "\"select=eq(n\\,5)\"");
        assert_eq!(quote_arg(""), "\"\"");
    }

    #[test]
    fn test_decimals_use_dot_separator() {
        assert_eq!(format_decimal(29.97), "29.97");
        assert_eq!(format_decimal(60.0), "60");
        assert_eq!(format_fixed(0.5, 4), "0.5000");
        assert_eq!(format_fixed(1.0 / 3.0, 4), "0.3333");
    }

    #[test]
    fn test_arg_opt_omits_whole_pair() {
        let without = MediaCommand::new(Tool::Ffmpeg, "ffmpeg", "t").arg_opt::<String>("-b:a", None);
        assert!(without.args.is_empty());

        let with = MediaCommand::new(Tool::Ffmpeg, "ffmpeg", "t").arg_opt("-b:a", Some("128k"));
        assert_eq!(with.args, vec!["-b:a", "128k"]);
    }

    #[test]
    fn test_display_includes_binary() {
        let cmd = MediaCommand::new(Tool::Ffprobe, "/opt/ff tools/ffprobe", "probe").arg("-v").arg("panic");
        assert_eq!(cmd.to_string(), "\"/opt/ff tools/ffprobe\" -v panic");
    }
}
