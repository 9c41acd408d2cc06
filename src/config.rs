use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, FramekitError};

fn default_image_format() -> String {
    "png".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub encoding: EncodingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Encoder thread count passed as `-threads`; 0 leaves it to ffmpeg
    pub encode_threads: u32,
    /// Count frames by decoding the whole stream instead of reading
    /// the container's `nb_frames` field (slow but accurate)
    pub count_frames_slow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec used when the caller does not pick one
    pub codec: VideoCodec,
    /// Constant rate factor (0-51, lower = better quality)
    pub crf: u32,
    /// Image format of extracted and interpolated frames
    #[serde(default = "default_image_format")]
    pub image_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    /// H.264 via libx264
    H264,
    /// H.265 via libx265
    H265,
}

impl VideoCodec {
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                encode_threads: 0,
                count_frames_slow: false,
            },
            encoding: EncodingConfig {
                codec: VideoCodec::H264,
                crf: 18,
                image_format: default_image_format(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FramekitError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FramekitError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| FramekitError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("framekit.toml");

        let mut config = Config::default();
        config.media.encode_threads = 4;
        config.media.count_frames_slow = true;
        config.encoding.codec = VideoCodec::H265;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.media.encode_threads, 4);
        assert!(loaded.media.count_frames_slow);
        assert_eq!(loaded.encoding.codec, VideoCodec::H265);
        assert_eq!(loaded.encoding.image_format, "png");
    }

    #[test]
    fn test_image_format_defaults_when_missing() {
        let content = r#"
[media]
ffmpeg_path = "ffmpeg"
ffprobe_path = "ffprobe"
encode_threads = 2
count_frames_slow = false

[encoding]
codec = "H264"
crf = 20
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.encoding.image_format, "png");
        assert_eq!(config.encoding.crf, 20);
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let result = Config::from_file("/nonexistent/framekit.toml");
        assert!(matches!(result, Err(FramekitError::Config(_))));
    }

    #[test]
    fn test_malformed_config_is_toml_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("framekit.toml");
        std::fs::write(&path, "[media\nffmpeg_path = ").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(FramekitError::Toml(_))));
    }
}
