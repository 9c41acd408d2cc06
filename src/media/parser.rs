//! Scrapes scalar facts out of ffmpeg/ffprobe console output.
//!
//! Every function here returns `None` when the fact cannot be found. Garbled
//! or truncated output is treated the same as missing output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static DECODE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frame=\s*(\d+)\s*fps").expect("valid regex"));
static FPS_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(k?)\s*fps$").expect("valid regex"));
static CSV_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)x(\d+)").expect("valid regex"));
static SEXAGESIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").expect("valid regex"));

/// Markers ffmpeg prints when it failed even if the exit status says otherwise
const ERROR_MARKERS: &[&str] = &["error", "invalid data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.split(['\n', '\r']).map(str::trim).filter(|line| !line.is_empty())
}

fn value_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    Some(line[start..].trim())
}

/// Frame count from `-show_entries stream=nb_frames` output
pub fn parse_frame_count_metadata(output: &str) -> Option<u64> {
    let line = lines(output).find(|line| line.contains("nb_frames="))?;
    value_after(line, "nb_frames=")?
        .parse::<u64>()
        .ok()
        .filter(|&frames| frames > 0)
}

/// Frame count from `-count_frames ... nokey=1` output, which is just the number
pub fn parse_frame_count_counted(output: &str) -> Option<u64> {
    lines(output)
        .find_map(|line| line.parse::<u64>().ok())
        .filter(|&frames| frames > 0)
}

/// Highest `frame=` progress value printed while decoding the whole stream
pub fn parse_frame_count_decode(output: &str) -> Option<u64> {
    DECODE_PROGRESS
        .captures_iter(output)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .filter(|&frames| frames > 0)
}

/// Frame rate from the stream description that `ffmpeg -i` prints
pub fn parse_framerate(output: &str) -> Option<f64> {
    lines(output)
        // A filename containing "fps" would otherwise match on the input line
        .filter(|line| !line.starts_with("Input #"))
        .flat_map(|line| line.split(','))
        .find_map(|fragment| {
            let caps = FPS_FRAGMENT.captures(fragment.trim())?;
            let value = caps[1].parse::<f64>().ok()?;
            // ffmpeg abbreviates rates of 1000 and above, e.g. `1k fps`
            Some(if &caps[2] == "k" { value * 1000.0 } else { value })
        })
        .filter(|fps| fps.is_finite() && *fps > 0.0)
}

/// Pixel dimensions from `stream=width,height` output, csv (`1920x1080`) or key-value form
pub fn parse_size(output: &str) -> Option<Resolution> {
    let from_csv = lines(output).next().and_then(|line| {
        let caps = CSV_SIZE.captures(line)?;
        Some(Resolution {
            width: caps[1].parse().ok()?,
            height: caps[2].parse().ok()?,
        })
    });

    let size = from_csv.or_else(|| {
        let width = lines(output).find_map(|line| value_after(line, "width="))?;
        let height = lines(output).find_map(|line| value_after(line, "height="))?;
        Some(Resolution {
            width: width.parse().ok()?,
            height: height.parse().ok()?,
        })
    })?;

    (size.width > 0 && size.height > 0).then_some(size)
}

/// Audio codec name from `stream=codec_name` output
pub fn parse_audio_codec(output: &str) -> Option<String> {
    let line = lines(output).find(|line| line.contains("codec_name="))?;
    let codec = value_after(line, "codec_name=")?;
    (!codec.is_empty()).then(|| codec.to_string())
}

/// Duration in milliseconds from `-sexagesimal` (`0:01:02.500000`) or plain seconds output
pub fn parse_duration_ms(output: &str) -> Option<u64> {
    let value = lines(output).next()?;

    let seconds = match SEXAGESIMAL.captures(value) {
        Some(caps) => {
            let hours: f64 = caps[1].parse().ok()?;
            let minutes: f64 = caps[2].parse().ok()?;
            let secs: f64 = caps[3].parse().ok()?;
            hours * 3600.0 + minutes * 60.0 + secs
        }
        None => value.parse::<f64>().ok()?,
    };

    (seconds.is_finite() && seconds >= 0.0).then(|| (seconds * 1000.0).round() as u64)
}

/// Whether tool output mentions a known failure marker
pub fn reports_error(output: &str) -> bool {
    lines(output)
        // Stream headers echo file names, which may contain a marker
        .filter(|line| !line.starts_with("Input #") && !line.starts_with("Output #"))
        .map(str::to_lowercase)
        .any(|line| ERROR_MARKERS.iter().any(|marker| line.contains(marker)))
}
