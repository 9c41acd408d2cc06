//! Framekit - Media command adapter for frame interpolation
//!
//! Builds ffmpeg/ffprobe command lines for frame extraction, encoding,
//! looping, speed changes, audio and alpha handling, and scrapes frame
//! counts, frame rates, sizes, codecs and durations from their output.

pub mod cli;
pub mod config;
pub mod media;
pub mod error;
