// Media command adapter
//
// This module wraps the external ffmpeg/ffprobe binaries:
// - Operation: tagged description of one tool invocation
// - Builder: turns operations into command lines
// - Runner: executes commands and returns their captured output
// - Parser: scrapes probe facts out of console output
// - Processor: runs operations and handles the file system around them

pub mod builder;
pub mod cleanup;
pub mod commands;
pub mod frames;
pub mod operation;
pub mod parser;
pub mod processor;
pub mod runner;

pub use builder::*;
pub use commands::{MediaCommand, Tool};
pub use operation::{AnimationFormat, Operation, ProbeKind};
pub use parser::Resolution;
pub use processor::*;
pub use runner::{CommandRunner, ProcessOutput, ProcessRunner};

use crate::config::MediaConfig;

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default processor, spawning the configured binaries
    pub fn create_processor(config: MediaConfig) -> MediaProcessor {
        MediaProcessor::new(config)
    }
}
