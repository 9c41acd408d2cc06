use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramekitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("{description} failed: {detail}")]
    Subprocess { description: String, detail: String },

    #[error("No sample file matching {pattern} found in {dir}")]
    NoSampleFile { dir: String, pattern: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, FramekitError>;
