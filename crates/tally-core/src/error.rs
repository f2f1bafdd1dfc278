//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Table extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid category config: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Stable machine-readable kind string, used in per-document outcome
    /// reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Config(_) => "config",
            Self::Toml(_) => "config",
            // Everything that can go wrong while pulling tables out of a
            // document counts as an extraction failure for that document.
            Self::Extraction(_) | Self::Csv(_) | Self::Io(_) => "extraction",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
