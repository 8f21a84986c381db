use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Resource errors
    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    #[error("Unknown beacon status: {0}")]
    UnknownBeaconStatus(u8),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
