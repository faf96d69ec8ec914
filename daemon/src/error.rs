use filterpanel::display::DisplayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("failed to read config file {0}: {1}")]
    ConfigFileReadError(String, std::io::Error),
    #[error("failed to parse config file: {0}")]
    ConfigFileParsingError(toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to install signal handler: {0}")]
    SignalHandlerError(std::io::Error),
    #[error("display error: {0}")]
    DisplayError(#[from] DisplayError),
}
