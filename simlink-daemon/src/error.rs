/*!
 * Error types
 * Profile operations never fail outward; these cover the edges around them
 */

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("address must have six octets: {0}")]
    WrongLength(String),
    #[error("invalid address octet: {0}")]
    InvalidOctet(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("binding channel is closed")]
    ChannelClosed,
    #[error("service is already bound")]
    AlreadyBound,
    #[error("service was not bound through this channel")]
    NotBound,
    #[error("failed to release service: {0}")]
    Release(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
