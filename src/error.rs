//! Per-subsystem error types. Hand-rolled `std::error::Error` impls, matching
//! the teacher's style rather than pulling in a proc-macro error crate.

use std::fmt;
use std::io;

/// Errors from the main IRC connection.
#[derive(Debug)]
pub enum ConnError {
    ConnectRefused(io::Error),
    ConnectFailed(io::Error),
    ConnectTimeout,
    ReadFail(io::Error),
    SendFail(io::Error),
    NotConnected,
}

impl fmt::Display for ConnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnError::ConnectRefused(e) => write!(f, "connection refused: {}", e),
            ConnError::ConnectFailed(e) => write!(f, "connect failed: {}", e),
            ConnError::ConnectTimeout => write!(f, "connection timed out"),
            ConnError::ReadFail(e) => write!(f, "read failed: {}", e),
            ConnError::SendFail(e) => write!(f, "send failed: {}", e),
            ConnError::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for ConnError {}

/// Errors from a DCC SEND receive.
#[derive(Debug)]
pub enum DccError {
    ConnectRefused(io::Error),
    ConnectTimeout,
    ReadStall,
    SizeMismatch { expected: u64, received: u64 },
    TransferError(io::Error),
}

impl fmt::Display for DccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DccError::ConnectRefused(e) => write!(f, "dcc connect refused: {}", e),
            DccError::ConnectTimeout => write!(f, "dcc connect timed out"),
            DccError::ReadStall => write!(f, "dcc read stalled for 30s"),
            DccError::SizeMismatch { expected, received } => write!(
                f,
                "dcc size mismatch: expected {} bytes, received {}",
                expected, received
            ),
            DccError::TransferError(e) => write!(f, "dcc transfer error: {}", e),
        }
    }
}

impl std::error::Error for DccError {}

impl From<io::Error> for DccError {
    fn from(e: io::Error) -> Self {
        DccError::TransferError(e)
    }
}

/// Errors a cog's `register` method can fail with. `AlreadyLoaded`/
/// `NotLoaded` are reported separately as `CogOutcome` variants (`src/cog.rs`)
/// since they're manager-level outcomes, not failures a cog itself raises.
#[derive(Debug)]
pub enum CogError {
    Activation(String),
}

impl fmt::Display for CogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CogError::Activation(msg) => write!(f, "cog activation failed: {}", msg),
        }
    }
}

impl std::error::Error for CogError {}

/// Errors loading/validating a `Config`.
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_yaml::Error),
    Invalid(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid(errs) => write!(f, "invalid config: {}", errs.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Errors reading/writing the credential store.
#[derive(Debug)]
pub enum CredentialError {
    Io(io::Error),
    UnsupportedVersion(u8),
    Truncated,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Io(e) => write!(f, "credential store io error: {}", e),
            CredentialError::UnsupportedVersion(v) => {
                write!(f, "unsupported credential store version {}", v)
            }
            CredentialError::Truncated => write!(f, "credential store file is truncated"),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<io::Error> for CredentialError {
    fn from(e: io::Error) -> Self {
        CredentialError::Io(e)
    }
}
