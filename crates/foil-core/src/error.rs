//! Error types for Foil

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Foil operations
#[derive(Error, Debug)]
pub enum FoilError {
    #[error("Config file does not exist: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("No config file path was provided")]
    NoPathProvided,

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Config path is a directory: {}", .path.display())]
    PathIsDirectory { path: PathBuf },

    #[error("Parent directory does not exist: {}", .path.display())]
    MissingParentDirectory { path: PathBuf },

    #[error("File already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Section [{section}] holds inherited defaults and cannot be written")]
    ReservedSection { section: String },

    #[error("Config entry not found: {section}:{option}")]
    KeyNotFound { section: String, option: String },

    #[error("Cannot connect, no {field} set")]
    IncompleteDescriptor { field: &'static str },

    #[error("Invalid {field}: {reason}")]
    InvalidDescriptor { field: &'static str, reason: String },

    #[error("Already connected, disconnect first")]
    AlreadyConnected,

    #[error("SSH tunnel error: {0}")]
    Tunnel(String),

    #[error("Database at {address}:{port} did not respond within {timeout_ms}ms: {message}")]
    DriverTimeout {
        address: String,
        port: u16,
        timeout_ms: u64,
        message: String,
    },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discriminant of [`FoilError`] for callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NoPathProvided,
    ParseError,
    PathIsDirectory,
    MissingParentDirectory,
    AlreadyExists,
    ReservedSection,
    KeyNotFound,
    IncompleteDescriptor,
    InvalidDescriptor,
    AlreadyConnected,
    TunnelError,
    DriverTimeout,
    DriverError,
    IoError,
}

impl FoilError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FoilError::NotFound { .. } => ErrorKind::NotFound,
            FoilError::NoPathProvided => ErrorKind::NoPathProvided,
            FoilError::Parse { .. } => ErrorKind::ParseError,
            FoilError::PathIsDirectory { .. } => ErrorKind::PathIsDirectory,
            FoilError::MissingParentDirectory { .. } => ErrorKind::MissingParentDirectory,
            FoilError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FoilError::ReservedSection { .. } => ErrorKind::ReservedSection,
            FoilError::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            FoilError::IncompleteDescriptor { .. } => ErrorKind::IncompleteDescriptor,
            FoilError::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
            FoilError::AlreadyConnected => ErrorKind::AlreadyConnected,
            FoilError::Tunnel(_) => ErrorKind::TunnelError,
            FoilError::DriverTimeout { .. } => ErrorKind::DriverTimeout,
            FoilError::Driver(_) => ErrorKind::DriverError,
            FoilError::Io { .. } => ErrorKind::IoError,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FoilError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Foil operations
pub type Result<T> = std::result::Result<T, FoilError>;
