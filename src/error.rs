use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("malformed layout at {}: {reason}", .path.display())]
    MalformedLayout { path: PathBuf, reason: String },
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("failed to traverse {}", .path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MigrateError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedLayout {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> MigrateErrorKind {
        match self {
            Self::InvalidArgument(_) => MigrateErrorKind::InvalidArgument,
            Self::MalformedLayout { .. } => MigrateErrorKind::MalformedLayout,
            Self::DestinationExists(_) => MigrateErrorKind::DestinationExists,
            Self::Traversal { .. } => MigrateErrorKind::Traversal,
            Self::Io { .. } => MigrateErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateErrorKind {
    InvalidArgument,
    MalformedLayout,
    DestinationExists,
    Traversal,
    Io,
}

impl MigrateErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "E_INVALID_ARGUMENT",
            Self::MalformedLayout => "E_MALFORMED_LAYOUT",
            Self::DestinationExists => "E_DESTINATION_EXISTS",
            Self::Traversal => "E_TRAVERSAL",
            Self::Io => "E_IO",
        }
    }
}
