use std::path::PathBuf;
use thiserror::Error;

/// Broad category of an export failure, for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Busy,
    Write,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress ({state})")]
    Busy { state: String },

    #[error("music library path is not set")]
    MusicLibraryPathUnset,

    #[error("library persistent ID is not set")]
    LibraryIdUnset,

    #[error("output directory is not set")]
    OutputDirectoryUnset,

    #[error("output directory {} does not exist", path.display())]
    OutputDirectoryMissing { path: PathBuf },

    #[error("output directory {} is not writable", path.display())]
    OutputDirectoryNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "path remapping is enabled but incomplete (original {search:?}, mapped {replacement:?})"
    )]
    InvalidRemapping { search: String, replacement: String },

    #[error("invalid output file name {name:?}")]
    InvalidOutputFileName { name: String },

    #[error("failed to write library to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize library for {}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Busy { .. } => ErrorKind::Busy,
            ExportError::MusicLibraryPathUnset
            | ExportError::LibraryIdUnset
            | ExportError::OutputDirectoryUnset
            | ExportError::OutputDirectoryMissing { .. }
            | ExportError::OutputDirectoryNotWritable { .. }
            | ExportError::InvalidRemapping { .. }
            | ExportError::InvalidOutputFileName { .. } => ErrorKind::Configuration,
            ExportError::Write { .. } | ExportError::Serialize { .. } => ErrorKind::Write,
        }
    }
}
