use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while listing playable media.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("media folder '{}' not found", .0.display())]
    FolderMissing(PathBuf),
    #[error("cannot read media folder '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while handing a video to the media player.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("media file '{}' does not exist", .0.display())]
    MissingMedia(PathBuf),
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("background audio unavailable: {0}")]
    Audio(String),
}

/// The wall clock could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("clock unavailable: {0}")]
pub struct ClockError(pub String);

/// Failures while loading, validating or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write config '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_names_the_folder() {
        let err = CatalogError::FolderMissing(PathBuf::from("/nope/videos"));
        assert_eq!(err.to_string(), "media folder '/nope/videos' not found");
    }

    #[test]
    fn spawn_error_keeps_source() {
        let err = PlayerError::Spawn {
            command: "mpv".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("failed to launch 'mpv'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
