use crate::error::CatalogError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Video extensions accepted by default.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// A playable video: display name plus the path handed to the player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaItem {
    pub name: String,
    pub locator: PathBuf,
}

impl MediaItem {
    pub fn new(name: impl Into<String>, locator: impl Into<PathBuf>) -> Self {
        MediaItem {
            name: name.into(),
            locator: locator.into(),
        }
    }

    /// Name the item after the file name of `path`.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        MediaItem {
            name,
            locator: path.to_path_buf(),
        }
    }
}

/// Anything that can list the videos available for scheduling.
pub trait MediaCatalog: Send {
    fn load(&self) -> Result<Vec<MediaItem>, CatalogError>;
}

/// Lists the videos sitting directly inside one folder.
#[derive(Debug, Clone)]
pub struct FolderCatalog {
    folder: PathBuf,
    extensions: Vec<String>,
}

impl FolderCatalog {
    pub fn new(folder: impl Into<PathBuf>, extensions: &[String]) -> Self {
        FolderCatalog {
            folder: folder.into(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    pub fn with_default_extensions(folder: impl Into<PathBuf>) -> Self {
        let exts: Vec<String> = VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        Self::new(folder, &exts)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn accepts(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

impl MediaCatalog for FolderCatalog {
    fn load(&self) -> Result<Vec<MediaItem>, CatalogError> {
        if !self.folder.is_dir() {
            return Err(CatalogError::FolderMissing(self.folder.clone()));
        }
        let entries = std::fs::read_dir(&self.folder).map_err(|source| CatalogError::Unreadable {
            path: self.folder.clone(),
            source,
        })?;

        let mut items: Vec<MediaItem> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.accepts(path))
            .map(|path| MediaItem::from_path(&path))
            .collect();
        // read_dir order is platform-dependent
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

/// A fixed in-memory list of items.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub items: Vec<MediaItem>,
}

impl StaticCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        StaticCatalog { items }
    }
}

impl MediaCatalog for StaticCatalog {
    fn load(&self) -> Result<Vec<MediaItem>, CatalogError> {
        Ok(self.items.clone())
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
