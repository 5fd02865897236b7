//! On-disk inventory of installed GRUB themes
//!
//! A subdirectory of the themes directory is a theme iff it carries a
//! recognized descriptor file. Everything else (including the installer's
//! dot-prefixed staging directories) is invisible to the store.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, ThemeError};

/// Descriptor file names a theme directory may carry. GRUB itself only reads
/// `theme.txt`, but themes in the wild ship case variants.
const DESCRIPTOR_NAMES: [&str; 4] = ["theme.txt", "Theme.txt", "THEME.TXT", "theme.conf"];

/// One installed theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Unique within the store; derived from the directory name
    pub name: String,
    /// Absolute location under the themes directory
    pub path: PathBuf,
    pub installed_at: Option<DateTime<Utc>>,
}

impl Theme {
    /// Path to the descriptor GRUB loads at boot
    pub fn descriptor(&self) -> PathBuf {
        self.path.join("theme.txt")
    }
}

/// Filesystem accessor for the system themes directory
pub struct ThemeStore {
    root: PathBuf,
}

impl ThemeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `dir` contains a recognized theme descriptor
    pub fn is_valid_theme_dir(dir: &Path) -> bool {
        dir.is_dir() && DESCRIPTOR_NAMES.iter().any(|f| dir.join(f).is_file())
    }

    /// All valid themes, sorted by name. Invalid and hidden entries are
    /// skipped rather than reported.
    pub fn list_all(&self) -> Vec<Theme> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot read themes directory {}: {err}", self.root.display());
                return Vec::new();
            }
        };

        let mut themes = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if !Self::is_valid_theme_dir(&path) {
                debug!("skipping {}: no theme descriptor", path.display());
                continue;
            }
            themes.push(Theme {
                name,
                installed_at: install_time(&path),
                path,
            });
        }
        themes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        themes
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::is_valid_theme_dir(&self.root.join(name))
    }

    pub fn get(&self, name: &str) -> Option<Theme> {
        let path = self.root.join(name);
        Self::is_valid_theme_dir(&path).then(|| Theme {
            name: name.to_string(),
            installed_at: install_time(&path),
            path,
        })
    }

    /// Delete a theme's directory tree. The caller is responsible for pruning
    /// the playlist afterwards.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.root.join(name);
        if !path.is_dir() {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&path).map_err(|err| ThemeError::PermissionDenied {
            operation: format!("remove theme '{name}': {err}"),
        })?;
        debug!("removed theme directory {}", path.display());
        Ok(())
    }

    /// Validate a freshly placed directory and return its record.
    pub fn register(&self, path: &Path) -> Result<Theme> {
        if !Self::is_valid_theme_dir(path) {
            return Err(ThemeError::InvalidTheme {
                path: path.to_path_buf(),
                reason: "missing theme descriptor (theme.txt)".into(),
            });
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| ThemeError::InvalidTheme {
                path: path.to_path_buf(),
                reason: "directory has no usable name".into(),
            })?;
        Ok(Theme {
            name,
            installed_at: install_time(path),
            path: path.to_path_buf(),
        })
    }
}

fn install_time(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .ok()
        .map(DateTime::<Utc>::from)
}
