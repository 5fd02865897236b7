//! Error taxonomy for theme management operations
//!
//! Low-level filesystem and subprocess failures are wrapped into the nearest
//! variant here before crossing the crate boundary; callers never see a bare
//! `std::io::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, ThemeError>;

/// Everything that can go wrong while managing themes
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Named theme is not present in the theme store
    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    /// Theme directory to remove does not exist
    #[error("theme not found: {0}")]
    NotFound(String),

    /// A theme of this name is already installed
    #[error("theme already installed: {0} (re-run with overwrite enabled to replace it)")]
    AlreadyInstalled(String),

    /// Directory does not look like a GRUB theme
    #[error("invalid theme at {}: {reason}", .path.display())]
    InvalidTheme { path: PathBuf, reason: String },

    /// Install source is neither a URL, an archive, nor a directory
    #[error("unsupported install source: {0}")]
    UnsupportedSource(String),

    /// Remote fetch failed (network error, timeout, or non-success status)
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Archive could not be unpacked into staging
    #[error("extraction failed for {src}: {reason}")]
    Extraction { src: String, reason: String },

    /// Random activation asked of a playlist with zero entries
    #[error("playlist is empty")]
    EmptyPlaylist,

    /// Reading or atomically rewriting a persisted state file failed
    #[error("bootloader config {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The boot-menu regeneration tool failed or could not be found. The
    /// config file has already been updated when this is returned.
    #[error("boot menu regeneration failed: {0}")]
    Regeneration(String),

    /// Operation needs root (write access to system paths)
    #[error("insufficient privileges: {operation}")]
    PermissionDenied { operation: String },
}
