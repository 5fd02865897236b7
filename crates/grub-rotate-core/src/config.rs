//! Runtime settings for the theme engine
//!
//! Every component takes its paths and policies from an explicit [`Settings`]
//! value handed in at construction, so tests can point the engine at
//! temporary directories instead of the real system paths.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{grub, http, APP_DIR_NAME};

/// What to do when installing over an existing theme of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Refuse with `AlreadyInstalled`
    #[default]
    Fail,
    /// Replace the existing theme directory once the new content validated
    Replace,
}

/// What to do when no boot-menu regeneration tool can be found on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingToolPolicy {
    /// Fail with `Regeneration`
    #[default]
    Error,
    /// Update the config and leave menu regeneration to the user
    Skip,
}

/// Paths and policies threaded through the store, playlist, installer, and
/// activator.
#[derive(Debug, Clone)]
pub struct Settings {
    /// System directory holding installed themes
    pub themes_dir: PathBuf,
    /// Bootloader default-entry configuration (the `GRUB_THEME=` line lives here)
    pub grub_default_path: PathBuf,
    /// Playlist state file
    pub playlist_path: PathBuf,
    /// Explicit regeneration command; autodetected per distro when `None`
    pub regen_command: Option<Vec<String>>,
    pub overwrite_policy: OverwritePolicy,
    pub missing_tool_policy: MissingToolPolicy,
    /// Upper bound on remote theme downloads
    pub download_timeout: Duration,
    /// Gate mutating operations behind an effective-uid check. Disabled by
    /// tests running against temporary directories.
    pub enforce_privileges: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            themes_dir: PathBuf::from(grub::THEMES_DIR),
            grub_default_path: PathBuf::from(grub::DEFAULT_CONFIG),
            playlist_path: default_playlist_path(),
            regen_command: None,
            overwrite_policy: OverwritePolicy::default(),
            missing_tool_policy: MissingToolPolicy::default(),
            download_timeout: http::DOWNLOAD_TIMEOUT,
            enforce_privileges: true,
        }
    }
}

/// Playlist path under the invoking user's config directory.
///
/// Mutating commands run under sudo, which would otherwise resolve to
/// `/root/.config`; the original user's home (via `SUDO_USER`) is preferred
/// so the playlist survives between sudo and plain invocations.
pub fn default_playlist_path() -> PathBuf {
    if let Ok(user) = std::env::var("SUDO_USER") {
        let home = PathBuf::from(format!("/home/{user}"));
        if home.is_dir() {
            return home
                .join(".config")
                .join(APP_DIR_NAME)
                .join(grub::PLAYLIST_FILE);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(grub::PLAYLIST_FILE)
}

/// True when running with an effective uid of 0.
pub fn is_root() -> bool {
    // SAFETY: geteuid cannot fail
    unsafe { libc::geteuid() == 0 }
}
