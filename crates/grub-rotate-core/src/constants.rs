//! Application constants and configuration defaults
//!
//! Centralized location for magic values and default system paths

use std::time::Duration;

/// Config directory name under the user's config dir
pub const APP_DIR_NAME: &str = "grub-rotate";

/// GRUB system paths and keys
pub mod grub {
    /// System directory GRUB loads themes from
    pub const THEMES_DIR: &str = "/usr/share/grub/themes";

    /// Default-entry configuration consumed by grub-mkconfig
    pub const DEFAULT_CONFIG: &str = "/etc/default/grub";

    /// Playlist state file name
    pub const PLAYLIST_FILE: &str = "playlist.json";

    /// Key controlling the active theme inside DEFAULT_CONFIG
    pub const THEME_KEY: &str = "GRUB_THEME";
}

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Upper bound on remote theme downloads
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

    /// User agent sent when fetching remote themes
    pub const USER_AGENT: &str = concat!("grub-rotate/", env!("CARGO_PKG_VERSION"));
}
