//! grub-rotate core - theme management and activation engine
//!
//! This crate provides everything behind the grub-rotate CLI:
//! - On-disk theme inventory and structural validation
//! - Ordered rotation playlist with atomic persistence
//! - Install pipeline for local archives, directories, and URLs
//! - GRUB config rewriting and boot-menu regeneration

pub mod activator;
pub mod config;
pub mod constants;
pub mod error;
pub mod installer;
pub mod manager;
pub mod playlist;
pub mod store;

// Re-exports for convenience
pub use activator::Activator;
pub use config::{is_root, MissingToolPolicy, OverwritePolicy, Settings};
pub use error::{Result, ThemeError};
pub use installer::{InstallSource, Installer};
pub use manager::{Operation, ThemeManager};
pub use playlist::Playlist;
pub use store::{Theme, ThemeStore};
