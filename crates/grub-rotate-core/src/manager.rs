//! Façade orchestrating the store, playlist, installer, and activator into
//! the operation surface the CLI (and any other front end) consumes.
//!
//! Privilege checks happen once here, before delegating, never inside the
//! components.

use std::fs;
use tracing::debug;

use crate::activator::Activator;
use crate::config::{is_root, Settings};
use crate::error::{Result, ThemeError};
use crate::installer::Installer;
use crate::playlist::Playlist;
use crate::store::{Theme, ThemeStore};

/// Operations exposed to front ends, for privilege pre-flight checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddToPlaylist,
    RemoveFromPlaylist,
    ListPlaylist,
    ListAllThemes,
    CurrentTheme,
    Install,
    Uninstall,
    SetCurrent,
    ActivateRandom,
}

impl Operation {
    /// Whether the operation mutates system state and therefore needs root.
    /// Playlist-only mutations touch a per-user file and do not.
    pub fn requires_root(self) -> bool {
        matches!(
            self,
            Self::Install | Self::Uninstall | Self::SetCurrent | Self::ActivateRandom
        )
    }

    /// User-facing command name
    pub fn name(self) -> &'static str {
        match self {
            Self::AddToPlaylist => "add",
            Self::RemoveFromPlaylist => "remove",
            Self::ListPlaylist => "list",
            Self::ListAllThemes => "list --all",
            Self::CurrentTheme => "current",
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::SetCurrent => "set",
            Self::ActivateRandom => "random",
        }
    }
}

/// Entry point for front ends
pub struct ThemeManager {
    settings: Settings,
    store: ThemeStore,
    playlist: Playlist,
}

impl ThemeManager {
    /// Load the manager. Playlist entries whose theme has been removed behind
    /// our back are pruned here.
    pub fn new(settings: Settings) -> Self {
        let store = ThemeStore::new(settings.themes_dir.clone());
        let mut playlist = Playlist::load(settings.playlist_path.clone());
        let dropped = playlist.prune(&store);
        if dropped > 0 {
            debug!("dropped {dropped} stale playlist entries on load");
        }
        Self {
            settings,
            store,
            playlist,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ThemeStore {
        &self.store
    }

    /// Fail fast before any work when the operation needs privileges we lack.
    fn preflight(&self, op: Operation) -> Result<()> {
        if self.settings.enforce_privileges && op.requires_root() && !is_root() {
            return Err(ThemeError::PermissionDenied {
                operation: format!("'{}' needs root, re-run with sudo", op.name()),
            });
        }
        Ok(())
    }

    /// Add an installed theme to the rotation playlist. Idempotent.
    pub fn add_to_playlist(&mut self, name: &str) -> Result<()> {
        self.preflight(Operation::AddToPlaylist)?;
        if !self.store.exists(name) {
            return Err(ThemeError::UnknownTheme(name.to_string()));
        }
        if self.playlist.add(name) {
            self.playlist.save()?;
        }
        Ok(())
    }

    /// Remove a theme from the rotation playlist. Idempotent.
    pub fn remove_from_playlist(&mut self, name: &str) -> Result<()> {
        self.preflight(Operation::RemoveFromPlaylist)?;
        if self.playlist.remove_entry(name) {
            self.playlist.save()?;
        }
        Ok(())
    }

    pub fn list_playlist(&self) -> &[String] {
        self.playlist.entries()
    }

    pub fn list_all_themes(&self) -> Vec<Theme> {
        self.store.list_all()
    }

    /// Derived from the bootloader config; `None` when unset or stale
    pub fn current_theme(&self) -> Option<Theme> {
        Activator::new(&self.settings, &self.store).current_theme()
    }

    /// Install from a path or URL. The new theme joins the playlist unless
    /// `add_to_playlist` is false.
    pub async fn install(
        &mut self,
        source: &str,
        name: Option<&str>,
        add_to_playlist: bool,
    ) -> Result<Theme> {
        self.preflight(Operation::Install)?;
        let theme = Installer::new(&self.settings, &self.store)
            .install(source, name)
            .await?;
        if add_to_playlist && self.playlist.add(&theme.name) {
            self.playlist.save()?;
        }
        Ok(theme)
    }

    /// Delete a theme from disk and prune it from the playlist.
    pub fn uninstall(&mut self, name: &str) -> Result<()> {
        self.preflight(Operation::Uninstall)?;
        self.store.remove(name)?;
        if self.playlist.remove_entry(name) {
            self.playlist.save()?;
        }
        Ok(())
    }

    pub fn set_current(&self, name: &str) -> Result<Theme> {
        self.preflight(Operation::SetCurrent)?;
        Activator::new(&self.settings, &self.store).set_current(name)
    }

    pub fn activate_random(&mut self) -> Result<Theme> {
        self.preflight(Operation::ActivateRandom)?;
        self.playlist.prune(&self.store);
        Activator::new(&self.settings, &self.store).activate_random(&self.playlist)
    }

    /// Raw contents of the bootloader config, for display
    pub fn grub_config_contents(&self) -> Result<String> {
        fs::read_to_string(&self.settings.grub_default_path).map_err(|source| {
            ThemeError::ConfigWrite {
                path: self.settings.grub_default_path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        settings: Settings,
        themes_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let themes_dir = tmp.path().join("themes");
        fs::create_dir_all(&themes_dir).unwrap();
        let grub_default = tmp.path().join("grub");
        fs::write(&grub_default, "GRUB_DEFAULT=0\n").unwrap();

        let settings = Settings {
            themes_dir: themes_dir.clone(),
            grub_default_path: grub_default,
            playlist_path: tmp.path().join("playlist.json"),
            regen_command: Some(vec!["true".into()]),
            enforce_privileges: false,
            ..Settings::default()
        };
        Fixture {
            _tmp: tmp,
            settings,
            themes_dir,
        }
    }

    fn make_theme(themes_dir: &Path, name: &str) {
        let dir = themes_dir.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("theme.txt"), "x").unwrap();
    }

    fn make_targz(dir: &Path, name: &str) -> PathBuf {
        let content = dir.join("src");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("theme.txt"), "x").unwrap();
        let path = dir.join(name);
        let file = fs::File::create(&path).unwrap();
        let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(enc);
        builder.append_dir_all(".", &content).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn requires_root_gates_mutating_operations_only() {
        for op in [
            Operation::Install,
            Operation::Uninstall,
            Operation::SetCurrent,
            Operation::ActivateRandom,
        ] {
            assert!(op.requires_root(), "{op:?}");
        }
        for op in [
            Operation::AddToPlaylist,
            Operation::RemoveFromPlaylist,
            Operation::ListPlaylist,
            Operation::ListAllThemes,
            Operation::CurrentTheme,
        ] {
            assert!(!op.requires_root(), "{op:?}");
        }
    }

    #[test]
    fn preflight_rejects_unprivileged_mutation() {
        if is_root() {
            // the check cannot trip under a root test runner
            return;
        }
        let mut fx = fixture();
        fx.settings.enforce_privileges = true;
        make_theme(&fx.themes_dir, "alpha");
        let manager = ThemeManager::new(fx.settings);
        assert!(matches!(
            manager.set_current("alpha"),
            Err(ThemeError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn add_unknown_theme_is_rejected() {
        let fx = fixture();
        let mut manager = ThemeManager::new(fx.settings);
        assert!(matches!(
            manager.add_to_playlist("ghost"),
            Err(ThemeError::UnknownTheme(_))
        ));
    }

    #[test]
    fn add_twice_equals_add_once() {
        let fx = fixture();
        make_theme(&fx.themes_dir, "alpha");
        let mut manager = ThemeManager::new(fx.settings);
        manager.add_to_playlist("alpha").unwrap();
        manager.add_to_playlist("alpha").unwrap();
        assert_eq!(manager.list_playlist(), ["alpha"]);
    }

    #[test]
    fn uninstall_prunes_playlist() {
        let fx = fixture();
        make_theme(&fx.themes_dir, "theme-x");
        make_theme(&fx.themes_dir, "theme-y");
        let playlist_path = fx.settings.playlist_path.clone();

        let mut manager = ThemeManager::new(fx.settings.clone());
        manager.add_to_playlist("theme-x").unwrap();
        manager.add_to_playlist("theme-y").unwrap();
        manager.uninstall("theme-x").unwrap();

        assert!(!manager.store().exists("theme-x"));
        assert_eq!(manager.list_playlist(), ["theme-y"]);

        // persisted, not just in memory
        let on_disk = fs::read_to_string(playlist_path).unwrap();
        assert!(!on_disk.contains("theme-x"));
    }

    #[test]
    fn stale_entries_are_pruned_on_load() {
        let fx = fixture();
        make_theme(&fx.themes_dir, "alpha");
        make_theme(&fx.themes_dir, "doomed");

        let mut manager = ThemeManager::new(fx.settings.clone());
        manager.add_to_playlist("alpha").unwrap();
        manager.add_to_playlist("doomed").unwrap();
        drop(manager);

        // theme removed behind the manager's back
        fs::remove_dir_all(fx.themes_dir.join("doomed")).unwrap();

        let manager = ThemeManager::new(fx.settings);
        assert_eq!(manager.list_playlist(), ["alpha"]);
    }

    #[tokio::test]
    async fn install_registers_theme_and_playlist_entry() {
        let fx = fixture();
        let archive = make_targz(fx._tmp.path(), "fresh.tar.gz");

        let mut manager = ThemeManager::new(fx.settings);
        let theme = manager
            .install(archive.to_str().unwrap(), None, true)
            .await
            .unwrap();
        assert_eq!(theme.name, "fresh");
        assert!(manager.store().exists("fresh"));
        assert_eq!(manager.list_playlist(), ["fresh"]);
    }

    #[tokio::test]
    async fn install_without_playlist_entry() {
        let fx = fixture();
        let archive = make_targz(fx._tmp.path(), "loner.tar.gz");

        let mut manager = ThemeManager::new(fx.settings);
        manager
            .install(archive.to_str().unwrap(), None, false)
            .await
            .unwrap();
        assert!(manager.store().exists("loner"));
        assert!(manager.list_playlist().is_empty());
    }

    #[test]
    fn set_current_and_current_theme_agree() {
        let fx = fixture();
        make_theme(&fx.themes_dir, "alpha");
        let manager = ThemeManager::new(fx.settings);

        assert!(manager.current_theme().is_none());
        manager.set_current("alpha").unwrap();
        assert_eq!(manager.current_theme().unwrap().name, "alpha");
    }

    #[test]
    fn activate_random_respects_playlist_invariant() {
        let fx = fixture();
        make_theme(&fx.themes_dir, "a");
        make_theme(&fx.themes_dir, "b");
        let mut manager = ThemeManager::new(fx.settings);
        manager.add_to_playlist("a").unwrap();
        manager.add_to_playlist("b").unwrap();

        let theme = manager.activate_random().unwrap();
        assert!(["a", "b"].contains(&theme.name.as_str()));
        assert_eq!(manager.current_theme().unwrap().name, theme.name);
    }
}
