//! Ordered rotation playlist persisted as a small JSON state file
//!
//! A missing or corrupt file is a valid initial state, never an error. Saves
//! go through a temp file and rename so a crash mid-write cannot clobber the
//! previous valid state.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{Result, ThemeError};
use crate::store::ThemeStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlaylistFile {
    #[serde(default)]
    playlist: Vec<String>,
}

/// Ordered, deduplicated list of theme names eligible for rotation
pub struct Playlist {
    path: PathBuf,
    entries: Vec<String>,
}

impl Playlist {
    /// Load persisted state. Missing or corrupt files yield an empty
    /// playlist.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<PlaylistFile>(&content) {
                Ok(state) => state.playlist,
                Err(err) => {
                    warn!("corrupt playlist file {}: {err}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        debug!("loaded {} playlist entries from {}", entries.len(), path.display());
        Self { path, entries }
    }

    /// Insertion-ordered view of the entries
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    /// Append if not already present. Returns whether the playlist changed;
    /// adding twice is a no-op.
    pub fn add(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.push(name.to_string());
        true
    }

    /// Remove if present; no-op when absent. Returns whether the playlist
    /// changed.
    pub fn remove_entry(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != name);
        self.entries.len() != before
    }

    /// Drop entries whose theme no longer exists in the store. Returns the
    /// number of entries dropped.
    pub fn prune(&mut self, store: &ThemeStore) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name| store.exists(name));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            info!("pruned {dropped} playlist entries for removed themes");
        }
        dropped
    }

    /// Uniform random pick. When more than one entry exists the current
    /// theme is excluded, so a rotation always lands somewhere new.
    pub fn pick_random(&self, current: Option<&str>) -> Result<String> {
        if self.entries.is_empty() {
            return Err(ThemeError::EmptyPlaylist);
        }
        let candidates: Vec<&String> = match current {
            Some(cur) if self.entries.len() > 1 => {
                self.entries.iter().filter(|e| e.as_str() != cur).collect()
            }
            _ => self.entries.iter().collect(),
        };
        candidates
            .choose(&mut rand::thread_rng())
            .map(|s| (*s).clone())
            .ok_or(ThemeError::EmptyPlaylist)
    }

    /// Atomic persist: write to a temp file in the same directory, then
    /// rename over the previous state.
    pub fn save(&self) -> Result<()> {
        let write_err = |source: io::Error| ThemeError::ConfigWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let state = PlaylistFile {
            playlist: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&state).map_err(io::Error::other).map_err(write_err)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!("saved {} playlist entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn make_theme(root: &Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("theme.txt"), "x").unwrap();
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let playlist = Playlist::load(tmp.path().join("playlist.json"));
        assert!(playlist.entries().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("playlist.json");
        fs::write(&path, "{not json").unwrap();
        let playlist = Playlist::load(&path);
        assert!(playlist.entries().is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut playlist = Playlist::load(tmp.path().join("playlist.json"));
        assert!(playlist.add("alpha"));
        assert!(!playlist.add("alpha"));
        assert_eq!(playlist.entries(), ["alpha"]);
    }

    #[test]
    fn remove_entry_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut playlist = Playlist::load(tmp.path().join("playlist.json"));
        playlist.add("alpha");
        assert!(playlist.remove_entry("alpha"));
        assert!(!playlist.remove_entry("alpha"));
        assert!(playlist.entries().is_empty());
    }

    #[test]
    fn save_load_round_trips_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("playlist.json");
        let mut playlist = Playlist::load(&path);
        for name in ["charlie", "alpha", "bravo"] {
            playlist.add(name);
        }
        playlist.save().unwrap();

        let reloaded = Playlist::load(&path);
        assert_eq!(reloaded.entries(), ["charlie", "alpha", "bravo"]);

        // save -> load -> save is byte-stable
        reloaded.save().unwrap();
        let reloaded_again = Playlist::load(&path);
        assert_eq!(reloaded_again.entries(), reloaded.entries());
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deep/nested/playlist.json");
        let mut playlist = Playlist::load(&path);
        playlist.add("alpha");
        playlist.save().unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn pick_random_on_empty_fails() {
        let tmp = TempDir::new().unwrap();
        let playlist = Playlist::load(tmp.path().join("playlist.json"));
        assert!(matches!(
            playlist.pick_random(None),
            Err(ThemeError::EmptyPlaylist)
        ));
    }

    #[test]
    fn pick_random_returns_member() {
        let tmp = TempDir::new().unwrap();
        let mut playlist = Playlist::load(tmp.path().join("playlist.json"));
        playlist.add("alpha");
        playlist.add("bravo");
        for _ in 0..20 {
            let pick = playlist.pick_random(None).unwrap();
            assert!(playlist.contains(&pick));
        }
    }

    #[test]
    fn pick_random_avoids_current_when_possible() {
        let tmp = TempDir::new().unwrap();
        let mut playlist = Playlist::load(tmp.path().join("playlist.json"));
        playlist.add("alpha");
        playlist.add("bravo");
        for _ in 0..20 {
            assert_eq!(playlist.pick_random(Some("alpha")).unwrap(), "bravo");
        }
        // a single-entry playlist has nowhere else to go
        playlist.remove_entry("bravo");
        assert_eq!(playlist.pick_random(Some("alpha")).unwrap(), "alpha");
    }

    #[test]
    fn prune_drops_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let themes = tmp.path().join("themes");
        fs::create_dir_all(&themes).unwrap();
        make_theme(&themes, "alpha");
        let store = ThemeStore::new(&themes);

        let mut playlist = Playlist::load(tmp.path().join("playlist.json"));
        playlist.add("alpha");
        playlist.add("ghost");
        assert_eq!(playlist.prune(&store), 1);
        assert_eq!(playlist.entries(), ["alpha"]);
    }
}
