//! Applies a theme as the one GRUB boots with
//!
//! Activation rewrites only the `GRUB_THEME=` line of the bootloader's
//! default-entry config, preserving every other line verbatim, persists the
//! file atomically, then invokes the distro's boot-menu regeneration tool.
//! "Current theme" is always derived from that config, never stored
//! separately, so it cannot drift from what GRUB will actually render.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::{MissingToolPolicy, Settings};
use crate::constants::grub;
use crate::error::{Result, ThemeError};
use crate::playlist::Playlist;
use crate::store::{Theme, ThemeStore};

/// Activation engine over the bootloader config
pub struct Activator<'a> {
    settings: &'a Settings,
    store: &'a ThemeStore,
}

impl<'a> Activator<'a> {
    pub fn new(settings: &'a Settings, store: &'a ThemeStore) -> Self {
        Self { settings, store }
    }

    /// Make `name` the active theme.
    ///
    /// On a `Regeneration` error the config file has already been rewritten;
    /// config and menu disagree until the regeneration tool is re-run, which
    /// the error message spells out.
    pub fn set_current(&self, name: &str) -> Result<Theme> {
        let theme = self
            .store
            .get(name)
            .ok_or_else(|| ThemeError::UnknownTheme(name.to_string()))?;

        let config_path = &self.settings.grub_default_path;
        let config_err = |source: io::Error| ThemeError::ConfigWrite {
            path: config_path.clone(),
            source,
        };

        let content = fs::read_to_string(config_path).map_err(config_err)?;
        let updated = rewrite_theme_line(&content, &theme.descriptor());

        let tmp = config_path.with_extension("tmp");
        fs::write(&tmp, updated).map_err(config_err)?;
        fs::rename(&tmp, config_path).map_err(config_err)?;
        info!("set GRUB theme to '{}' in {}", theme.name, config_path.display());

        self.regenerate_menu()?;
        Ok(theme)
    }

    /// Pick a random playlist member and activate it.
    pub fn activate_random(&self, playlist: &Playlist) -> Result<Theme> {
        let current = self.current_theme().map(|t| t.name);
        let pick = playlist.pick_random(current.as_deref())?;
        self.set_current(&pick)
    }

    /// Theme currently referenced by the bootloader config, if it still
    /// resolves to a store entry. `None` is not an error.
    pub fn current_theme(&self) -> Option<Theme> {
        let content = fs::read_to_string(&self.settings.grub_default_path).ok()?;
        let descriptor = parse_theme_path(&content)?;
        let name = self.theme_name_from_descriptor(&descriptor)?;
        self.store.get(&name)
    }

    /// Map ".../themes/<name>/theme.txt" back to the theme name.
    fn theme_name_from_descriptor(&self, descriptor: &Path) -> Option<String> {
        let rel = descriptor.strip_prefix(self.store.root()).ok()?;
        rel.components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
    }

    /// Run the boot-menu regeneration tool, synchronously. Its exit code is
    /// the sole success signal.
    fn regenerate_menu(&self) -> Result<()> {
        let command = match self.resolve_regen_command() {
            Some(cmd) => cmd,
            None => match self.settings.missing_tool_policy {
                MissingToolPolicy::Skip => {
                    warn!("no boot-menu regeneration tool found, skipping");
                    return Ok(());
                }
                MissingToolPolicy::Error => {
                    return Err(ThemeError::Regeneration(
                        "no regeneration tool found (tried update-grub, grub-mkconfig, \
                         grub2-mkconfig); the config was updated, run your distro's \
                         grub-mkconfig manually"
                            .into(),
                    ));
                }
            },
        };

        info!("regenerating boot menu: {}", command.join(" "));
        let output = Command::new(&command[0])
            .args(&command[1..])
            .output()
            .map_err(|err| {
                ThemeError::Regeneration(format!(
                    "{} failed to start: {err}; the config was updated, re-run it manually",
                    command[0]
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ThemeError::Regeneration(format!(
                "{} exited with {}: {}; the config was updated, re-run it manually",
                command[0],
                output.status,
                stderr.trim()
            )));
        }
        debug!("boot menu regenerated");
        Ok(())
    }

    /// An explicit command from settings wins; otherwise the first distro
    /// candidate present on PATH is used.
    fn resolve_regen_command(&self) -> Option<Vec<String>> {
        if let Some(cmd) = &self.settings.regen_command {
            return (!cmd.is_empty()).then(|| cmd.clone());
        }
        regen_candidates()
            .into_iter()
            .find(|candidate| which::which(&candidate[0]).is_ok())
    }
}

/// Rewrite only the active-theme line, preserving all others. Appends the
/// line when the key is absent.
fn rewrite_theme_line(content: &str, descriptor: &Path) -> String {
    let theme_line = format!("{}=\"{}\"", grub::THEME_KEY, descriptor.display());
    let mut out = String::with_capacity(content.len() + theme_line.len() + 1);
    let mut replaced = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if !replaced && is_theme_line(trimmed) {
            out.push_str(&theme_line);
            replaced = true;
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !replaced {
        out.push_str(&theme_line);
        out.push('\n');
    }
    out
}

fn is_theme_line(trimmed: &str) -> bool {
    trimmed.starts_with(grub::THEME_KEY)
        && trimmed.as_bytes().get(grub::THEME_KEY.len()) == Some(&b'=')
}

/// Active theme descriptor path from the config, quotes stripped.
fn parse_theme_path(content: &str) -> Option<PathBuf> {
    for line in content.lines() {
        let trimmed = line.trim();
        if !is_theme_line(trimmed) {
            continue;
        }
        let value = trimmed[grub::THEME_KEY.len() + 1..]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'');
        if !value.is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    None
}

/// Candidate regeneration commands, the detected distro's first.
///
/// Recognized families: debian (update-grub), fedora/suse (grub2-mkconfig),
/// arch (grub-mkconfig). Unknown systems just walk the fallback list.
fn regen_candidates() -> Vec<Vec<String>> {
    let to_cmd = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let debian = to_cmd(&["update-grub"]);
    let arch = to_cmd(&["grub-mkconfig", "-o", "/boot/grub/grub.cfg"]);
    let fedora = to_cmd(&["grub2-mkconfig", "-o", "/boot/grub2/grub.cfg"]);

    let mut candidates: Vec<Vec<String>> = Vec::new();
    match detect_distro_family().as_deref() {
        Some("debian") => candidates.push(debian.clone()),
        Some("fedora") | Some("suse") => candidates.push(fedora.clone()),
        Some("arch") => candidates.push(arch.clone()),
        _ => {}
    }
    for fallback in [debian, arch, fedora] {
        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
    }
    candidates
}

/// Distro family from /etc/os-release, used only to order the candidates.
fn detect_distro_family() -> Option<String> {
    let content = fs::read_to_string("/etc/os-release").ok()?.to_lowercase();
    let family = if content.contains("debian") || content.contains("ubuntu") {
        "debian"
    } else if content.contains("fedora") || content.contains("rhel") || content.contains("centos") {
        "fedora"
    } else if content.contains("suse") {
        "suse"
    } else if content.contains("arch") {
        "arch"
    } else {
        return None;
    };
    Some(family.to_string())
}
