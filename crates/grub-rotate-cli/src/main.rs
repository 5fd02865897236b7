//! grub-rotate - rotating GRUB boot themes from the command line
//!
//! Thin front end over grub-rotate-core: argument parsing, a privilege
//! pre-flight warning, and result rendering. All business logic lives in the
//! core crate.

use anyhow::Result;
use clap::{Parser, Subcommand};

use grub_rotate_core::{is_root, Operation, Settings, ThemeManager};

/// Manage and rotate GRUB boot themes
#[derive(Parser)]
#[command(name = "grub-rotate", version)]
#[command(about = "Manage and rotate GRUB boot themes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an installed theme to the rotation playlist
    Add { name: String },

    /// Remove a theme from the rotation playlist
    Remove { name: String },

    /// List playlist themes, or every installed theme with --all
    List {
        /// Show every installed theme, not just the playlist
        #[arg(short, long)]
        all: bool,
    },

    /// Show the currently active theme
    Current,

    /// Install a theme from an archive, directory, or URL
    Install {
        /// Path to an archive or theme directory, or an http(s) URL
        source: String,

        /// Install under this name instead of one derived from the source
        #[arg(short, long)]
        name: Option<String>,

        /// Do not add the new theme to the playlist
        #[arg(long)]
        no_add: bool,

        /// Activate the theme right after installing
        #[arg(long)]
        set_current: bool,
    },

    /// Make a theme the active one
    Set { name: String },

    /// Activate a random theme from the playlist
    Random,

    /// Delete an installed theme from disk
    Uninstall { name: String },

    /// Print the bootloader configuration file
    Config,
}

impl Commands {
    fn operation(&self) -> Operation {
        match self {
            Commands::Add { .. } => Operation::AddToPlaylist,
            Commands::Remove { .. } => Operation::RemoveFromPlaylist,
            Commands::List { all: false } => Operation::ListPlaylist,
            Commands::List { all: true } => Operation::ListAllThemes,
            Commands::Current | Commands::Config => Operation::CurrentTheme,
            Commands::Install { .. } => Operation::Install,
            Commands::Set { .. } => Operation::SetCurrent,
            Commands::Random => Operation::ActivateRandom,
            Commands::Uninstall { .. } => Operation::Uninstall,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // pre-flight so the user gets "run with sudo" instead of a half-finished
    // operation failing on the first privileged write
    let op = cli.command.operation();
    if op.requires_root() && !is_root() {
        anyhow::bail!("'{}' needs root privileges, re-run with sudo", op.name());
    }

    let mut manager = ThemeManager::new(Settings::default());
    tracing::debug!(
        "themes_dir={}, playlist={}",
        manager.settings().themes_dir.display(),
        manager.settings().playlist_path.display()
    );

    match cli.command {
        Commands::Add { name } => {
            manager.add_to_playlist(&name)?;
            println!("added '{name}' to the playlist");
        }
        Commands::Remove { name } => {
            manager.remove_from_playlist(&name)?;
            println!("removed '{name}' from the playlist");
        }
        Commands::List { all } => {
            let current = manager.current_theme().map(|t| t.name);
            if all {
                let themes = manager.list_all_themes();
                if themes.is_empty() {
                    println!("no themes installed in {}", manager.settings().themes_dir.display());
                    return Ok(());
                }
                println!("installed themes ({}):", themes.len());
                for theme in themes {
                    let active = if current.as_deref() == Some(theme.name.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    let listed = if manager.list_playlist().contains(&theme.name) {
                        "+"
                    } else {
                        " "
                    };
                    println!("{active}{listed} {}", theme.name);
                }
            } else {
                let playlist = manager.list_playlist();
                if playlist.is_empty() {
                    println!("playlist is empty; use 'grub-rotate add <theme>' to fill it");
                    return Ok(());
                }
                println!("playlist ({} themes):", playlist.len());
                for (index, name) in playlist.iter().enumerate() {
                    let marker = if current.as_deref() == Some(name.as_str()) {
                        "*".to_string()
                    } else {
                        format!("{}.", index + 1)
                    };
                    println!("{marker:>3} {name}");
                }
            }
        }
        Commands::Current => match manager.current_theme() {
            Some(theme) => {
                println!("{}", theme.name);
                println!("  path: {}", theme.path.display());
                let listed = manager.list_playlist().contains(&theme.name);
                println!("  in playlist: {}", if listed { "yes" } else { "no" });
            }
            None => println!("no theme currently set"),
        },
        Commands::Install {
            source,
            name,
            no_add,
            set_current,
        } => {
            println!("installing from {source}");
            let theme = manager.install(&source, name.as_deref(), !no_add).await?;
            println!("installed '{}'", theme.name);
            if !no_add {
                println!("added '{}' to the playlist", theme.name);
            }
            if set_current {
                manager.set_current(&theme.name)?;
                println!("activated '{}'", theme.name);
            }
        }
        Commands::Set { name } => {
            let theme = manager.set_current(&name)?;
            println!("activated '{}'", theme.name);
        }
        Commands::Random => {
            let theme = manager.activate_random()?;
            println!("switched to '{}'", theme.name);
        }
        Commands::Uninstall { name } => {
            manager.uninstall(&name)?;
            println!("uninstalled '{name}'");
        }
        Commands::Config => {
            print!("{}", manager.grub_config_contents()?);
        }
    }

    Ok(())
}
