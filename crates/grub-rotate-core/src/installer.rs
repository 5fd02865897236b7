//! Installation pipeline: source resolution, staging extraction, validation,
//! atomic registration into the theme store.
//!
//! Nothing lands in the theme store until it has been extracted and validated
//! in a staging directory. Staging lives inside the themes directory itself
//! (dot-prefixed, invisible to the store) so the final move is an atomic
//! same-filesystem rename, and it is removed on every exit path.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

use crate::config::{OverwritePolicy, Settings};
use crate::constants::http;
use crate::error::{Result, ThemeError};
use crate::store::{Theme, ThemeStore};

/// Where a theme comes from. Resolved once per install, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Remote(Url),
    Archive(PathBuf),
    Directory(PathBuf),
}

impl InstallSource {
    /// Classify a raw source string. URL schemes win; otherwise the path must
    /// exist as a directory or a file.
    pub fn resolve(raw: &str) -> Result<Self> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw)
                .map_err(|err| ThemeError::UnsupportedSource(format!("{raw}: {err}")))?;
            return Ok(Self::Remote(url));
        }
        let path = PathBuf::from(raw);
        if path.is_dir() {
            return Ok(Self::Directory(path));
        }
        if path.is_file() {
            return Ok(Self::Archive(path));
        }
        Err(ThemeError::UnsupportedSource(format!(
            "{raw}: not a URL, archive, or directory"
        )))
    }

    /// Theme name implied by the source, with compound archive extensions
    /// stripped.
    pub fn derived_name(&self) -> Result<String> {
        let name = match self {
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(strip_archive_suffix)
                .map(str::to_owned),
            Self::Archive(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(strip_archive_suffix)
                .map(str::to_owned),
            Self::Directory(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned),
        };
        name.filter(|n| !n.is_empty())
            .ok_or_else(|| ThemeError::UnsupportedSource("cannot derive a theme name from source".into()))
    }
}

/// Strip `.tar.gz` and friends; plain `stem()` would leave `name.tar`.
fn strip_archive_suffix(file_name: &str) -> &str {
    for suffix in [".tar.gz", ".tar.xz", ".tar.bz2", ".tgz", ".txz", ".tar", ".zip"] {
        if let Some(stem) = file_name.strip_suffix(suffix) {
            return stem;
        }
    }
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    TarGz,
    TarXz,
    Tar,
    Zip,
}

/// Sniff the archive format from magic bytes rather than trusting the file
/// extension. Plain tar's "ustar" marker sits at offset 257 and is optional,
/// so the extension is the tie-break there.
fn sniff_archive_kind(path: &Path) -> Result<ArchiveKind> {
    let mut header = Vec::with_capacity(265);
    fs::File::open(path)
        .and_then(|file| file.take(265).read_to_end(&mut header))
        .map_err(|err| extraction_err(path, err))?;

    if header.starts_with(&[0x1f, 0x8b]) {
        return Ok(ArchiveKind::TarGz);
    }
    if header.starts_with(b"PK\x03\x04") {
        return Ok(ArchiveKind::Zip);
    }
    if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        return Ok(ArchiveKind::TarXz);
    }
    if header.len() >= 262 && &header[257..262] == b"ustar" {
        return Ok(ArchiveKind::Tar);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("tar") => Ok(ArchiveKind::Tar),
        _ => Err(ThemeError::UnsupportedSource(format!(
            "{}: unrecognized archive format",
            path.display()
        ))),
    }
}

fn extraction_err(source: &Path, err: impl std::fmt::Display) -> ThemeError {
    ThemeError::Extraction {
        src: source.display().to_string(),
        reason: err.to_string(),
    }
}

/// Turns any supported install source into a registered theme
pub struct Installer<'a> {
    settings: &'a Settings,
    store: &'a ThemeStore,
}

impl<'a> Installer<'a> {
    pub fn new(settings: &'a Settings, store: &'a ThemeStore) -> Self {
        Self { settings, store }
    }

    /// Run the full pipeline. `name_override` wins over the name derived from
    /// the source.
    pub async fn install(&self, raw_source: &str, name_override: Option<&str>) -> Result<Theme> {
        let source = InstallSource::resolve(raw_source)?;
        let name = match name_override {
            Some(n) => n.to_string(),
            None => source.derived_name()?,
        };
        debug!("installing '{name}' from {source:?}");

        let target = self.store.root().join(&name);
        if target.exists() && self.settings.overwrite_policy == OverwritePolicy::Fail {
            return Err(ThemeError::AlreadyInstalled(name));
        }

        let staging = self.create_staging()?;
        // removed on success and failure alike; the validated theme directory
        // is renamed out of it before this runs
        let _cleanup = scopeguard::guard(staging.clone(), |dir| {
            let _ = fs::remove_dir_all(&dir);
        });

        let content_dir = staging.join("content");
        fs::create_dir_all(&content_dir).map_err(|err| extraction_err(&content_dir, err))?;

        match &source {
            InstallSource::Remote(url) => {
                let archive = staging.join("download");
                self.download(url, &archive).await?;
                extract_archive(&archive, &content_dir)?;
            }
            InstallSource::Archive(path) => extract_archive(path, &content_dir)?,
            InstallSource::Directory(path) => {
                copy_dir_contents(path, &content_dir).map_err(|err| extraction_err(path, err))?;
            }
        }

        // archives frequently wrap the theme in an extra directory level
        let theme_src = find_theme_dir(&content_dir).ok_or_else(|| ThemeError::InvalidTheme {
            path: content_dir.clone(),
            reason: "no theme descriptor found in source".into(),
        })?;

        if target.exists() {
            // OverwritePolicy::Replace, and only after the new content validated
            fs::remove_dir_all(&target).map_err(|err| ThemeError::PermissionDenied {
                operation: format!("replace theme '{name}': {err}"),
            })?;
        }
        fs::rename(&theme_src, &target).map_err(|err| ThemeError::PermissionDenied {
            operation: format!("install theme '{name}': {err}"),
        })?;

        let theme = self.store.register(&target)?;
        info!("installed theme '{}' from {raw_source}", theme.name);
        Ok(theme)
    }

    /// Staging lives inside the themes directory so the final move is an
    /// atomic same-filesystem rename. The dot prefix keeps it out of the
    /// store's listings.
    fn create_staging(&self) -> Result<PathBuf> {
        let dir = self
            .store
            .root()
            .join(format!(".staging-{:08x}", rand::random::<u32>()));
        fs::create_dir_all(&dir).map_err(|err| match err.kind() {
            io::ErrorKind::PermissionDenied => ThemeError::PermissionDenied {
                operation: format!("create staging directory in {}", self.store.root().display()),
            },
            _ => extraction_err(&dir, err),
        })?;
        Ok(dir)
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<()> {
        let download_err = |reason: String| ThemeError::Download {
            url: url.to_string(),
            reason,
        };

        info!("downloading {url}");
        let client = reqwest::Client::builder()
            .user_agent(http::USER_AGENT)
            .timeout(self.settings.download_timeout)
            .build()
            .map_err(|err| download_err(err.to_string()))?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| download_err(err.to_string()))?;
        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| download_err(err.to_string()))?;
        debug!("downloaded {} bytes", bytes.len());

        fs::write(dest, &bytes).map_err(|err| download_err(err.to_string()))
    }
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let kind = sniff_archive_kind(archive)?;
    debug!("extracting {} as {kind:?}", archive.display());

    let open = || fs::File::open(archive).map_err(|err| extraction_err(archive, err));
    match kind {
        ArchiveKind::TarGz => tar::Archive::new(flate2::read::GzDecoder::new(open()?))
            .unpack(dest)
            .map_err(|err| extraction_err(archive, err)),
        ArchiveKind::TarXz => tar::Archive::new(xz2::read::XzDecoder::new(open()?))
            .unpack(dest)
            .map_err(|err| extraction_err(archive, err)),
        ArchiveKind::Tar => tar::Archive::new(open()?)
            .unpack(dest)
            .map_err(|err| extraction_err(archive, err)),
        ArchiveKind::Zip => zip::ZipArchive::new(open()?)
            .and_then(|mut zip| zip.extract(dest))
            .map_err(|err| extraction_err(archive, err)),
    }
}

/// Locate the directory actually holding the descriptor, unwrapping any
/// packaging nesting levels.
fn find_theme_dir(root: &Path) -> Option<PathBuf> {
    if ThemeStore::is_valid_theme_dir(root) {
        return Some(root.to_path_buf());
    }
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_dir() && ThemeStore::is_valid_theme_dir(e.path()))
        .map(|e| e.into_path())
}

/// Copy a directory's contents into `dest`; sources are never moved.
fn copy_dir_contents(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_dir_contents(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
