//! Safe document writer
//!
//! Backup-then-replace for the target netplan file. An existing target is
//! copied byte for byte to `<target>.bak.<timestamp>` before anything is
//! written; if that copy fails nothing else happens. The new content then
//! replaces the target whole. There is no cross-file transaction: an
//! interrupted in-place write can leave a truncated target next to an
//! intact backup. `atomic` switches to write-temp-then-rename.

use crate::document::ConfigDocument;
use crate::error::{NetcfgError, NetcfgResult};
use crate::validation;
use chrono::Local;
use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// How the target gets replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub atomic: bool,
    pub mode: Option<u32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: false,
            mode: Some(0o600),
        }
    }
}

/// What a successful persist did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub target: PathBuf,
    pub backup: Option<PathBuf>,
    pub bytes_written: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SafeWriter {
    options: WriteOptions,
}

impl SafeWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Serialize `document` and write it to `target`
    pub async fn persist(&self, document: &ConfigDocument, target: &Path) -> NetcfgResult<WriteResult> {
        let content = document.to_yaml()?;
        self.persist_text(&content, target).await
    }

    /// Write already-rendered content to `target`
    ///
    /// The mode of an existing target is set before the backup is taken, so
    /// a target the caller cannot chmod fails with nothing changed.
    pub async fn persist_text(&self, content: &str, target: &Path) -> NetcfgResult<WriteResult> {
        validation::validate_target_path(target)?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let exists = fs::try_exists(target).await?;
        if exists && !self.options.atomic {
            self.apply_mode(target).await?;
        }

        let backup = if exists {
            Some(backup_file(target).await?)
        } else {
            None
        };

        if self.options.atomic {
            let tmp = sibling(target, ".tmp");
            self.write_new(&tmp, content).await?;
            fs::rename(&tmp, target).await?;
        } else {
            self.write_new(target, content).await?;
        }

        info!("Wrote {} ({} bytes)", target.display(), content.len());

        Ok(WriteResult {
            target: target.to_path_buf(),
            backup,
            bytes_written: content.len(),
        })
    }

    /// Create or truncate `path` with the configured mode and write `content`
    async fn write_new(&self, path: &Path, content: &str) -> NetcfgResult<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        if let Some(mode) = self.options.mode {
            options.mode(mode);
        }

        let mut file = options.open(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        // Creation mode is filtered by the umask; content is already in place
        if let Err(e) = self.apply_mode(path).await {
            warn!("Could not set mode on {}: {}", path.display(), e);
        }
        Ok(())
    }

    async fn apply_mode(&self, path: &Path) -> NetcfgResult<()> {
        if let Some(mode) = self.options.mode {
            fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
        }
        Ok(())
    }
}

/// Copy `target` to a fresh timestamped backup path
///
/// A counter suffix keeps two runs within the same second from sharing
/// a backup.
pub async fn backup_file(target: &Path) -> NetcfgResult<PathBuf> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let base = sibling(target, &format!(".bak.{}", stamp));

    let backup_err = |source: std::io::Error| NetcfgError::Backup {
        path: target.to_path_buf(),
        source,
    };

    let mut backup = base.clone();
    let mut counter = 1;
    while fs::try_exists(&backup).await.map_err(backup_err)? {
        backup = sibling(&base, &format!("-{}", counter));
        counter += 1;
    }

    fs::copy(target, &backup).await.map_err(backup_err)?;

    info!("Backed up {} to {}", target.display(), backup.display());
    Ok(backup)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Decide which file to write
///
/// An explicit path wins. Otherwise the first `*.yaml`/`*.yml` in `dir`
/// by name, falling back to `dir/default_file` when there is none.
pub async fn resolve_target_file(
    dir: &Path,
    default_file: &str,
    explicit: Option<&Path>,
) -> NetcfgResult<PathBuf> {
    let target = match explicit {
        Some(path) => path.to_path_buf(),
        None => first_document(dir)
            .await?
            .unwrap_or_else(|| dir.join(default_file)),
    };

    validation::validate_target_path(&target)?;
    debug!("Target document: {}", target.display());
    Ok(target)
}

async fn first_document(dir: &Path) -> NetcfgResult<Option<PathBuf>> {
    if !fs::try_exists(dir).await? {
        return Ok(None);
    }

    let mut entries = fs::read_dir(dir).await?;
    let mut documents = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if is_yaml && entry.file_type().await?.is_file() {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents.into_iter().next())
}
