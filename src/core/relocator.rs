use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::models::RelocationPair;

/// Moves `drivers/` and `firmwares/` out of `<module_root>/modules` into `<module_root>`.
pub struct Relocator {
    module_root: PathBuf,
}

/// What a single pair did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Source absent; nothing to do.
    Skipped,
    /// Source moved; count of files placed at the destination.
    Moved { files: usize },
}

impl Relocator {
    pub fn new(module_root: impl Into<PathBuf>) -> Self {
        Self {
            module_root: module_root.into(),
        }
    }

    pub fn source(&self, pair: RelocationPair) -> PathBuf {
        self.module_root.join("modules").join(pair.dir_name())
    }

    pub fn destination(&self, pair: RelocationPair) -> PathBuf {
        self.module_root.join(pair.dir_name())
    }

    /// Relocate both pairs concurrently and return how many files were moved.
    /// Never fails: errors are logged and dropped.
    pub async fn relocate(&self) -> usize {
        let (drivers, firmwares) = tokio::join!(
            self.relocate_pair(RelocationPair::Drivers),
            self.relocate_pair(RelocationPair::Firmwares)
        );

        let mut moved = 0;
        let mut failed = false;
        for (pair, result) in [
            (RelocationPair::Drivers, drivers),
            (RelocationPair::Firmwares, firmwares),
        ] {
            match result {
                Ok(Relocation::Moved { files }) => {
                    info!(files, "Relocated {}", pair.dir_name());
                    moved += files;
                }
                Ok(Relocation::Skipped) => {}
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Relocating {} failed", pair.dir_name());
                    failed = true;
                }
            }
        }

        if !failed {
            info!(files = moved, "Driver and firmware relocation complete");
        }
        moved
    }

    pub async fn relocate_pair(&self, pair: RelocationPair) -> Result<Relocation> {
        let source = self.source(pair);
        let destination = self.destination(pair);

        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            debug!(path = %source.display(), "No {} directory to relocate", pair.dir_name());
            return Ok(Relocation::Skipped);
        }

        info!(
            from = %source.display(),
            to = %destination.display(),
            "Relocating {}",
            pair.dir_name()
        );

        let files = tokio::task::spawn_blocking(move || -> Result<usize> {
            let files = move_directory(&source, &destination)?;
            remove_source(&source)?;
            Ok(files)
        })
        .await??;

        Ok(Relocation::Moved { files })
    }
}

/// Move `source` to `destination`, merging into an existing destination and
/// overwriting files that already exist there.
fn move_directory(source: &Path, destination: &Path) -> Result<usize> {
    if !destination.exists() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        match fs::rename(source, destination) {
            Ok(()) => return count_files(destination),
            Err(e) => debug!(error = %e, "Directory rename failed, merging instead"),
        }
    }

    merge_directory(source, destination)
}

fn merge_directory(source: &Path, destination: &Path) -> Result<usize> {
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    let mut files = 0;
    for entry in fs::read_dir(source)
        .with_context(|| format!("Failed to read directory {}", source.display()))?
    {
        let entry = entry?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if to.is_file() {
                fs::remove_file(&to)
                    .with_context(|| format!("Failed to replace {}", to.display()))?;
            }
            files += merge_directory(&from, &to)?;
        } else {
            if to.is_dir() {
                fs::remove_dir_all(&to)
                    .with_context(|| format!("Failed to replace {}", to.display()))?;
            }
            move_file(&from, &to)
                .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
            files += 1;
        }
    }

    Ok(files)
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // Cross-device or otherwise unrenameable: copy, keep timestamps, drop the original.
        Err(_) => {
            fs::copy(from, to)?;
            let metadata = fs::metadata(from)?;
            let atime = filetime::FileTime::from_last_access_time(&metadata);
            let mtime = filetime::FileTime::from_last_modification_time(&metadata);
            filetime::set_file_times(to, atime, mtime)?;
            fs::remove_file(from)
        }
    }
}

fn remove_source(source: &Path) -> Result<()> {
    match fs::remove_dir_all(source) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", source.display())),
    }
}

fn count_files(dir: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            files += count_files(&entry.path())?;
        } else {
            files += 1;
        }
    }
    Ok(files)
}
