//! Streaming ZIP extraction.
//!
//! The archive arrives as an async byte stream and is decoded one local entry
//! at a time on a blocking task, so memory use does not grow with archive size.
//!
//! Entries whose sizes only appear in a trailing data descriptor cannot be
//! decoded from a forward-only stream. Every byte read is therefore spooled to
//! an anonymous temp file; when such an entry shows up, the rest of the body is
//! spooled and the archive is extracted again through its central directory.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::Stream;
use tokio_util::bytes::Bytes;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, info, warn};
use zip::result::ZipError;

use crate::error::ExtractError;
use crate::logging::LogThrottle;

/// What an extraction wrote to disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
    /// Entries whose names would escape the target directory.
    pub skipped: usize,
}

/// Decode a ZIP archive from `stream` into `target`, creating directories as needed.
///
/// Resolves once every entry has been flushed to disk. On failure, entries
/// already written are left in place.
pub async fn extract_stream<S>(stream: S, target: &Path) -> Result<ExtractSummary, ExtractError>
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let reader = SyncIoBridge::new(StreamReader::new(Box::pin(stream)));
    let target = target.to_path_buf();

    let summary = tokio::task::spawn_blocking(move || unpack_entries(reader, &target)).await??;

    info!(
        files = summary.files,
        directories = summary.directories,
        bytes = summary.bytes,
        skipped = summary.skipped,
        "Archive extraction complete"
    );
    Ok(summary)
}

/// Tees everything read from `inner` into `spool`.
struct SpoolingReader<R> {
    inner: R,
    spool: File,
}

impl<R: Read> Read for SpoolingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.spool.write_all(&buf[..n])?;
        Ok(n)
    }
}

/// Name and shape of an archive entry, taken before its data is read.
struct EntryMeta {
    name: String,
    path: Option<PathBuf>,
    is_dir: bool,
    unix_mode: Option<u32>,
}

fn unpack_entries<R: Read>(reader: R, dest: &Path) -> Result<ExtractSummary, ExtractError> {
    fs::create_dir_all(dest).map_err(io_error(dest))?;

    let spool = tempfile::tempfile().map_err(io_error(&std::env::temp_dir()))?;
    let mut reader = SpoolingReader {
        inner: reader,
        spool,
    };
    let mut summary = ExtractSummary::default();

    match unpack_streamed(&mut reader, dest, &mut summary) {
        Err(ExtractError::Zip(ZipError::UnsupportedArchive(reason))) => {
            debug!(reason, "Entry not decodable while streaming, using spooled archive");
            unpack_spooled(reader, dest)
        }
        result => result.map(|()| summary),
    }
}

fn unpack_streamed<R: Read>(
    reader: &mut R,
    dest: &Path,
    summary: &mut ExtractSummary,
) -> Result<(), ExtractError> {
    let throttle = LogThrottle::new(Duration::from_millis(500));

    while let Some(mut entry) = zip::read::read_zipfile_from_stream(&mut *reader)? {
        let meta = EntryMeta {
            name: entry.name().to_string(),
            path: entry.enclosed_name(),
            is_dir: entry.is_dir(),
            unix_mode: entry.unix_mode(),
        };
        write_entry(&mut entry, meta, dest, summary, &throttle)?;
    }

    Ok(())
}

fn unpack_spooled<R: Read>(
    mut reader: SpoolingReader<R>,
    dest: &Path,
) -> Result<ExtractSummary, ExtractError> {
    // Read failures surface the same way as they do while streaming.
    io::copy(&mut reader, &mut io::sink()).map_err(ZipError::Io)?;

    let mut spool = reader.spool;
    spool.seek(SeekFrom::Start(0)).map_err(ZipError::Io)?;
    let mut archive = zip::ZipArchive::new(spool)?;

    let throttle = LogThrottle::new(Duration::from_millis(500));
    let mut summary = ExtractSummary::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let meta = EntryMeta {
            name: entry.name().to_string(),
            path: entry.enclosed_name(),
            is_dir: entry.is_dir(),
            unix_mode: entry.unix_mode(),
        };
        write_entry(&mut entry, meta, dest, &mut summary, &throttle)?;
    }

    Ok(summary)
}

fn write_entry<E: Read>(
    entry: &mut E,
    meta: EntryMeta,
    dest: &Path,
    summary: &mut ExtractSummary,
    throttle: &LogThrottle,
) -> Result<(), ExtractError> {
    let relative = match meta.path {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => {
            warn!(entry = %meta.name, "Skipping archive entry with unsafe path");
            summary.skipped += 1;
            return Ok(());
        }
    };
    let out_path = dest.join(&relative);

    if meta.is_dir {
        fs::create_dir_all(&out_path).map_err(io_error(&out_path))?;
        summary.directories += 1;
    } else {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut file = File::create(&out_path).map_err(io_error(&out_path))?;
        let written = io::copy(entry, &mut file).map_err(io_error(&out_path))?;

        #[cfg(unix)]
        if let Some(mode) = meta.unix_mode {
            use std::os::unix::fs::PermissionsExt;
            // Owner keeps read/write so a later run can overwrite the file.
            let perms = fs::Permissions::from_mode((mode & 0o777) | 0o600);
            if let Err(e) = fs::set_permissions(&out_path, perms) {
                warn!(path = %out_path.display(), error = %e, "Failed to apply archive permissions");
            }
        }

        summary.files += 1;
        summary.bytes += written;
    }

    if throttle.should_log() {
        debug!(
            entry = %relative.display(),
            files = summary.files,
            bytes = summary.bytes,
            "Extracting module archive"
        );
    }

    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExtractError {
    let path: PathBuf = path.to_path_buf();
    move |source| ExtractError::Io { path, source }
}
