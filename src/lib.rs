//! # rolling-log-helper
//!
//! Appends timestamped lines to a log file that rolls over daily. When the
//! calendar day changes, the active file is renamed to embed the day it
//! covered, compressed with gzip, and old archives beyond a retention count
//! are removed. The active file always keeps its plain name, and a symbolic
//! link can be maintained at a stable path pointing at it.
//!
//! Given the output path `/var/log/app/app.log`:
//!
//! ```text
//! /var/log/app/app.log                 active segment
//! /var/log/app/app.2025-04-01.log.gz   archived segments, newest 8 kept
//! /var/log/app/app.2025-03-31.log.gz
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rolling_log_helper::{OutputSpec, RollingWriterBuilder, TimeZone};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = tempfile::tempdir()?;
//!     let mut writer = RollingWriterBuilder::new(OutputSpec::derive(dir.path().join("app.log")))
//!         .time_zone(TimeZone::UTC)
//!         .max_keep_files(8)
//!         .build()?;
//!
//!     let now = writer.now();
//!     writer.write_line("[2025-04-01 19:55:00] service started", now)?;
//!     Ok(())
//! }
//! ```
use {
    chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc},
    flate2::{write::GzEncoder, Compression},
    std::{
        fs,
        io::{self, Write as _},
        path::{Path, PathBuf},
        time::SystemTime,
    },
    tracing::{debug, warn},
};

mod config;
mod link;
mod name;
mod sink;

pub use {
    config::HelperConfig,
    link::{ActiveFileObserver, LinkMaintainer, LinkOutcome, RELINK_INTERVAL_MILLIS},
    name::OutputSpec,
    sink::{LineSink, TIMESTAMP_FORMAT},
};

/// Number of archived segments kept unless configured otherwise.
pub const DEFAULT_MAX_KEEP_FILES: usize = 8;

/// Extension appended to compressed archives.
pub(crate) const GZIP_EXTENSION: &str = "gz";

/// Specifies the time zone used to decide the calendar day of a write.
///
/// # Examples
/// ```
/// use rolling_log_helper::TimeZone;
/// use chrono::FixedOffset;
///
/// let utc = TimeZone::UTC;
/// let local = TimeZone::Local;
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// ```
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local time zone. The offset is resolved for every
    /// instant, so daylight saving changes move the day boundary with it.
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

/// Configuration of the rolling writer.
struct RollingWriterMeta {
    /// Naming parts of the active and archived files.
    spec: OutputSpec,
    /// The time zone used to compute rotation keys.
    time_zone: TimeZone,
    /// Whether archived segments are gzipped.
    compress: bool,
    /// The maximum number of archived segments to keep.
    max_keep_files: usize,
}

/// The currently open, appendable log file.
struct ActiveSegment {
    path: PathBuf,
    /// `path` resolved once at open, handed to the observer on every write.
    absolute_path: PathBuf,
    rotation_key: NaiveDate,
    file: fs::File,
}

/// A log writer that rolls over to a new file whenever the calendar day
/// changes.
pub struct RollingWriter {
    meta: RollingWriterMeta,
    active: Option<ActiveSegment>,
    observer: Option<Box<dyn ActiveFileObserver>>,
}

impl RollingWriterMeta {
    /// Express `at` in the configured time zone.
    fn localize(&self, at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match &self.time_zone {
            TimeZone::UTC => at.with_timezone(&Utc).fixed_offset(),
            TimeZone::Local => at.with_timezone(&Local).fixed_offset(),
            TimeZone::Fix(offset) => at.with_timezone(offset),
        }
    }

    /// Get the current time in the configured time zone.
    fn now(&self) -> DateTime<FixedOffset> {
        self.localize(Utc::now().fixed_offset())
    }

    /// The calendar day `at` falls on in the configured time zone.
    fn rotation_key(&self, at: DateTime<FixedOffset>) -> NaiveDate {
        self.localize(at).date_naive()
    }

    /// Rotation key of a file left behind at `log_path` by an earlier run,
    /// derived from its modification time. Empty or missing files have none.
    fn leftover_key(&self, log_path: &Path) -> Option<NaiveDate> {
        let metadata = fs::metadata(log_path).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }
        let modified: SystemTime = metadata.modified().ok()?;
        Some(self.rotation_key(DateTime::<Utc>::from(modified).fixed_offset()))
    }

    /// Open the log file for appending, creating it and its directory if
    /// needed.
    fn create_log_file(&self, log_path: &Path) -> Result<fs::File, RollerError> {
        let mut open_options = fs::OpenOptions::new();
        open_options.append(true).create(true);

        let mut create_log_file_res = open_options.open(log_path);
        if create_log_file_res.is_err() {
            // Create the directory if it doesn't exist
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|err| RollerError::CreateDirectoryFailed(parent.to_path_buf(), err.to_string()))?;
                create_log_file_res = open_options.open(log_path);
            }
        }

        create_log_file_res.map_err(|err| RollerError::CreateFileFailed(log_path.to_path_buf(), err.to_string()))
    }

    /// Move the closed active file to the archive name for `key` and
    /// compress it. Failures are logged; the writer carries on.
    fn archive(&self, log_path: &Path, key: NaiveDate) {
        let archive_path = self.spec.archive_path(key, false);
        if let Err(err) = move_or_append(log_path, &archive_path) {
            warn!("{}", err);
            return;
        }
        debug!(archive = %archive_path.display(), "rolled over log file");

        if self.compress {
            match compress(&archive_path) {
                Ok(compressed_path) => debug!(archive = %compressed_path.display(), "compressed log file"),
                Err(err) => warn!("Failed to compress log file '{}': {}", archive_path.display(), err),
            }
        }
    }

    /// List archived segments of this output, newest first. Uncompressed
    /// archives count as well.
    fn list_archives(&self) -> Result<Vec<(NaiveDate, PathBuf)>, RollerError> {
        let pattern = self.spec.archive_pattern()?;
        let files = fs::read_dir(self.spec.scan_directory()).map_err(RollerError::FileIOError)?;

        let mut archives = Vec::new();
        for file in files.flatten() {
            if !file.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(key) = file
                .file_name()
                .to_str()
                .and_then(|name| OutputSpec::parse_archive_key(&pattern, name))
            {
                archives.push((key, file.path()));
            }
        }

        archives.sort_by(|a, b| b.cmp(a));
        Ok(archives)
    }

    /// Delete archived segments beyond the retention count, oldest first.
    fn prune(&self) {
        let archives = match self.list_archives() {
            Ok(archives) => archives,
            Err(err) => {
                warn!(
                    "Failed to list old log files in '{}': {}",
                    self.spec.scan_directory().display(),
                    err
                );
                return;
            }
        };

        for (_, path) in archives.iter().skip(self.max_keep_files).rev() {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed old log file"),
                Err(err) => warn!("Failed to remove old log file '{}': {}", path.display(), err),
            }
        }
    }
}

/// Rename `from` to `to`. When `to` already exists (an earlier archive of the
/// same day whose compression failed), append `from` to it instead so neither
/// is lost.
fn move_or_append(from: &Path, to: &Path) -> Result<(), RollerError> {
    let rename_error = |err: io::Error| RollerError::RenameFileError {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: err.to_string(),
    };

    if fs::symlink_metadata(to).is_err() {
        return fs::rename(from, to).map_err(rename_error);
    }

    let mut reader = fs::File::open(from).map_err(rename_error)?;
    let mut writer = fs::OpenOptions::new().append(true).open(to).map_err(rename_error)?;
    io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.flush())
        .map_err(rename_error)?;
    fs::remove_file(from).map_err(rename_error)
}

/// Gzip the archived log file and remove the uncompressed copy.
///
/// An existing compressed archive for the same day is appended to; gzip
/// readers decode the concatenated members as one stream.
fn compress(log_path: &Path) -> Result<PathBuf, RollerError> {
    let infile = fs::File::open(log_path).map_err(RollerError::FileIOError)?;
    let mut reader = io::BufReader::new(infile);

    let compressed_path = PathBuf::from(format!("{}.{}", log_path.to_string_lossy(), GZIP_EXTENSION));
    let outfile = fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&compressed_path)
        .map_err(RollerError::FileIOError)?;

    let mut encoder = GzEncoder::new(io::BufWriter::new(outfile), Compression::default());
    io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush())
        .map_err(|err| RollerError::CompressFailed {
            path: compressed_path.clone(),
            error: err.to_string(),
        })?;

    fs::remove_file(log_path).map_err(RollerError::FileIOError)?;
    Ok(compressed_path)
}

impl RollingWriter {
    /// Get the current time in the writer's time zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.meta.now()
    }

    pub fn output_spec(&self) -> &OutputSpec {
        &self.meta.spec
    }

    /// Path of the active segment, if one is open.
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|segment| segment.path.as_path())
    }

    /// Append `text` and a line terminator to the log file for `at`, rolling
    /// over first if `at` falls on a new day.
    ///
    /// The line is flushed before returning. Failing to open, write or flush
    /// the active file is returned as an error; every other filesystem
    /// problem is logged and skipped.
    pub fn write_line(&mut self, text: &str, at: DateTime<FixedOffset>) -> Result<(), RollerError> {
        let segment = self.roll_if_needed(at)?;
        segment
            .file
            .write_all(text.as_bytes())
            .and_then(|_| segment.file.write_all(b"\n"))
            .and_then(|_| segment.file.flush())
            .map_err(|err| RollerError::WriteFailed(segment.path.clone(), err.to_string()))
    }

    /// Make sure the active segment matches the day of `at`, then notify the
    /// observer.
    fn roll_if_needed(&mut self, at: DateTime<FixedOffset>) -> Result<&mut ActiveSegment, RollerError> {
        let key = self.meta.rotation_key(at);
        let segment = match self.active.take() {
            Some(segment) if segment.rotation_key == key => segment,
            previous => self.roll_over(previous, key)?,
        };
        let segment = self.active.insert(segment);

        if let Some(observer) = self.observer.as_mut() {
            observer.active_file(&segment.absolute_path, at.timestamp_millis());
        }
        Ok(segment)
    }

    /// Close `previous`, archive it under its own day and open a fresh active
    /// segment for `key`.
    fn roll_over(&mut self, previous: Option<ActiveSegment>, key: NaiveDate) -> Result<ActiveSegment, RollerError> {
        let log_path = self.meta.spec.active_path();

        let previous_key = match previous {
            Some(mut segment) => {
                if let Err(err) = segment.file.flush() {
                    warn!("Failed to flush log file '{}': {}", segment.path.display(), err);
                }
                Some(segment.rotation_key)
            }
            None => self.meta.leftover_key(&log_path).filter(|leftover| *leftover != key),
        };

        if let Some(previous_key) = previous_key {
            self.meta.archive(&log_path, previous_key);
        }

        let file = self.meta.create_log_file(&log_path)?;
        debug!(path = %log_path.display(), day = %key, "opened log file");

        if previous_key.is_some() {
            self.meta.prune();
        }

        let absolute_path = std::path::absolute(&log_path).unwrap_or_else(|err| {
            warn!("Failed to resolve absolute path of '{}': {}", log_path.display(), err);
            log_path.clone()
        });
        Ok(ActiveSegment {
            path: log_path,
            absolute_path,
            rotation_key: key,
            file,
        })
    }
}

/// Errors that can occur when using the rolling writer.
#[derive(Debug, thiserror::Error)]
pub enum RollerError {
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to create file '{0}': {1}")]
    CreateFileFailed(PathBuf, String),
    #[error("Failed to write to '{0}': {1}")]
    WriteFailed(PathBuf, String),
    #[error("Failed to read input: {0}")]
    ReadFailed(io::Error),
    #[error("Failed to move file from '{from}' to '{to}': {error}")]
    RenameFileError { from: PathBuf, to: PathBuf, error: String },
    #[error("Failed to compress into '{path}': {error}")]
    CompressFailed { path: PathBuf, error: String },
    #[error("Invalid archive name pattern: {0}")]
    InvalidPattern(String),
    #[error("File IO error: {0}")]
    FileIOError(#[from] std::io::Error),
}

/// Provides a fluent interface for configuring [`RollingWriter`] instances.
///
/// # Default Configuration
///
/// * Daily rotation at midnight in the local system time zone
/// * Gzip compression of archived segments
/// * Keep the newest [`DEFAULT_MAX_KEEP_FILES`] archives
/// * No link maintenance
///
/// # Examples
///
/// ```rust
/// use rolling_log_helper::{OutputSpec, RollingWriterBuilder, TimeZone};
///
/// let dir = tempfile::tempdir().unwrap();
/// let output = dir.path().join("app.log");
/// let writer = RollingWriterBuilder::new(OutputSpec::derive(&output))
///     .time_zone(TimeZone::UTC)
///     .max_keep_files(30)
///     .link(dir.path().join("current.log"))
///     .build()
///     .unwrap();
/// ```
pub struct RollingWriterBuilder {
    meta: RollingWriterMeta,
    observer: Option<Box<dyn ActiveFileObserver>>,
}

impl RollingWriterBuilder {
    /// Create a new builder writing the files named by `spec`.
    pub fn new(spec: OutputSpec) -> Self {
        RollingWriterBuilder {
            meta: RollingWriterMeta {
                spec,
                time_zone: TimeZone::Local,
                compress: true,
                max_keep_files: DEFAULT_MAX_KEEP_FILES,
            },
            observer: None,
        }
    }

    /// Set the time zone deciding the calendar day of each write.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            meta: RollingWriterMeta { time_zone, ..self.meta },
            ..self
        }
    }

    /// Keep archived files uncompressed.
    pub fn uncompressed(self) -> Self {
        Self {
            meta: RollingWriterMeta {
                compress: false,
                ..self.meta
            },
            ..self
        }
    }

    /// Set the maximum number of archived files to keep.
    pub fn max_keep_files(self, max_keep_files: usize) -> Self {
        Self {
            meta: RollingWriterMeta {
                max_keep_files,
                ..self.meta
            },
            ..self
        }
    }

    /// Install a callback run after every rotation check with the absolute
    /// path of the active file.
    pub fn observer(self, observer: Box<dyn ActiveFileObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..self
        }
    }

    /// Maintain a symbolic link at `target` pointing to the active file.
    pub fn link<P: AsRef<Path>>(self, target: P) -> Self {
        self.observer(Box::new(LinkMaintainer::new(target)))
    }

    /// Build the writer. The active file is opened on the first write.
    pub fn build(self) -> Result<RollingWriter, RollerError> {
        // Fail early on a name that cannot produce a valid archive pattern.
        self.meta.spec.archive_pattern()?;
        Ok(RollingWriter {
            meta: self.meta,
            active: None,
            observer: self.observer,
        })
    }
}

/// Raw appender: bytes go to the active segment of the current day as they
/// are, with no line terminator added. A write that straddles midnight may
/// split a line across two segments; use [`RollingWriter::write_line`] for
/// line-oriented input.
impl io::Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let now = self.meta.now();
        let segment = self.roll_if_needed(now).map_err(io::Error::other)?;
        segment.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.active.as_mut() {
            Some(segment) => segment.file.flush(),
            None => Ok(()),
        }
    }
}
