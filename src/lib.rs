//! # LogRollover
//!
//! LogRollover is a size-bounded, append-only log writer for a host
//! application's diagnostic trace pipeline. It appends text messages to a
//! single active log file and, when a periodic size check finds the file
//! grown past a configured threshold, archives it to a single "previous
//! generation" file (`app.log` → `app_old.log`) before continuing on a
//! fresh active file. Exactly one archived generation is retained, which
//! bounds disk usage from unbounded log growth at minimal per-write cost:
//! the file size is physically checked only once every 100 write calls.
//! **LogRollover also integrates as an appender for the tracing crate**
//! through its [`std::io::Write`] implementation.
//!
//!
//! ## Example
//!
//! ```rust
//! use {
//!    logrollover::{MaxSize, RollingWriterBuilder},
//!    tracing_subscriber::util::SubscriberInitExt,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    let appender = RollingWriterBuilder::new(std::env::temp_dir().join("tracing.log"))
//!        .max_size(MaxSize::MB(1)) // Archive the file once it exceeds 1MB
//!        .build();
//!    let (non_blocking, _guard) = tracing_appender::non_blocking(appender);
//!    tracing_subscriber::fmt()
//!        .with_writer(non_blocking)
//!        .with_ansi(false)
//!        .with_target(false)
//!        .with_file(true)
//!        .with_line_number(true)
//!        .finish()
//!        .try_init()?;
//!
//!    tracing::info!("This is an info message");
//!    tracing::warn!("This is a warning message");
//!    tracing::error!("This is an error message");
//!
//!    Ok(())
//! }
//! ```
use std::{
    fs::{self, Permissions},
    io::{self, Write as _},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Number of write calls between physical file-size checks.
///
/// Stat-ing the active file on every single write would cost one filesystem
/// call per log line; checking once per interval amortizes that cost. The
/// accepted trade-off is that the active file may overshoot the configured
/// threshold by whatever the writes between two checks append.
const CHECK_INTERVAL: u32 = 100;

/// Threshold applied when no size is configured: 1,000,000 bytes.
const DEFAULT_MAX_SIZE_BYTES: u64 = 1_000_000;

/// Marker inserted before the file extension to form the archive file name.
const ARCHIVE_MARKER: &str = "_old";

#[cfg(windows)]
const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_TERMINATOR: &str = "\n";

/// Defines size thresholds for archiving the active log file in various
/// units.
///
/// When a periodic size check finds the active file strictly larger than the
/// specified size, it is archived and a fresh active file is started by the
/// next append. This enum provides multiple size units to make configuration
/// more intuitive:
///
/// * `Bytes` - Direct byte count (e.g., 1048576 bytes)
/// * `KB` - Kilobytes (1 KB = 1024 bytes)
/// * `MB` - Megabytes (1 MB = 1024 KB)
/// * `GB` - Gigabytes (1 GB = 1024 MB)
///
/// # Examples
/// ```
/// use logrollover::{MaxSize, RollingWriterBuilder};
///
/// // Archive once the file exceeds 100 MB
/// let writer = RollingWriterBuilder::new("./logs/large.log")
///     .max_size(MaxSize::MB(100))
///     .build();
///
/// // Archive once the file exceeds 2 GB
/// let writer = RollingWriterBuilder::new("./logs/huge.log")
///     .max_size(MaxSize::GB(2))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub enum MaxSize {
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl MaxSize {
    /// Get the threshold in bytes.
    fn bytes(&self) -> u64 {
        match self {
            MaxSize::Bytes(b) => *b,
            MaxSize::KB(kb) => kb * 1024,
            MaxSize::MB(mb) => mb * 1024 * 1024,
            MaxSize::GB(gb) => gb * 1024 * 1024 * 1024,
        }
    }
}

/// Metadata for the rolling writer.
/// Resolved once at construction time and immutable for the writer's
/// lifetime.
#[derive(Clone)]
struct RollingWriterMeta {
    /// The file currently receiving appended writes.
    active_path: PathBuf,
    /// The file holding the previous generation's content. Derived from
    /// `active_path` by inserting [`ARCHIVE_MARKER`] before the extension,
    /// so it always differs from `active_path`.
    archive_path: PathBuf,
    /// The size threshold in bytes. The size check treats the active file
    /// as too big when its length strictly exceeds this value.
    max_size_bytes: u64,
    /// The file permissions to set on newly created log files (Unix-like
    /// systems only). This is specified in octal notation (e.g., 0o644 for
    /// rw-r--r--). On non-Unix systems, this setting is ignored with a
    /// warning message.
    file_mode: Option<u32>,
}

/// State for the rolling writer.
/// Mutated on every write call, behind the writer's mutex.
struct RollingWriterState {
    /// Write calls since the last physical size check, kept in
    /// `[0, CHECK_INTERVAL)`.
    write_count: u32,
}

/// A log writer that appends to an active file and archives it to a single
/// `_old` companion file once a periodic size check finds it over threshold.
///
/// Each write is a self-contained open/append/close operation; no file
/// handle is held across calls. The size-check-and-archive step and the
/// subsequent append are serialized under one internal mutex, so a
/// `RollingWriter` can be shared across threads: at most one archive swap
/// happens per overflow event and every write lands entirely in one file.
///
/// # Examples
/// ```
/// use logrollover::{MaxSize, RollingWriterBuilder};
///
/// let writer = RollingWriterBuilder::new("./logs/app.log")
///     .max_size(MaxSize::KB(256))
///     .build();
/// assert_eq!(writer.archive_path(), std::path::Path::new("./logs/app_old.log"));
/// ```
pub struct RollingWriter {
    meta: RollingWriterMeta,
    state: Mutex<RollingWriterState>,
}

impl RollingWriter {
    /// Build a writer from the host application's configuration string.
    ///
    /// The string has the form `"<path>"` or `"<path>;<max-bytes>"`. Only
    /// the last semicolon is treated as the separator; a missing or
    /// unparsable size token silently falls back to the 1,000,000-byte
    /// default. When `config` is `None` or empty, the path is synthesized
    /// as `<temp-dir>/<app_name>.log` from the platform temporary
    /// directory.
    ///
    /// Resolution happens exactly once; the resolved paths and threshold
    /// are immutable for the writer's lifetime.
    ///
    /// # Examples
    /// ```
    /// use logrollover::RollingWriter;
    ///
    /// let writer = RollingWriter::from_config(Some("./logs/app.log;500000"), "myapp");
    /// assert_eq!(writer.max_size_bytes(), 500_000);
    ///
    /// let fallback = RollingWriter::from_config(None, "myapp");
    /// assert!(fallback.active_path().starts_with(std::env::temp_dir()));
    /// ```
    pub fn from_config(config: Option<&str>, app_name: &str) -> Self {
        let (active_path, max_size_bytes) = match config {
            Some(config) if !config.is_empty() => parse_config(config),
            _ => (
                std::env::temp_dir().join(format!("{app_name}.log")),
                DEFAULT_MAX_SIZE_BYTES,
            ),
        };
        RollingWriterBuilder::new(active_path)
            .max_size(MaxSize::Bytes(max_size_bytes))
            .build()
    }

    /// Append `text` verbatim to the active file, archiving first if a due
    /// size check finds the file over threshold.
    ///
    /// A `None` text is a no-op: no filesystem access, no counter advance.
    /// An empty string is a real write (it still counts toward the check
    /// interval and creates the active file if absent). No line terminator
    /// is added.
    ///
    /// # Errors
    /// Any failure to delete the archive file, rename the active file, or
    /// append propagates to the caller. The writer performs no internal
    /// retry; the failed check is idempotent, so a subsequent call retries
    /// the same logical operation.
    pub fn write<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<(), RollingWriterError> {
        let Some(text) = text.into() else {
            return Ok(());
        };
        let mut state = self.lock_state();
        self.record_write_and_maybe_archive(&mut state)?;
        self.append_to_active(text.as_bytes())
    }

    /// Append a platform line terminator followed by `text` to the active
    /// file, archiving first if a due size check finds the file over
    /// threshold.
    ///
    /// A `None` or empty text is a no-op: no filesystem access, no counter
    /// advance. Note the ordering: the terminator *precedes* the text. This
    /// preserves the exact historical behavior of the trace listener this
    /// writer replaces, where each line terminates the previous one.
    ///
    /// # Errors
    /// Same propagation as [`RollingWriter::write`].
    pub fn write_line<'a>(
        &self,
        text: impl Into<Option<&'a str>>,
    ) -> Result<(), RollingWriterError> {
        let Some(text) = text.into() else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }
        let mut state = self.lock_state();
        self.record_write_and_maybe_archive(&mut state)?;
        let mut line = String::with_capacity(LINE_TERMINATOR.len() + text.len());
        line.push_str(LINE_TERMINATOR);
        line.push_str(text);
        self.append_to_active(line.as_bytes())
    }

    /// The file currently receiving appended writes.
    pub fn active_path(&self) -> &Path {
        &self.meta.active_path
    }

    /// The file holding the previous generation's content. Present on disk
    /// only after at least one archive swap has occurred.
    pub fn archive_path(&self) -> &Path {
        &self.meta.archive_path
    }

    /// The configured size threshold in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.meta.max_size_bytes
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RollingWriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account for one write call and archive the active file if a due size
    /// check finds it over threshold.
    ///
    /// The size is physically checked only when `write_count` is 0, i.e.
    /// once every [`CHECK_INTERVAL`] calls. The counter is incremented only
    /// after a successful check, so a failed check leaves it at 0 and the
    /// next call retries the same idempotent check.
    fn record_write_and_maybe_archive(
        &self,
        state: &mut RollingWriterState,
    ) -> Result<(), RollingWriterError> {
        // Normalize any external perturbation of the counter; under normal
        // operation the increment below never pushes it past the interval.
        if state.write_count > CHECK_INTERVAL - 1 {
            state.write_count = 0;
        }
        if state.write_count == 0 {
            self.check_and_archive()?;
        }
        state.write_count += 1;
        Ok(())
    }

    /// Perform the physical size check, swapping the active file to the
    /// archive path when it is strictly over threshold.
    ///
    /// The swap deletes any existing archive file first (idempotent, a
    /// missing archive is not an error), then renames the active file over
    /// the archive path. Immediately after a swap the active path is absent
    /// until the pending append recreates it.
    fn check_and_archive(&self) -> Result<(), RollingWriterError> {
        let active_len = match fs::metadata(&self.meta.active_path) {
            Ok(metadata) => metadata.len(),
            // Nothing to archive.
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(RollingWriterError::FileIOError(err)),
        };
        if active_len <= self.meta.max_size_bytes {
            return Ok(());
        }

        match fs::remove_file(&self.meta.archive_path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(RollingWriterError::RemoveArchiveFailed(
                    self.meta.archive_path.clone(),
                    err.to_string(),
                ));
            }
        }

        fs::rename(&self.meta.active_path, &self.meta.archive_path).map_err(|err| {
            RollingWriterError::ArchiveSwapFailed {
                from: self.meta.active_path.clone(),
                to: self.meta.archive_path.clone(),
                error: err.to_string(),
            }
        })
    }

    /// Append raw bytes to the active file, creating it (and its parent
    /// directory) if necessary. The handle is closed when this returns.
    fn append_to_active(&self, bytes: &[u8]) -> Result<(), RollingWriterError> {
        let mut file = self.meta.open_active_file()?;
        file.write_all(bytes).map_err(|err| {
            RollingWriterError::AppendFailed(self.meta.active_path.clone(), err.to_string())
        })
    }
}

impl RollingWriterMeta {
    /// Open the active file for appending.
    /// If the file does not exist it is created; if the parent directory
    /// does not exist it is created first and the open retried.
    fn open_active_file(&self) -> Result<fs::File, RollingWriterError> {
        let mut open_options = fs::OpenOptions::new();
        open_options.append(true).create(true);

        let mut open_res = open_options.open(&self.active_path);
        if open_res.is_err() {
            // Create the directory if it doesn't exist
            if let Some(parent) = self.active_path.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    RollingWriterError::CreateDirectoryFailed(parent.to_path_buf(), err.to_string())
                })?;
                open_res = open_options.open(&self.active_path);
            }
        }

        let file = open_res.map_err(|err| {
            RollingWriterError::CreateFileFailed(self.active_path.to_path_buf(), err.to_string())
        })?;

        self.set_permissions(&self.active_path)?;

        Ok(file)
    }

    /// Set the permissions for a file based on the configured file mode.
    ///
    /// Only has an effect when a file mode has been configured (via the
    /// `file_mode` builder option) and the target is a Unix-like operating
    /// system. On non-Unix systems a warning is printed and nothing is
    /// done, as the Unix permission model doesn't apply.
    fn set_permissions(&self, path: &Path) -> Result<(), RollingWriterError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                let perms = Permissions::from_mode(mode);
                fs::set_permissions(path, perms).map_err(|err| {
                    RollingWriterError::SetFilePermissionsError {
                        path: path.to_path_buf(),
                        error: err.to_string(),
                    }
                })?
            }
            #[cfg(not(unix))]
            {
                eprintln!(
                    "Warning: Setting file permissions is not supported on non-Unix platforms"
                );
            }
        }
        Ok(())
    }
}

/// Derive the archive path from the active path by inserting
/// [`ARCHIVE_MARKER`] before the last `.` of the file name
/// (`app.log` → `app_old.log`).
///
/// A file name without a usable extension gets the marker appended as a
/// plain suffix (`applog` → `applog_old`) instead of raising an error.
fn derive_archive_path(active_path: &Path) -> PathBuf {
    let file_name = active_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let archive_name = match file_name.rfind('.') {
        Some(idx) if idx > 0 => {
            format!("{}{}{}", &file_name[..idx], ARCHIVE_MARKER, &file_name[idx..])
        }
        _ => format!("{file_name}{ARCHIVE_MARKER}"),
    };
    active_path.with_file_name(archive_name)
}

/// Parse a `"<path>"` or `"<path>;<max-bytes>"` configuration string.
/// Only the last semicolon separates path from size; a missing or
/// unparsable size token silently falls back to the default.
fn parse_config(config: &str) -> (PathBuf, u64) {
    match config.rsplit_once(';') {
        Some((path, size_token)) => (
            PathBuf::from(path),
            size_token.parse::<u64>().unwrap_or(DEFAULT_MAX_SIZE_BYTES),
        ),
        None => (PathBuf::from(config), DEFAULT_MAX_SIZE_BYTES),
    }
}

/// Errors that can occur when using the rolling writer.
///
/// All variants are fail-fast: the writer performs no internal retry or
/// recovery, and the filesystem state stays consistent for a subsequent
/// call to retry the same logical operation.
#[derive(Debug, thiserror::Error)]
pub enum RollingWriterError {
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to create file '{0}': {1}")]
    CreateFileFailed(PathBuf, String),
    #[error("Failed to remove archive file '{0}': {1}")]
    RemoveArchiveFailed(PathBuf, String),
    #[error("Failed to archive file from '{from}' to '{to}': {error}")]
    ArchiveSwapFailed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
    #[error("Failed to append to file '{0}': {1}")]
    AppendFailed(PathBuf, String),
    #[error("File IO error: {0}")]
    FileIOError(#[from] std::io::Error),
    #[error("Failed to set file permissions for '{path}': {error}")]
    SetFilePermissionsError { path: PathBuf, error: String },
}

/// Provides a fluent interface for configuring RollingWriter instances.
///
/// Configuration options include:
///
/// * Size threshold - When to archive the active file
/// * Permissions - Set specific file permissions (Unix systems only)
///
/// # Default Configuration
///
/// If not explicitly configured, RollingWriter uses these defaults:
/// * 1,000,000-byte size threshold
/// * Standard file permissions
///
/// # Examples
///
/// Basic configuration:
/// ```rust
/// use logrollover::RollingWriterBuilder;
///
/// let writer = RollingWriterBuilder::new("./logs/app.log").build();
/// ```
///
/// Advanced configuration with multiple options:
/// ```rust
/// use logrollover::{MaxSize, RollingWriterBuilder};
///
/// let writer = RollingWriterBuilder::new("./logs/app.log")
///     .max_size(MaxSize::MB(100)) // Archive at 100MB
///     .file_mode(0o644)           // Owner can read/write, others can read
///     .build();
/// ```
pub struct RollingWriterBuilder {
    meta: RollingWriterMeta,
}

impl RollingWriterBuilder {
    /// Create a new rolling writer builder.
    /// # Arguments
    /// * `path` - The path of the active log file. The archive path is
    ///   derived from it by inserting `_old` before the extension.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let active_path = path.as_ref().to_path_buf();
        let archive_path = derive_archive_path(&active_path);
        RollingWriterBuilder {
            meta: RollingWriterMeta {
                active_path,
                archive_path,
                max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
                file_mode: None,
            },
        }
    }

    /// Set the size threshold past which the active file is archived.
    pub fn max_size(self, max_size: MaxSize) -> Self {
        Self {
            meta: RollingWriterMeta {
                max_size_bytes: max_size.bytes(),
                ..self.meta
            },
        }
    }

    /// Set the file permissions for the active log file (Unix-like systems
    /// only). This sets the file mode bits in octal notation like when
    /// using chmod. For example, 0o644 for rw-r--r-- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: RollingWriterMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Build the rolling writer.
    ///
    /// Construction touches no filesystem state; the active file is created
    /// by the first append, so an unwritable path surfaces as an error from
    /// the first write, not from here.
    pub fn build(self) -> RollingWriter {
        RollingWriter {
            meta: self.meta,
            state: Mutex::new(RollingWriterState { write_count: 0 }),
        }
    }
}

#[allow(clippy::io_other_error)]
impl io::Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock_state();
        self.record_write_and_maybe_archive(&mut state)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        self.append_to_active(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // No handle is held between writes; every append reaches the file
        // before the call returns.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc, tempfile::tempdir};

    fn writer_at(dir: &Path, name: &str, max_size_bytes: u64) -> RollingWriter {
        RollingWriterBuilder::new(dir.join(name))
            .max_size(MaxSize::Bytes(max_size_bytes))
            .build()
    }

    fn write_count(writer: &RollingWriter) -> u32 {
        writer.lock_state().write_count
    }

    /// Force the next write call to perform a physical size check.
    fn force_check_on_next_write(writer: &RollingWriter) {
        writer.lock_state().write_count = 0;
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn archive_path_derivation() {
        assert_eq!(
            derive_archive_path(Path::new("./logs/app.log")),
            PathBuf::from("./logs/app_old.log")
        );
        // Only the last dot is the extension separator.
        assert_eq!(
            derive_archive_path(Path::new("app.tar.log")),
            PathBuf::from("app.tar_old.log")
        );
        // No extension: marker appended as a plain suffix.
        assert_eq!(
            derive_archive_path(Path::new("./logs/applog")),
            PathBuf::from("./logs/applog_old")
        );
        assert_eq!(
            derive_archive_path(Path::new(".log")),
            PathBuf::from(".log_old")
        );
    }

    #[test]
    fn config_string_parsing() {
        assert_eq!(parse_config("app.log;500"), (PathBuf::from("app.log"), 500));
        assert_eq!(
            parse_config("app.log"),
            (PathBuf::from("app.log"), DEFAULT_MAX_SIZE_BYTES)
        );
        // Unparsable size token silently defaults.
        assert_eq!(
            parse_config("app.log;lots"),
            (PathBuf::from("app.log"), DEFAULT_MAX_SIZE_BYTES)
        );
        // Only the last semicolon separates path from size.
        assert_eq!(
            parse_config("odd;name.log;300"),
            (PathBuf::from("odd;name.log"), 300)
        );
    }

    #[test]
    fn from_config_resolves_path_size_and_archive() {
        let writer = RollingWriter::from_config(Some(r"C:\data\app.log;500"), "host");
        assert_eq!(writer.max_size_bytes(), 500);
        assert_eq!(
            writer.archive_path().to_string_lossy(),
            r"C:\data\app_old.log"
        );
    }

    #[test]
    fn from_config_empty_falls_back_to_temp_dir() {
        let writer = RollingWriter::from_config(None, "host");
        assert!(writer.active_path().starts_with(std::env::temp_dir()));
        assert_eq!(writer.max_size_bytes(), DEFAULT_MAX_SIZE_BYTES);

        let writer = RollingWriter::from_config(Some(""), "host");
        assert!(writer.active_path().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn write_appends_verbatim_without_terminator() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 1000);

        writer.write("X").unwrap();
        writer.write("Y").unwrap();
        assert_eq!(read(writer.active_path()), "XY");
    }

    #[test]
    fn write_line_terminator_precedes_text() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 1000);

        writer.write_line("hello").unwrap();
        assert_eq!(
            read(writer.active_path()),
            format!("{LINE_TERMINATOR}hello")
        );
    }

    #[test]
    fn write_creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let writer = writer_at(&dir.path().join("nested/deeper"), "app.log", 1000);

        writer.write("X").unwrap();
        assert_eq!(read(writer.active_path()), "X");
    }

    #[test]
    fn empty_write_counts_and_creates_file() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 1000);

        writer.write("").unwrap();
        assert!(writer.active_path().exists());
        assert_eq!(read(writer.active_path()), "");
        assert_eq!(write_count(&writer), 1);
    }

    #[test]
    fn noop_calls_touch_nothing_and_do_not_advance_counter() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 1000);

        for _ in 0..150 {
            writer.write_line("").unwrap();
            writer.write_line(None).unwrap();
            writer.write(None).unwrap();
        }
        assert!(!writer.active_path().exists());
        assert!(!writer.archive_path().exists());
        assert_eq!(write_count(&writer), 0);

        writer.write("A").unwrap();
        assert_eq!(write_count(&writer), 1);
        assert!(!writer.archive_path().exists());
        assert_eq!(read(writer.active_path()), "A");
    }

    #[test]
    fn no_archive_while_under_threshold() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 1000);

        for _ in 0..250 {
            writer.write("a").unwrap();
        }
        assert!(!writer.archive_path().exists());
        assert_eq!(read(writer.active_path()).len(), 250);
    }

    #[test]
    fn threshold_comparison_is_strict() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 5);

        fs::write(writer.active_path(), "12345").unwrap();
        force_check_on_next_write(&writer);
        writer.write("!").unwrap();
        assert!(!writer.archive_path().exists());
        assert_eq!(read(writer.active_path()), "12345!");
    }

    #[test]
    fn archive_swap_fires_on_the_hundredth_call_after_overflow() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 10);

        // Call 1 checks (file absent, nothing to archive) and overshoots
        // the threshold in one append.
        writer.write("0123456789AB").unwrap();
        // Calls 2..=100 fall between checks, so the oversized file keeps
        // growing without being archived.
        for _ in 0..99 {
            writer.write(".").unwrap();
        }
        assert!(!writer.archive_path().exists());

        // Call 101 is the next due check: the swap happens before the
        // append, so the new active file holds only this call's text.
        writer.write("Z").unwrap();
        let expected_archive = format!("0123456789AB{}", ".".repeat(99));
        assert_eq!(read(writer.archive_path()), expected_archive);
        assert_eq!(read(writer.active_path()), "Z");
    }

    #[test]
    fn active_file_absent_between_swap_and_append() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 4);

        fs::write(writer.active_path(), "too big").unwrap();
        let mut state = writer.lock_state();
        writer.record_write_and_maybe_archive(&mut state).unwrap();
        assert!(!writer.active_path().exists());
        assert_eq!(read(writer.archive_path()), "too big");
        assert_eq!(state.write_count, 1);
        drop(state);

        writer.write("X").unwrap();
        assert_eq!(read(writer.active_path()), "X");
    }

    #[test]
    fn second_swap_replaces_archive_instead_of_merging() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 4);

        fs::write(writer.active_path(), "first generation").unwrap();
        force_check_on_next_write(&writer);
        writer.write("a").unwrap();
        assert_eq!(read(writer.archive_path()), "first generation");

        fs::write(writer.active_path(), "second generation").unwrap();
        force_check_on_next_write(&writer);
        writer.write("b").unwrap();
        assert_eq!(read(writer.archive_path()), "second generation");
        assert_eq!(read(writer.active_path()), "b");
    }

    #[test]
    fn counter_normalizes_when_perturbed_past_interval() {
        let dir = tempdir().unwrap();
        let writer = writer_at(dir.path(), "app.log", 4);

        fs::write(writer.active_path(), "too big").unwrap();
        writer.lock_state().write_count = 7777;
        // The perturbed counter resets to 0 and the call performs a check.
        writer.write("X").unwrap();
        assert_eq!(read(writer.archive_path()), "too big");
        assert_eq!(write_count(&writer), 1);
    }

    #[test]
    fn io_write_routes_through_size_check() {
        let dir = tempdir().unwrap();
        let mut writer = writer_at(dir.path(), "app.log", 4);

        fs::write(writer.active_path(), "too big").unwrap();
        write!(writer, "via io::Write").unwrap();
        writer.flush().unwrap();
        assert_eq!(read(writer.archive_path()), "too big");
        assert_eq!(read(writer.active_path()), "via io::Write");
        assert_eq!(write_count(&writer), 1);
    }

    #[test]
    fn concurrent_writes_lose_no_bytes() {
        let dir = tempdir().unwrap();
        let writer = Arc::new(writer_at(dir.path(), "app.log", 1_000_000));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let writer = Arc::clone(&writer);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    writer.write("0123456789").unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(read(writer.active_path()).len(), 8 * 50 * 10);
        assert!(!writer.archive_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_applies_to_created_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let writer = RollingWriterBuilder::new(dir.path().join("app.log"))
            .file_mode(0o640)
            .build();

        writer.write("X").unwrap();
        let mode = fs::metadata(writer.active_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
