//! File operations that tolerate transient failures
//!
//! Dependency payloads are frequently read from shares that other build
//! agents are writing to at the same time. Create, copy, move and rename are
//! therefore retried a bounded number of times with a fixed delay before the
//! failure is reported.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use backoff::backoff::Backoff;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::{Error, NormalizedPath, Result};

/// Retry and durability knobs for file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustnessConfig {
    /// How many times a transiently failing operation is retried.
    pub retry_attempts: u32,
    /// Fixed delay between two attempts.
    #[serde(with = "millis")]
    pub retry_delay: Duration,
    /// Whether atomic writes are flushed to disk before the rename.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay: Duration::from_millis(250),
            enable_fsync: true,
        }
    }
}

impl RobustnessConfig {
    /// No retries and no delay. Used by tests that expect errors to surface
    /// immediately.
    pub fn no_retry() -> Self {
        Self {
            retry_attempts: 0,
            retry_delay: Duration::ZERO,
            enable_fsync: false,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Fixed-delay policy that gives up after a set number of retries.
struct FixedRetry {
    delay: Duration,
    remaining: u32,
}

impl Backoff for FixedRetry {
    fn reset(&mut self) {}

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

/// Whether an I/O error is worth retrying.
///
/// Sharing violations and lock conflicts surface as permission or busy
/// errors depending on the platform.
pub fn is_transient(err: &std::io::Error) -> bool {
    if matches!(
        err.kind(),
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
            | ErrorKind::ResourceBusy
            | ErrorKind::PermissionDenied
    ) {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// Run `op` retrying transient failures according to `config`.
///
/// Permanent failures are returned as [`Error::Io`] right away; a transient
/// failure that persists past the budget becomes [`Error::RetriesExhausted`]
/// carrying the last cause.
pub fn with_retry<T>(
    config: RobustnessConfig,
    path: &Path,
    mut op: impl FnMut() -> std::io::Result<T>,
) -> Result<T> {
    let policy = FixedRetry {
        delay: config.retry_delay,
        remaining: config.retry_attempts,
    };
    let mut attempts = 0u32;

    let outcome = backoff::retry_notify(
        policy,
        || {
            attempts += 1;
            op().map_err(|e| {
                if is_transient(&e) {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        },
        |err: std::io::Error, delay: Duration| {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                ?delay,
                "Transient I/O failure, retrying"
            );
        },
    );

    outcome.map_err(|err| match err {
        backoff::Error::Permanent(source) => Error::io(path, source),
        backoff::Error::Transient { err, .. } => Error::RetriesExhausted {
            path: path.to_path_buf(),
            attempts,
            source: err,
        },
    })
}

/// Create a directory and all missing parents.
pub fn create_dir_all(path: &Path, config: RobustnessConfig) -> Result<()> {
    with_retry(config, path, || fs::create_dir_all(path))
}

/// Write `content` to `path`, replacing any existing file.
pub fn write_file(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    with_retry(config, path, || fs::write(path, content))
}

/// Copy a file, carrying the source last-write time over to the copy.
///
/// Keeping the timestamp lets a later relocation of the copy compare it
/// against the state recorded for the original.
pub fn copy_file(source: &Path, dest: &Path, config: RobustnessConfig) -> Result<u64> {
    let modified = last_write_time(source)?;
    with_retry(config, dest, || {
        let bytes = fs::copy(source, dest)?;
        let file = OpenOptions::new().write(true).open(dest)?;
        file.set_modified(modified)?;
        Ok(bytes)
    })
}

/// Move a file, replacing a same-named destination outright.
///
/// Falls back to copy-then-delete when source and destination live on
/// different devices.
pub fn move_file(source: &Path, dest: &Path, config: RobustnessConfig) -> Result<()> {
    with_retry(config, dest, || {
        if dest.is_file() {
            fs::remove_file(dest)?;
        }
        match fs::rename(source, dest) {
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                let modified = fs::metadata(source)?.modified()?;
                fs::copy(source, dest)?;
                OpenOptions::new()
                    .write(true)
                    .open(dest)?
                    .set_modified(modified)?;
                fs::remove_file(source)
            }
            other => other,
        }
    })
}

/// Rename a whole directory to a destination that must not exist yet.
pub fn rename_dir(source: &Path, dest: &Path, config: RobustnessConfig) -> Result<()> {
    with_retry(config, dest, || fs::rename(source, dest))
}

/// Last-write timestamp of a file.
pub fn last_write_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(path, e))
}

/// Canonicalize a path without the Windows verbatim prefix.
pub fn canonicalize(path: &Path) -> Result<std::path::PathBuf> {
    dunce::canonicalize(path).map_err(|e| Error::io(path, e))
}

/// Replace the file at `path` with `content` in one step.
///
/// The content goes to a sibling temp file that is renamed over the target
/// while an advisory lock on `<name>.lock` is held, so concurrent writers of
/// the same watermark file serialize and readers never see a partial file.
pub fn write_atomic(
    path: &NormalizedPath,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    let target = path.to_native();
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent, config)?;
    }

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = target.with_file_name(format!(".{name}.{}.tmp", std::process::id()));
    let lock_path = target.with_file_name(format!("{name}.lock"));

    let lock_file = with_retry(config, &lock_path, || {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
    })?;
    with_retry(config, &lock_path, || lock_file.try_lock_exclusive())
        .map_err(|_| Error::LockFailed { path: target.clone() })?;

    let staged = File::create(&temp_path).and_then(|mut temp| {
        temp.write_all(content)?;
        if config.enable_fsync {
            temp.sync_all()?;
        }
        Ok(())
    });
    let outcome = match staged {
        Ok(()) => with_retry(config, &target, || fs::rename(&temp_path, &target)),
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(Error::io(&temp_path, e))
        }
    };

    let _ = FileExt::unlock(&lock_file);
    outcome
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(&native, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn fast_retry(attempts: u32) -> RobustnessConfig {
        RobustnessConfig {
            retry_attempts: attempts,
            retry_delay: Duration::from_millis(1),
            enable_fsync: false,
        }
    }

    #[test]
    fn transient_failure_is_retried_until_success() {
        let calls = Cell::new(0);
        let result = with_retry(fast_retry(3), Path::new("x"), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(std::io::Error::from(ErrorKind::WouldBlock))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausted_retries_carry_original_cause() {
        let result: Result<()> = with_retry(fast_retry(2), Path::new("busy.txt"), || {
            Err(std::io::Error::from(ErrorKind::ResourceBusy))
        });
        match result {
            Err(Error::RetriesExhausted { attempts, source, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source.kind(), ErrorKind::ResourceBusy);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(fast_retry(5), Path::new("missing"), || {
            calls.set(calls.get() + 1);
            Err(std::io::Error::from(ErrorKind::NotFound))
        });
        assert!(matches!(result, Err(Error::Io { .. })));
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn copy_file_preserves_last_write_time() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "payload").unwrap();
        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        OpenOptions::new().write(true).open(&src).unwrap().set_modified(past).unwrap();

        copy_file(&src, &dst, fast_retry(0)).unwrap();

        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
        assert_eq!(last_write_time(&dst).unwrap(), past);
    }

    #[test]
    fn move_file_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("new.txt");
        let dst = dir.path().join("old.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        move_file(&src, &dst, fast_retry(0)).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("state.json");
        let path = NormalizedPath::new(&target);

        write_atomic(&path, b"{}", fast_retry(0)).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
