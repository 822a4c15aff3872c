//! Keeps a stable path pointing at the active log file.
use {
    std::{
        fs, io,
        path::{Path, PathBuf},
    },
    tracing::{debug, warn},
};

/// Minimum time between two filesystem checks of the link.
pub const RELINK_INTERVAL_MILLIS: i64 = 60_000;

/// Capability invoked by [`crate::RollingWriter`] after every rotation check,
/// with the absolute path of the active file and the write instant in epoch
/// milliseconds.
pub trait ActiveFileObserver {
    fn active_file(&mut self, active: &Path, now_millis: i64);
}

/// What a relink pass did to the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The target already links to the active file.
    Current,
    /// No link existed and one was created.
    Created,
    /// A stale link was removed and recreated.
    Replaced,
    /// Something other than a symlink occupies the target; left alone.
    Occupied,
}

/// Maintains a symbolic link at `target` pointing to the active file.
///
/// The check is throttled to once per [`RELINK_INTERVAL_MILLIS`] no matter how
/// often it is invoked, and failures are only logged.
#[derive(Debug)]
pub struct LinkMaintainer {
    target: PathBuf,
    last_checked_at_millis: Option<i64>,
}

impl LinkMaintainer {
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        LinkMaintainer {
            target: target.as_ref().to_path_buf(),
            last_checked_at_millis: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Check the link if the throttle window has elapsed.
    ///
    /// Returns `true` when the filesystem was consulted. The check time is
    /// recorded even when the check fails.
    pub fn maybe_relink(&mut self, active: &Path, now_millis: i64) -> bool {
        if let Some(last) = self.last_checked_at_millis {
            if now_millis - last <= RELINK_INTERVAL_MILLIS {
                return false;
            }
        }
        self.last_checked_at_millis = Some(now_millis);

        match self.relink(active) {
            Ok(LinkOutcome::Current) => {}
            Ok(outcome) => debug!(
                link = %self.target.display(),
                active = %active.display(),
                ?outcome,
                "link checked"
            ),
            Err(err) => warn!(
                "Failed to link '{}' to '{}': {}",
                self.target.display(),
                active.display(),
                err
            ),
        }
        true
    }

    fn relink(&self, active: &Path) -> io::Result<LinkOutcome> {
        let replaced = match fs::symlink_metadata(&self.target) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                if points_to(&self.target, active) {
                    return Ok(LinkOutcome::Current);
                }
                fs::remove_file(&self.target)?;
                true
            }
            Ok(_) => return Ok(LinkOutcome::Occupied),
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(err),
        };

        create_symlink(active, &self.target)?;
        Ok(if replaced {
            LinkOutcome::Replaced
        } else {
            LinkOutcome::Created
        })
    }
}

impl ActiveFileObserver for LinkMaintainer {
    fn active_file(&mut self, active: &Path, now_millis: i64) {
        self.maybe_relink(active, now_millis);
    }
}

/// Whether `link` resolves to the same file as `active`. A dangling link never
/// does.
fn points_to(link: &Path, active: &Path) -> bool {
    match (fs::canonicalize(link), fs::canonicalize(active)) {
        (Ok(resolved), Ok(active)) => resolved == active,
        _ => false,
    }
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn create_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use {super::*, tempfile::TempDir};

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn first_call_creates_link() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "x").unwrap();
        let target = dir.path().join("current.log");

        let mut links = LinkMaintainer::new(&target);
        assert!(links.maybe_relink(&active, T0));
        assert!(fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&target).unwrap(), active);
    }

    #[test]
    fn checks_are_throttled_to_once_per_minute() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "x").unwrap();
        let target = dir.path().join("current.log");

        let mut links = LinkMaintainer::new(&target);
        assert!(links.maybe_relink(&active, T0));

        // Someone removes the link; the next call inside the window must not notice.
        fs::remove_file(&target).unwrap();
        assert!(!links.maybe_relink(&active, T0 + 59_999));
        assert!(!links.maybe_relink(&active, T0 + RELINK_INTERVAL_MILLIS));
        assert!(fs::symlink_metadata(&target).is_err());

        assert!(links.maybe_relink(&active, T0 + RELINK_INTERVAL_MILLIS + 1));
        assert_eq!(fs::read_link(&target).unwrap(), active);
    }

    #[test]
    fn stale_link_is_replaced() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "x").unwrap();
        let target = dir.path().join("current.log");
        std::os::unix::fs::symlink(dir.path().join("gone.log"), &target).unwrap();

        let mut links = LinkMaintainer::new(&target);
        assert_eq!(links.relink(&active).unwrap(), LinkOutcome::Replaced);
        assert_eq!(fs::read_link(&target).unwrap(), active);
        assert_eq!(links.relink(&active).unwrap(), LinkOutcome::Current);
        assert!(links.maybe_relink(&active, T0));
    }

    #[test]
    fn link_to_another_existing_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.log");
        let active = dir.path().join("app.log");
        fs::write(&old, "old").unwrap();
        fs::write(&active, "new").unwrap();
        let target = dir.path().join("current.log");
        std::os::unix::fs::symlink(&old, &target).unwrap();

        let mut links = LinkMaintainer::new(&target);
        assert!(links.maybe_relink(&active, T0));
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(fs::read_to_string(&old).unwrap(), "old");
    }

    #[test]
    fn regular_file_at_target_is_never_touched() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "x").unwrap();
        let target = dir.path().join("current.log");
        fs::write(&target, "precious").unwrap();

        let mut links = LinkMaintainer::new(&target);
        for step in 0..5 {
            links.maybe_relink(&active, T0 + step * 2 * RELINK_INTERVAL_MILLIS);
        }
        assert!(!fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "precious");
        assert_eq!(links.relink(&active).unwrap(), LinkOutcome::Occupied);
    }

    #[test]
    fn failures_still_advance_the_throttle() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "x").unwrap();
        // Parent directory does not exist, so creating the link fails.
        let target = dir.path().join("missing").join("current.log");

        let mut links = LinkMaintainer::new(&target);
        assert!(links.maybe_relink(&active, T0));
        assert!(!links.maybe_relink(&active, T0 + 1_000));
    }
}
