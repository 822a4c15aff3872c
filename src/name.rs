//! Naming policy for the active and archived log files.
//!
//! A single output path such as `/var/log/app/app.debug.log` is split into a
//! directory (`/var/log/app`), a base name (`app.debug`) and an extension
//! (`log`). The active segment is always written to `{base}.{extension}` and
//! archived segments embed their day between the two:
//! `{base}.2025-04-01.{extension}.gz`.
use {
    crate::{RollerError, GZIP_EXTENSION},
    chrono::NaiveDate,
    regex::Regex,
    std::path::{Path, PathBuf},
};

/// Date format embedded in archived file names.
pub(crate) const ROTATION_KEY_FORMAT: &str = "%Y-%m-%d";

/// Directory, base name and extension derived from the user supplied output
/// path. Immutable once derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    directory: PathBuf,
    base_name: String,
    extension: String,
}

impl OutputSpec {
    /// Derive the naming parts from an output path.
    ///
    /// The file name is split on `.`: the last part is the extension and
    /// every part before it is re-joined into the base name. A file name
    /// without any `.` has an empty extension, so the active file gets a
    /// trailing dot (`noext` is written as `noext.`).
    ///
    /// ```
    /// use rolling_log_helper::OutputSpec;
    ///
    /// let spec = OutputSpec::derive("/var/log/app/app.debug.log");
    /// assert_eq!(spec.base_name(), "app.debug");
    /// assert_eq!(spec.extension(), "log");
    /// ```
    pub fn derive<P: AsRef<Path>>(output: P) -> Self {
        let output = output.as_ref();
        let directory = output.parent().map(Path::to_path_buf).unwrap_or_default();
        let filename = output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut parts: Vec<&str> = filename.split('.').collect();
        // Trailing empty parts carry no name information: `app.log.` is `app.log`.
        while parts.last().is_some_and(|part| part.is_empty()) {
            parts.pop();
        }

        let (base_name, extension) = match parts.as_slice() {
            [] => (String::new(), String::new()),
            [only] => (only.to_string(), String::new()),
            [prefix @ .., extension] => (prefix.join("."), extension.to_string()),
        };

        OutputSpec {
            directory,
            base_name,
            extension,
        }
    }

    /// Directory holding every segment. Empty means the working directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory to scan for archives; `.` when the directory is empty.
    pub(crate) fn scan_directory(&self) -> &Path {
        if self.directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.directory
        }
    }

    /// File name of the active segment, `{base}.{extension}`.
    pub fn active_file_name(&self) -> String {
        format!("{}.{}", self.base_name, self.extension)
    }

    /// Path of the active segment. Rotation suffixes never apply to it.
    pub fn active_path(&self) -> PathBuf {
        self.directory.join(self.active_file_name())
    }

    /// Path of the archived segment for `key`, with `.gz` appended when the
    /// archive is compressed.
    pub fn archive_path(&self, key: NaiveDate, compressed: bool) -> PathBuf {
        let mut name = format!(
            "{}.{}.{}",
            self.base_name,
            key.format(ROTATION_KEY_FORMAT),
            self.extension
        );
        if compressed {
            name = format!("{}.{}", name, GZIP_EXTENSION);
        }
        self.directory.join(name)
    }

    /// Regex matching archived file names of this output, compressed or not.
    /// The first capture group holds the rotation key.
    pub(crate) fn archive_pattern(&self) -> Result<Regex, RollerError> {
        Regex::new(&format!(
            r"^{}\.(\d{{4}}-\d{{2}}-\d{{2}})\.{}(\.{})?$",
            regex::escape(&self.base_name),
            regex::escape(&self.extension),
            regex::escape(GZIP_EXTENSION),
        ))
        .map_err(|err| RollerError::InvalidPattern(err.to_string()))
    }

    /// Parse the rotation key out of an archived file name.
    pub(crate) fn parse_archive_key(pattern: &Regex, file_name: &str) -> Option<NaiveDate> {
        let captures = pattern.captures(file_name)?;
        NaiveDate::parse_from_str(captures.get(1)?.as_str(), ROTATION_KEY_FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn multi_part_name_keeps_leading_parts_in_base() {
        let spec = OutputSpec::derive("a.b.c.log");
        assert_eq!(spec.base_name(), "a.b.c");
        assert_eq!(spec.extension(), "log");
        assert_eq!(spec.directory(), Path::new(""));

        let spec = OutputSpec::derive("/var/log/app/app.debug.log");
        assert_eq!(spec.directory(), Path::new("/var/log/app"));
        assert_eq!(spec.base_name(), "app.debug");
        assert_eq!(spec.extension(), "log");
        assert_eq!(spec.active_path(), PathBuf::from("/var/log/app/app.debug.log"));
    }

    #[test]
    fn simple_name() {
        let spec = OutputSpec::derive("logs/app.log");
        assert_eq!(spec.base_name(), "app");
        assert_eq!(spec.extension(), "log");
        assert_eq!(spec.active_path(), PathBuf::from("logs/app.log"));
    }

    #[test]
    fn extensionless_name_keeps_trailing_dot() {
        let spec = OutputSpec::derive("noext");
        assert_eq!(spec.base_name(), "noext");
        assert_eq!(spec.extension(), "");
        assert_eq!(spec.active_file_name(), "noext.");
        assert_eq!(spec.active_path(), PathBuf::from("noext."));
        assert_eq!(
            spec.archive_path(day(2024, 1, 1), true),
            PathBuf::from("noext.2024-01-01..gz")
        );
    }

    #[test]
    fn trailing_and_inner_empty_parts() {
        let spec = OutputSpec::derive("app.log.");
        assert_eq!(spec.base_name(), "app");
        assert_eq!(spec.extension(), "log");

        let spec = OutputSpec::derive("a..b");
        assert_eq!(spec.base_name(), "a.");
        assert_eq!(spec.extension(), "b");

        let spec = OutputSpec::derive(".hidden");
        assert_eq!(spec.base_name(), "");
        assert_eq!(spec.extension(), "hidden");
    }

    #[test]
    fn archive_names_embed_the_day() {
        let spec = OutputSpec::derive("/tmp/x/app.log");
        assert_eq!(
            spec.archive_path(day(2025, 4, 1), true),
            PathBuf::from("/tmp/x/app.2025-04-01.log.gz")
        );
        assert_eq!(
            spec.archive_path(day(2025, 4, 1), false),
            PathBuf::from("/tmp/x/app.2025-04-01.log")
        );
    }

    #[test]
    fn archive_pattern_matches_only_own_archives() {
        let spec = OutputSpec::derive("app.debug.log");
        let pattern = spec.archive_pattern().unwrap();

        assert_eq!(
            OutputSpec::parse_archive_key(&pattern, "app.debug.2025-04-01.log.gz"),
            Some(day(2025, 4, 1))
        );
        assert_eq!(
            OutputSpec::parse_archive_key(&pattern, "app.debug.2025-04-01.log"),
            Some(day(2025, 4, 1))
        );
        // The dot in the base name is literal.
        assert!(!pattern.is_match("appXdebug.2025-04-01.log.gz"));
        assert!(!pattern.is_match("app.debug.log"));
        assert!(!pattern.is_match("other.2025-04-01.log.gz"));
        assert!(!pattern.is_match("app.debug.2025-04-01.txt.gz"));
    }
}
