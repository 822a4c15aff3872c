use {
    crate::{RollerError, RollingWriter},
    chrono::{DateTime, FixedOffset},
    std::io::BufRead,
    tracing::info,
};

/// Prefix rendered in front of every line.
pub const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S] ";

/// Reads lines from `reader` and appends each one, timestamped, to a
/// [`RollingWriter`].
pub struct LineSink<R> {
    reader: R,
    console: bool,
}

impl<R: BufRead> LineSink<R> {
    pub fn new(reader: R) -> Self {
        LineSink { reader, console: false }
    }

    /// Also emit every rendered line as an info event on the diagnostic
    /// console.
    pub fn console(self, console: bool) -> Self {
        Self { console, ..self }
    }

    /// Render `line` with the timestamp prefix for `at`.
    pub fn stamp(line: &str, at: &DateTime<FixedOffset>) -> String {
        format!("{}{}", at.format(TIMESTAMP_FORMAT), line)
    }

    /// Forward lines until the end of input. Returns the number of lines
    /// written.
    pub fn run(&mut self, writer: &mut RollingWriter) -> Result<u64, RollerError> {
        let mut buf = Vec::new();
        let mut lines = 0;
        loop {
            buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut buf)
                .map_err(RollerError::ReadFailed)?;
            if read == 0 {
                return Ok(lines);
            }

            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            let now = writer.now();
            let stamped = Self::stamp(&line, &now);
            if self.console {
                info!("{}", stamped);
            }
            writer.write_line(&stamped, now)?;
            lines += 1;
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{OutputSpec, RollingWriterBuilder, TimeZone},
        chrono::TimeZone as _,
        std::{fs, io::Cursor},
        tempfile::TempDir,
    };

    #[test]
    fn stamp_uses_fixed_prefix() {
        let at = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap();
        assert_eq!(LineSink::<&[u8]>::stamp("hello", &at), "[2024-03-09 07:05:01] hello");
    }

    #[test]
    fn line_endings_are_trimmed() {
        assert_eq!(trim_line_ending(b"a\r\n"), b"a");
        assert_eq!(trim_line_ending(b"a\n"), b"a");
        assert_eq!(trim_line_ending(b"a"), b"a");
        assert_eq!(trim_line_ending(b"a\r\r\n"), b"a\r");
    }

    #[test]
    fn forwards_every_line_including_an_unterminated_last_one() {
        let dir = TempDir::new().unwrap();
        let mut writer = RollingWriterBuilder::new(OutputSpec::derive(dir.path().join("in.txt")))
            .time_zone(TimeZone::UTC)
            .build()
            .unwrap();

        let input = Cursor::new(b"one\r\n\ntwo \xff\nthree".to_vec());
        let lines = LineSink::new(input).run(&mut writer).unwrap();
        assert_eq!(lines, 4);

        let written = fs::read_to_string(dir.path().join("in.txt")).unwrap();
        let bodies: Vec<&str> = written
            .lines()
            .map(|line| &line["[0000-00-00 00:00:00] ".len()..])
            .collect();
        assert_eq!(bodies, vec!["one", "", "two \u{fffd}", "three"]);
    }
}
