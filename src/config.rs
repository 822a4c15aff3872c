use {
    crate::{OutputSpec, RollerError, RollingWriter, RollingWriterBuilder, TimeZone},
    std::path::{Path, PathBuf},
};

/// Settings of one helper run, fixed once the command line is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    output: PathBuf,
    console: bool,
    link: bool,
}

impl HelperConfig {
    pub fn new<P: AsRef<Path>>(output: P, console: bool, link: bool) -> Self {
        HelperConfig {
            output: output.as_ref().to_path_buf(),
            console,
            link,
        }
    }

    /// The path given on the command line. Also the link location.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether lines are mirrored to the diagnostic console.
    pub fn console(&self) -> bool {
        self.console
    }

    pub fn link(&self) -> bool {
        self.link
    }

    pub fn output_spec(&self) -> OutputSpec {
        OutputSpec::derive(&self.output)
    }

    /// Daily rotation in local time, gzip archives, the default retention,
    /// and a link at the output path when linking is enabled.
    pub fn build_writer(&self) -> Result<RollingWriter, RollerError> {
        let builder = RollingWriterBuilder::new(self.output_spec()).time_zone(TimeZone::Local);
        let builder = if self.link { builder.link(&self.output) } else { builder };
        builder.build()
    }
}
