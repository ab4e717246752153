/// Logging collaborator handed to every component that reports progress.
///
/// Constructed once in `cli::run` and passed by reference; there is no
/// global logger. INFO lines go to stdout and can be silenced with
/// `--quiet`, WARN and ERROR always go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("INFO: {}", message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("WARN: {}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("ERROR: {}", message.as_ref());
    }
}
