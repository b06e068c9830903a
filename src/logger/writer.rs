//! Log sinks
//!
//! Two process-wide sinks, set once by [`init`]: one for access and
//! lifecycle lines, one for warnings and errors. Each is a console stream
//! unless a file path is configured.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static SINKS: OnceLock<LogWriter> = OnceLock::new();

enum Sink {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl Sink {
    fn open(path: Option<&str>, console: Self) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Self::File(Mutex::new(open_append(Path::new(path))?))),
            None => Ok(console),
        }
    }

    fn line(&self, message: &str) {
        let _ = match self {
            Self::Stdout => writeln!(io::stdout().lock(), "{message}"),
            Self::Stderr => writeln!(io::stderr().lock(), "{message}"),
            Self::File(file) => match file.lock() {
                Ok(mut f) => writeln!(f, "{message}"),
                Err(_) => Ok(()),
            },
        };
    }
}

/// Access and error sinks
pub struct LogWriter {
    access: Sink,
    error: Sink,
}

impl LogWriter {
    fn open(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access: Sink::open(access_log_file, Sink::Stdout)?,
            error: Sink::open(error_log_file, Sink::Stderr)?,
        })
    }

    pub fn write_access(&self, message: &str) {
        self.access.line(message);
    }

    pub fn write_error(&self, message: &str) {
        self.error.line(message);
    }
}

/// Open for appending, creating the file and its parent directories
fn open_append(path: &Path) -> io::Result<File> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
        _ => {}
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the process-wide sinks
///
/// Fails if a log file cannot be opened or the sinks are already set.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::open(access_log_file, error_log_file)?;
    let already_set = io::Error::new(io::ErrorKind::AlreadyExists, "logger already initialized");
    SINKS.set(writer).map_err(|_| already_set)
}

/// The installed sinks, if [`init`] has run
pub fn get() -> Option<&'static LogWriter> {
    SINKS.get()
}
