use crate::error::MonitorError;
use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::PathBuf,
};

/// Where report lines are written.
#[derive(Default)]
pub enum Output {
    /// Standard output.
    #[default]
    Stdout,
    /// A file, created or truncated when the monitor starts.
    File(PathBuf),
    /// Any writer, e.g. a socket or an in-memory buffer.
    Writer(Box<dyn Write + Send>),
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("Stdout"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

impl Output {
    /// Opens the destination, held open until the reporter stops.
    ///
    /// # Errors
    /// Returns [`MonitorError::SinkCreation`] if the file cannot be created.
    pub fn open(self) -> Result<Box<dyn Write + Send>, MonitorError> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout())),
            Self::File(path) => match File::create(&path) {
                Ok(file) => Ok(Box::new(file)),
                Err(source) => Err(MonitorError::SinkCreation { path, source }),
            },
            Self::Writer(writer) => Ok(writer),
        }
    }
}

/// Writes one report per line, optionally framed with a local timestamp.
pub struct ReportWriter {
    out: Box<dyn Write + Send>,
    timestamps: bool,
}

impl ReportWriter {
    pub fn new(out: Box<dyn Write + Send>, timestamps: bool) -> Self {
        Self { out, timestamps }
    }

    /// Writes `report` followed by a newline and flushes.
    ///
    /// # Errors
    /// Returns any IO error from the underlying writer.
    pub fn write_line(&mut self, report: &str) -> io::Result<()> {
        if self.timestamps {
            let now = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
            write!(self.out, "{now} ")?;
        }
        self.out.write_all(report.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
