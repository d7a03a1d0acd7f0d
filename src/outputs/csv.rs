use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::report::{render, WindowReport};
use crate::kernel::time;

/// Same-minute exports get `_1`, `_2`, ... up to this many suffixes.
const MAX_SUFFIX: u32 = 999;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("export lost: {primary_path} ({primary}), fallback {fallback_path} ({fallback})")]
    WriteFailed {
        primary_path: PathBuf,
        primary: io::Error,
        fallback_path: PathBuf,
        fallback: io::Error,
    },
}

#[derive(Debug)]
pub enum SinkOutcome {
    Written(PathBuf),
    /// The configured location was unwritable; the export landed in the fallback directory.
    Fallback { path: PathBuf, primary_error: io::Error },
}

impl SinkOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SinkOutcome::Written(path) => path,
            SinkOutcome::Fallback { path, .. } => path,
        }
    }
}

/// Persists completed windows. Called off the polling task, so it may block.
pub trait Sink: Send + Sync + 'static {
    fn write(&self, report: &WindowReport) -> Result<SinkOutcome, SinkError>;
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
    fallback_dir: PathBuf,
    prefix: String,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            fallback_dir: PathBuf::from("."),
            prefix: prefix.into(),
        }
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = dir.into();
        self
    }

    /// e.g. `lahma_1989-11-09_1111`; an existing export is never overwritten,
    /// later ones in the same minute become `lahma_1989-11-09_1111_1.csv`.
    pub fn file_stem(&self, report: &WindowReport) -> String {
        format!("{}_{}", self.prefix, time::export_key(&report.flushed_at))
    }
}

fn write_new(dir: &Path, stem: &str, contents: &str) -> io::Result<PathBuf> {
    for n in 0..=MAX_SUFFIX {
        let path = if n == 0 {
            dir.join(format!("{}.csv", stem))
        } else {
            dir.join(format!("{}_{}.csv", stem, n))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} exports named {} already exist", MAX_SUFFIX + 1, stem),
    ))
}

impl Sink for CsvSink {
    fn write(&self, report: &WindowReport) -> Result<SinkOutcome, SinkError> {
        let stem = self.file_stem(report);
        let contents = render(report);

        let primary = match write_new(&self.output_dir, &stem, &contents) {
            Ok(path) => return Ok(SinkOutcome::Written(path)),
            Err(e) => e,
        };

        match write_new(&self.fallback_dir, &stem, &contents) {
            Ok(path) => Ok(SinkOutcome::Fallback {
                path,
                primary_error: primary,
            }),
            Err(fallback) => Err(SinkError::WriteFailed {
                primary_path: self.output_dir.join(format!("{}.csv", stem)),
                primary,
                fallback_path: self.fallback_dir.join(format!("{}.csv", stem)),
                fallback,
            }),
        }
    }
}
