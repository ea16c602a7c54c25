//! Line-synchronized name and email reports.
//!
//! Every resolved person produces exactly one line in each report, written
//! back to back and flushed together, so line N of the names report and line
//! N of the emails report always describe the same identifier, even when the
//! process is killed between two pairs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::errors::ReportError;
use crate::person::Person;

/// Writer for the paired names/emails reports.
pub struct ReportWriter<N: Write, E: Write> {
    names: N,
    emails: E,
    lines: usize,
}

impl ReportWriter<BufWriter<File>, BufWriter<File>> {
    /// Create (or truncate) both report files.
    pub fn create(names_path: &Path, emails_path: &Path) -> Result<Self, ReportError> {
        let names = create_file(names_path)?;
        let emails = create_file(emails_path)?;
        info!(
            names = %names_path.display(),
            emails = %emails_path.display(),
            "opened report files"
        );
        Ok(Self::new(BufWriter::new(names), BufWriter::new(emails)))
    }
}

impl<N: Write, E: Write> ReportWriter<N, E> {
    pub fn new(names: N, emails: E) -> Self {
        Self {
            names,
            emails,
            lines: 0,
        }
    }

    /// Append one line to each report for `person` and flush both.
    pub fn write_pair(&mut self, person: &Person) -> Result<(), ReportError> {
        writeln!(self.names, "{}", person.name_line())?;
        writeln!(self.emails, "{}", person.mail)?;
        self.names.flush()?;
        self.emails.flush()?;
        self.lines += 1;
        debug!(line = self.lines, identifier = %person.identifier, "wrote report lines");
        Ok(())
    }

    /// Number of line pairs written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush both reports and hand back the underlying writers.
    pub fn finish(mut self) -> Result<(N, E), ReportError> {
        self.names.flush()?;
        self.emails.flush()?;
        debug!(lines = self.lines, "flushed report files");
        Ok((self.names, self.emails))
    }
}

fn create_file(path: &Path) -> Result<File, ReportError> {
    File::create(path).map_err(|source| ReportError::Output {
        path: path.display().to_string(),
        source,
    })
}
