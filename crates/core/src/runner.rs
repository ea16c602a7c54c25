//! Batch lookup runner.
//!
//! Reads identifiers one per line, resolves each through a
//! [`DirectoryClient`], and appends a line pair to the reports for every
//! identifier that resolves. Lookup failures are reported to the console and
//! skipped; only input/output errors abort the batch.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{AttributeNames, OutputConfig};
use crate::directory::DirectoryClient;
use crate::errors::{LookupError, ReportError};
use crate::person::Person;
use crate::report::ReportWriter;

/// Result of resolving a single identifier.
#[derive(Debug)]
pub enum LookupOutcome {
    Resolved(Person),
    Failed {
        identifier: String,
        reason: LookupError,
    },
}

/// Totals for one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Non-blank identifiers looked up.
    pub processed: usize,
    pub resolved: usize,
    /// Blank input lines that were skipped.
    pub skipped_blank: usize,
    /// Identifiers that failed, with the reason.
    pub failures: Vec<(String, LookupError)>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Sequential batch runner over a directory client.
pub struct BatchRunner<D> {
    client: D,
    attributes: AttributeNames,
}

impl<D: DirectoryClient> BatchRunner<D> {
    pub fn new(client: D, attributes: AttributeNames) -> Self {
        Self { client, attributes }
    }

    /// Look up `identifier` and reduce the entry to a [`Person`].
    pub async fn resolve(&mut self, identifier: &str) -> LookupOutcome {
        let result = match self.client.lookup(identifier).await {
            Ok(record) => Person::from_record(identifier, &record, &self.attributes),
            Err(e) => Err(e),
        };
        match result {
            Ok(person) => LookupOutcome::Resolved(person),
            Err(reason) => LookupOutcome::Failed {
                identifier: identifier.to_string(),
                reason,
            },
        }
    }

    /// Run the batch over an already-open input and report writer.
    ///
    /// `input_name` labels read errors. Lines that are not valid UTF-8 are
    /// decoded lossily and looked up like any other identifier. Progress
    /// lines and failure diagnostics go to `console`.
    pub async fn run<R, N, E, C>(
        &mut self,
        mut input: R,
        input_name: &str,
        report: &mut ReportWriter<N, E>,
        console: &mut C,
    ) -> Result<BatchSummary, ReportError>
    where
        R: BufRead,
        N: Write,
        E: Write,
        C: Write,
    {
        let mut summary = BatchSummary::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .map_err(|source| ReportError::Input {
                    path: input_name.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                warn!(line = %line.trim_end(), "input line is not valid UTF-8, decoded lossily");
            }
            let identifier = line.trim_end();
            if identifier.is_empty() {
                debug!("skipping blank input line");
                summary.skipped_blank += 1;
                continue;
            }
            summary.processed += 1;

            match self.resolve(identifier).await {
                LookupOutcome::Resolved(person) => {
                    report.write_pair(&person)?;
                    writeln!(console, "{} {}", person.name_line(), person.mail)?;
                    summary.resolved += 1;
                }
                LookupOutcome::Failed { identifier, reason } => {
                    warn!(%identifier, error = %reason, "lookup failed, skipping");
                    writeln!(console, "failed to get directory info for {identifier}: {reason}")?;
                    writeln!(console, "{}", reason.status())?;
                    if let Some(output) = reason.output() {
                        writeln!(console, "{output}")?;
                    }
                    summary.failures.push((identifier, reason));
                }
            }
        }

        if let Err(e) = self.client.close().await {
            warn!(error = %e, "failed to close directory client");
        }

        info!(
            processed = summary.processed,
            resolved = summary.resolved,
            failed = summary.failed(),
            "batch finished"
        );
        Ok(summary)
    }

    /// Open `input_path` and the report files named in `output`, then run
    /// the batch. The input is opened first; nothing is created if it is
    /// unreadable.
    pub async fn run_file<C: Write>(
        &mut self,
        input_path: &Path,
        output: &OutputConfig,
        console: &mut C,
    ) -> Result<BatchSummary, ReportError> {
        let input = File::open(input_path).map_err(|source| ReportError::Input {
            path: input_path.display().to_string(),
            source,
        })?;
        info!(input = %input_path.display(), "reading identifiers");

        let mut report = ReportWriter::create(&output.names_file, &output.emails_file)?;
        let input_name = input_path.display().to_string();
        let summary = self
            .run(BufReader::new(input), &input_name, &mut report, console)
            .await;
        // Flush what was written even when the batch stopped early.
        let flushed = report.finish();
        let summary = summary?;
        flushed?;
        Ok(summary)
    }

    pub fn client(&self) -> &D {
        &self.client
    }

    pub fn into_client(self) -> D {
        self.client
    }
}
