//! Styled end-of-run output.
//!
//! `console` drops the colour codes when the stream is not a terminal.

use std::path::Path;

use console::Style;

use idlookup_core::runner::BatchSummary;

/// Summary line: counts marked ✓ when every lookup resolved and ⚠
/// otherwise, followed by the two report paths.
pub fn summary(summary: &BatchSummary, names: &Path, emails: &Path) -> String {
    let counts = format!("resolved {}, failed {}", summary.resolved, summary.failed());
    let (mark, style) = if summary.failed() == 0 {
        ("✓", Style::new().green())
    } else {
        ("⚠", Style::new().yellow())
    };
    let paths = format!("({}, {})", names.display(), emails.display());
    format!(
        "{} {} {}",
        style.apply_to(mark),
        counts,
        Style::new().dim().apply_to(paths)
    )
}

/// Fatal error line for stderr, with the full context chain.
pub fn fatal(err: &anyhow::Error) -> String {
    let style = Style::new().red().for_stderr();
    format!("{} Error: {:#}", style.apply_to("✗"), err)
}

#[cfg(test)]
mod tests {
    use idlookup_core::errors::LookupError;

    use super::*;

    fn plain(text: &str) -> String {
        console::strip_ansi_codes(text).into_owned()
    }

    #[test]
    fn test_summary_all_resolved() {
        let summary = BatchSummary {
            processed: 2,
            resolved: 2,
            ..Default::default()
        };
        let line = plain(&summary_line(&summary));
        assert_eq!(line, "✓ resolved 2, failed 0 (names.tmp, emails.tmp)");
    }

    #[test]
    fn test_summary_with_failures() {
        let summary = BatchSummary {
            processed: 3,
            resolved: 2,
            failures: vec![("ghost1".into(), LookupError::NotFound("ghost1".into()))],
            ..Default::default()
        };
        let line = plain(&summary_line(&summary));
        assert_eq!(line, "⚠ resolved 2, failed 1 (names.tmp, emails.tmp)");
    }

    #[test]
    fn test_fatal_shows_context_chain() {
        let err = anyhow::anyhow!("No such file or directory").context("failed to open ids.txt");
        let line = plain(&fatal(&err));
        assert_eq!(line, "✗ Error: failed to open ids.txt: No such file or directory");
    }

    fn summary_line(s: &BatchSummary) -> String {
        summary(s, Path::new("names.tmp"), Path::new("emails.tmp"))
    }
}
