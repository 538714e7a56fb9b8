//! Types for standardized reports to the user about a command run.
//!
//! Commands never fail on recoverable, per-gene problems; instead they record
//! how many genes were skipped, dropped or excluded in a [`Report`], which the
//! binary shows the user once the command is done.
//!

use crate::coverage::{Direction, ProfileSummary};
use crate::decode::DecodeCounter;

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn value(&self) -> &U {
        &self.value
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_parts(self) -> (U, Report) {
        (self.value, self.report)
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Clone, Debug, Default)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    /// Add an issue for every kind of skipped gene in `counter`.
    pub fn add_decode_counts(&mut self, direction: Direction, counter: &DecodeCounter) {
        let skipped = [
            (counter.skipped_notexpressed, "not expressed"),
            (counter.skipped_empty, "without usable coverage"),
            (counter.skipped_error, "failing to decode"),
        ];
        for (count, reason) in skipped {
            if count > 0 {
                self.add_issue(format!(
                    "{}: {} of {} genes skipped as {}",
                    direction, count, counter.input, reason
                ));
            }
        }
    }

    /// Add an issue for every kind of row dropped before estimation.
    pub fn add_profile_summary(&mut self, direction: Direction, summary: &ProfileSummary) {
        let dropped = [
            (summary.incomplete, "incomplete"),
            (summary.all_zero, "all zero"),
        ];
        for (count, reason) in dropped {
            if count > 0 {
                self.add_issue(format!(
                    "{}: {} of {} rows dropped as {}",
                    direction, count, summary.rows, reason
                ));
            }
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_counts() {
        let counter = DecodeCounter {
            input: 10,
            skipped_notexpressed: 3,
            skipped_empty: 0,
            skipped_error: 1,
            success: 6,
        };
        let mut report = Report::new();
        assert!(report.is_empty());
        report.add_decode_counts(Direction::Upstream, &counter);
        assert_eq!(
            report.entries(),
            &[
                "upstream: 3 of 10 genes skipped as not expressed".to_string(),
                "upstream: 1 of 10 genes skipped as failing to decode".to_string(),
            ]
        );
    }

    #[test]
    fn test_profile_summary() {
        let mut report = Report::new();
        report.add_profile_summary(
            Direction::Downstream,
            &ProfileSummary {
                rows: 12,
                incomplete: 2,
                all_zero: 1,
                profiles: 9,
            },
        );
        assert_eq!(
            report.entries(),
            &[
                "downstream: 2 of 12 rows dropped as incomplete".to_string(),
                "downstream: 1 of 12 rows dropped as all zero".to_string(),
            ]
        );

        let mut report = Report::new();
        report.add_profile_summary(
            Direction::Upstream,
            &ProfileSummary {
                rows: 3,
                profiles: 3,
                ..Default::default()
            },
        );
        assert!(report.is_empty());
    }
}
