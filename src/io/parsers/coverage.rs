//! Binned read-coverage tables, as written by the read extension step.
//!
//! The format follows R's `read.table(header = TRUE, fill = TRUE, row.names = 1)`:
//!
//!  - whitespace separated, `#` starts a comment line;
//!  - the header line may or may not name the row-name (gene ID) column;
//!  - after the gene ID, the columns are `utr` (known UTR length), `exon`
//!    (log10-scaled terminal exon coverage), then one column per bin;
//!  - rows shorter than the header are padded with missing values, and `NA`
//!    style tokens are missing values.
//!

use std::io::{BufRead, BufReader, Lines, Read};
use std::iter::Enumerate;
use std::path::PathBuf;

use super::parse_optional_column;
use crate::error::UtrExtError;
use crate::io::file::InputFile;
use crate::Position;

/// Leading columns of every data row: gene ID, `utr` and `exon`.
const KEY_COLUMNS: usize = 3;

/// One parsed row of a coverage table.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageRow {
    pub gene_id: String,
    pub utr: Option<Position>,
    pub exon: Option<f64>,
    pub bins: Vec<Option<f64>>,
}

/// A parsing iterator over coverage table rows.
pub struct CoverageIterator {
    lines: Enumerate<Lines<BufReader<Box<dyn Read>>>>,
    pending: Option<(usize, String)>,
    header: String,
    n_columns: usize,
}

impl std::fmt::Debug for CoverageIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageIterator")
            .field("header", &self.header)
            .field("n_columns", &self.n_columns)
            .finish_non_exhaustive()
    }
}

/// Whether a line carries no data.
fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

impl CoverageIterator {
    /// Open a coverage table and read its header.
    ///
    /// # Errors
    ///
    /// Returns [`UtrExtError::MissingHeader`] if the file has no lines, and
    /// [`UtrExtError::CoverageTooFewColumns`] if the rows cannot hold a gene ID,
    /// `utr` and `exon`.
    pub fn new(filepath: impl Into<PathBuf>) -> Result<Self, UtrExtError> {
        let input_file = InputFile::new(filepath);
        let mut lines = input_file.reader()?.lines().enumerate();

        let mut header = None;
        for (_, line) in lines.by_ref() {
            let line = line?;
            if !is_skippable(&line) {
                header = Some(line);
                break;
            }
        }
        let header = header.ok_or_else(|| UtrExtError::MissingHeader(input_file.name()))?;
        let header_columns: Vec<&str> = header.split_whitespace().collect();

        // Peek at the first data row to tell whether the header names the row-name column.
        let mut pending = None;
        for (index, line) in lines.by_ref() {
            let line = line?;
            if !is_skippable(&line) {
                pending = Some((index + 1, line));
                break;
            }
        }

        let header_has_row_names = match header_columns.first() {
            Some(&"utr") => false,
            _ if header_columns.get(1) == Some(&"utr") => true,
            _ => pending.as_ref().map_or(true, |(_, line)| {
                line.split_whitespace().count() != header_columns.len() + 1
            }),
        };
        let n_columns = if header_has_row_names {
            header_columns.len()
        } else {
            header_columns.len() + 1
        };

        if n_columns < KEY_COLUMNS {
            return Err(UtrExtError::CoverageTooFewColumns(header));
        }

        Ok(Self {
            lines,
            pending,
            header,
            n_columns,
        })
    }

    /// Number of bin columns in each row.
    pub fn n_bins(&self) -> usize {
        self.n_columns - KEY_COLUMNS
    }

    fn next_data_line(&mut self) -> Option<Result<(usize, String), UtrExtError>> {
        if let Some(pending) = self.pending.take() {
            return Some(Ok(pending));
        }
        for (index, line) in self.lines.by_ref() {
            match line {
                Ok(line) if is_skippable(&line) => continue,
                Ok(line) => return Some(Ok((index + 1, line))),
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    fn parse_row(&self, line_number: usize, line: &str) -> Result<CoverageRow, UtrExtError> {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() > self.n_columns {
            return Err(UtrExtError::MalformedCoverageRow {
                line: line_number,
                reason: format!(
                    "{} columns found but the header defines {}",
                    columns.len(),
                    self.n_columns
                ),
            });
        }

        let gene_id = columns[0].to_string();
        let column = |i: usize| columns.get(i).copied().unwrap_or("NA");

        let utr = match parse_optional_column::<f64>(column(1), line_number)? {
            Some(utr) if utr.is_finite() && utr >= 0.0 => Some(utr as Position),
            Some(utr) => {
                return Err(UtrExtError::MalformedCoverageRow {
                    line: line_number,
                    reason: format!("UTR length must be a non-negative number, got {}", utr),
                })
            }
            None => None,
        };
        let exon = parse_optional_column::<f64>(column(2), line_number)?;

        let mut bins = Vec::with_capacity(self.n_bins());
        for i in KEY_COLUMNS..self.n_columns {
            let value = parse_optional_column::<f64>(column(i), line_number)?;
            if let Some(count) = value {
                if !count.is_finite() || count < 0.0 {
                    return Err(UtrExtError::MalformedCoverageRow {
                        line: line_number,
                        reason: format!("coverage must be a non-negative number, got {}", count),
                    });
                }
            }
            bins.push(value);
        }

        Ok(CoverageRow {
            gene_id,
            utr,
            exon,
            bins,
        })
    }
}

impl Iterator for CoverageIterator {
    type Item = Result<CoverageRow, UtrExtError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line_number, line) = match self.next_data_line()? {
            Ok(next) => next,
            Err(e) => return Some(Err(e)),
        };
        Some(self.parse_row(line_number, &line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn coverage_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_header_without_row_names() {
        let file = coverage_file("utr exon b0 b1 b2\ng1 300 2.5 10 8 0\ng2 100 0.5 1 NA 0\n");
        let iter = CoverageIterator::new(file.path()).unwrap();
        assert_eq!(iter.n_bins(), 3);
        let rows: Vec<CoverageRow> = iter.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gene_id, "g1");
        assert_eq!(rows[0].utr, Some(300));
        assert_eq!(rows[0].exon, Some(2.5));
        assert_eq!(rows[0].bins, vec![Some(10.0), Some(8.0), Some(0.0)]);
        assert_eq!(rows[1].bins, vec![Some(1.0), None, Some(0.0)]);
    }

    #[test]
    fn test_header_with_row_names_and_fill() {
        let file = coverage_file(
            "# written by the read extension step\n\
             gene_id\tutr\texon\tb0\tb1\tb2\n\
             g1\t200\t1.5\t4\t3\n\
             \n\
             g2\t0\t1.5\t4\t3\t2\n",
        );
        let rows: Vec<CoverageRow> = CoverageIterator::new(file.path())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bins, vec![Some(4.0), Some(3.0), None]);
        assert_eq!(rows[1].bins, vec![Some(4.0), Some(3.0), Some(2.0)]);
    }

    #[test]
    fn test_row_names_detected_from_width() {
        let file = coverage_file("length coverage b0 b1\ng1 100 1.0 3 2\n");
        let iter = CoverageIterator::new(file.path()).unwrap();
        assert_eq!(iter.n_bins(), 2);
        let rows: Vec<CoverageRow> = iter.map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].utr, Some(100));
    }

    #[test]
    fn test_too_many_columns() {
        let file = coverage_file("utr exon b0\ng1 100 1.0 3 4 5\n");
        let result: Result<Vec<_>, _> = CoverageIterator::new(file.path()).unwrap().collect();
        assert!(matches!(
            result,
            Err(UtrExtError::MalformedCoverageRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_unparseable_value() {
        let file = coverage_file("utr exon b0 b1\ng1 100 1.0 3 many\n");
        let result: Result<Vec<_>, _> = CoverageIterator::new(file.path()).unwrap().collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file() {
        let file = coverage_file("");
        assert!(matches!(
            CoverageIterator::new(file.path()),
            Err(UtrExtError::MissingHeader(_))
        ));
    }
}
