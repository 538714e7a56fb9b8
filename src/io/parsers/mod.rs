//! Parsers for the gene-info and coverage tables.
//!
//! Both parsers work on plaintext and gzip-compressed files. The gene-info table
//! is a strict tab-separated file read through the [`csv`] crate with [`serde`];
//! the coverage tables are written by R and follow `read.table()` conventions
//! (whitespace separated, optional row-name header, ragged rows), so they are
//! parsed line by line.

pub mod coverage;
pub mod geneinfo;
pub mod tsv;

pub use coverage::{CoverageIterator, CoverageRow};
pub use geneinfo::{read_gene_info, GeneInfo, GeneInfoIterator, Strand};
pub use tsv::TsvRecordIterator;

use crate::error::UtrExtError;

/// Tokens read as a missing value in R-written tables.
pub const MISSING_VALUES: &[&str] = &["NA", "NaN", "nan", ".", ""];

/// Parse a single column into `Option<T>`, treating [`MISSING_VALUES`] as `None`.
///
/// # Arguments
///
/// * `column`: the raw column text.
/// * `line_number`: the 1-based line the column is from. Used for error reporting.
///
/// # Errors
///
/// Returns [`UtrExtError::MalformedCoverageRow`] if the column is not missing and
/// cannot be parsed into type `T`.
pub fn parse_optional_column<T: std::str::FromStr>(
    column: &str,
    line_number: usize,
) -> Result<Option<T>, UtrExtError>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    if MISSING_VALUES.contains(&column) {
        return Ok(None);
    }
    column
        .parse::<T>()
        .map(Some)
        .map_err(|e| UtrExtError::MalformedCoverageRow {
            line: line_number,
            reason: format!(
                "could not parse '{}' as {}: {}",
                column,
                std::any::type_name::<T>(),
                e
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_column() {
        assert_eq!(parse_optional_column::<f64>("1.5", 1).unwrap(), Some(1.5));
        assert_eq!(parse_optional_column::<f64>("NA", 1).unwrap(), None);
        assert_eq!(parse_optional_column::<u64>("", 1).unwrap(), None);
        assert!(matches!(
            parse_optional_column::<u64>("abc", 7),
            Err(UtrExtError::MalformedCoverageRow { line: 7, .. })
        ));
    }
}
