//! Essential TSV parsing functionality, which wraps the blazingly-fast [`csv`] crate's
//! deserialization method using [`serde`].

use csv::{DeserializeRecordsIntoIter, Reader, ReaderBuilder};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

use crate::error::UtrExtError;
use crate::io::file::InputFile;

/// Build a headered TSV reader which ignores comment lines and works on
/// gzip-compressed files. Columns are matched to struct fields by header name,
/// so extra columns are ignored and column order does not matter.
pub fn build_tsv_reader(
    filepath: impl Into<PathBuf>,
) -> Result<Reader<Box<dyn Read>>, UtrExtError> {
    let stream: Box<dyn Read> = Box::new(InputFile::new(filepath).reader()?);

    let reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_reader(stream);
    Ok(reader)
}

/// A TSV parsing iterator, deserializing each row into `T`.
pub struct TsvRecordIterator<T> {
    inner: DeserializeRecordsIntoIter<Box<dyn std::io::Read>, T>,
}

impl<T> std::fmt::Debug for TsvRecordIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsvRecordIterator").finish_non_exhaustive()
    }
}

impl<T> TsvRecordIterator<T>
where
    for<'de> T: Deserialize<'de>,
{
    /// Create a new TSV reader. The first non-comment line must be the header.
    pub fn new(filepath: impl Into<PathBuf>) -> Result<Self, UtrExtError> {
        let reader = build_tsv_reader(filepath)?;
        let inner = reader.into_deserialize();

        Ok(Self { inner })
    }
}

impl<T> Iterator for TsvRecordIterator<T>
where
    for<'de> T: Deserialize<'de>,
{
    type Item = Result<T, UtrExtError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|res| res.map_err(UtrExtError::from))
    }
}
