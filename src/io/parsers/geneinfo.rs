//! The gene-info table: the authoritative set of genes and their coordinates.
//!
//! A tab-separated file with a header, which must include the columns
//! `gene_id`, `contig`, `strand`, `start` and `end`. Other columns are ignored.

use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::str::FromStr;

use super::tsv::TsvRecordIterator;
use crate::error::UtrExtError;
use crate::Position;

/// Nucleotide strand enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    /// Whether 5' is at the higher genomic coordinate.
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

impl FromStr for Strand {
    type Err = UtrExtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unknown),
            _ => Err(UtrExtError::InvalidStrand(s.to_string())),
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unknown => ".",
        };
        write!(f, "{}", symbol)
    }
}

/// [`serde`] deserializer for a strand column.
pub fn deserialize_strand<'de, D>(deserializer: D) -> Result<Strand, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse::<Strand>().map_err(DeError::custom)
}

/// One gene of the gene-info table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GeneInfo {
    pub gene_id: String,
    pub contig: String,
    #[serde(deserialize_with = "deserialize_strand")]
    pub strand: Strand,
    pub start: Position,
    pub end: Position,
}

/// An iterator over gene-info rows.
#[derive(Debug)]
pub struct GeneInfoIterator {
    iter: TsvRecordIterator<GeneInfo>,
}

impl GeneInfoIterator {
    pub fn new(filepath: impl Into<PathBuf>) -> Result<Self, UtrExtError> {
        let iter = TsvRecordIterator::new(filepath)?;
        Ok(Self { iter })
    }
}

impl Iterator for GeneInfoIterator {
    type Item = Result<GeneInfo, UtrExtError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// Read the gene-info table, keyed by gene ID and kept in file order.
///
/// # Errors
///
/// Duplicated gene IDs and genes whose start is after their end are
/// [`UtrExtError::InvalidGeneInfo`].
pub fn read_gene_info(
    filepath: impl Into<PathBuf>,
) -> Result<IndexMap<String, GeneInfo>, UtrExtError> {
    let mut genes = IndexMap::new();
    for result in GeneInfoIterator::new(filepath)? {
        let gene = result?;
        if gene.start > gene.end {
            return Err(UtrExtError::InvalidGeneInfo(format!(
                "gene '{}' has start ({}) after end ({})",
                gene.gene_id, gene.start, gene.end
            )));
        }
        if genes.contains_key(&gene.gene_id) {
            return Err(UtrExtError::InvalidGeneInfo(format!(
                "gene '{}' is duplicated",
                gene.gene_id
            )));
        }
        genes.insert(gene.gene_id.clone(), gene);
    }
    Ok(genes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn gene_info_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_read_gene_info() {
        let file = gene_info_file(
            "gene_id\tcontig\tstrand\tstart\tend\tsource\n\
             g1\tchr1\t+\t1000\t5000\tprotein_coding\n\
             g2\tchr2\t-\t300\t900\tlincRNA\n",
        );
        let genes = read_gene_info(file.path()).unwrap();
        assert_eq!(genes.len(), 2);
        let g2 = &genes["g2"];
        assert_eq!(g2.contig, "chr2");
        assert_eq!(g2.strand, Strand::Reverse);
        assert_eq!((g2.start, g2.end), (300, 900));
        assert_eq!(genes.get_index(0).unwrap().0, "g1");
    }

    #[test]
    fn test_columns_by_name() {
        let file = gene_info_file("contig\tstart\tend\tgene_id\tstrand\nchr1\t10\t20\tg1\t.\n");
        let genes = read_gene_info(file.path()).unwrap();
        assert_eq!(genes["g1"].strand, Strand::Unknown);
        assert_eq!(genes["g1"].start, 10);
    }

    #[test]
    fn test_duplicate_gene() {
        let file = gene_info_file(
            "gene_id\tcontig\tstrand\tstart\tend\ng1\tchr1\t+\t1\t2\ng1\tchr1\t+\t1\t2\n",
        );
        assert!(matches!(
            read_gene_info(file.path()),
            Err(UtrExtError::InvalidGeneInfo(_))
        ));
    }

    #[test]
    fn test_invalid_strand() {
        let file = gene_info_file("gene_id\tcontig\tstrand\tstart\tend\ng1\tchr1\tx\t1\t2\n");
        assert!(read_gene_info(file.path()).is_err());
        assert!(matches!(
            "x".parse::<Strand>(),
            Err(UtrExtError::InvalidStrand(_))
        ));
    }
}
