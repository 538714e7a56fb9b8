//! Types and methods for reading and parsing input and writing output.

pub mod file;
pub mod parsers;
pub mod tsv;

pub use file::{InputFile, OutputFile};
pub use parsers::{read_gene_info, CoverageIterator, GeneInfoIterator, TsvRecordIterator};
pub use tsv::UTR_TSV;
