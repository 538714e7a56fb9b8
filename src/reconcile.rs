//! Reconcile decoded extensions with gene coordinates.
//!
//! Upstream and downstream extensions are relative to transcription, so on
//! the reverse strand upstream lies at the higher coordinate. Flanks are built
//! in genome order (left of `start`, right of `end`) and only mapped back to
//! 5'/3' when a row is written.
//!
//! The reconciled ("max") flank spans the union of the old and new flanks:
//! a known UTR is extended, never shrunk.

use indexmap::IndexMap;
use log::warn;

use crate::{
    decode::UtrExtension,
    io::parsers::geneinfo::{GeneInfo, Strand},
    io::tsv::TsvConfig,
    traits::TsvSerialize,
    Position,
};

/// A half-open genomic interval flanking a gene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flank {
    pub start: Position,
    pub end: Position,
}

impl Flank {
    pub fn length(&self) -> Position {
        self.end - self.start
    }

    /// The smallest flank covering both.
    pub fn union(&self, other: &Flank) -> Flank {
        Flank {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// The flanks of a gene in genome order. `None` means no estimate, which is
/// distinct from a zero-length flank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneFlanks {
    pub left: Option<Flank>,
    pub right: Option<Flank>,
}

impl GeneFlanks {
    /// Flanks of `left_extent` before `start` (saturating at 0) and `right_extent` after `end`.
    pub fn from_extents(
        left_extent: Option<Position>,
        right_extent: Option<Position>,
        start: Position,
        end: Position,
    ) -> Self {
        Self {
            left: left_extent.map(|extent| Flank {
                start: start.saturating_sub(extent),
                end: start,
            }),
            right: right_extent.map(|extent| Flank {
                start: end,
                end: end + extent,
            }),
        }
    }

    /// Side by side union, ignoring absent flanks.
    pub fn max_extension(&self, other: &GeneFlanks) -> GeneFlanks {
        let union = |a: Option<Flank>, b: Option<Flank>| match (a, b) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, None) => a,
            (None, b) => b,
        };
        GeneFlanks {
            left: union(self.left, other.left),
            right: union(self.right, other.right),
        }
    }

    /// The (5', 3') flanks for a gene on `strand`.
    pub fn oriented(&self, strand: Strand) -> (Option<Flank>, Option<Flank>) {
        if strand.is_reverse() {
            (self.right, self.left)
        } else {
            (self.left, self.right)
        }
    }
}

/// One output row: a gene's old, new and reconciled flanks.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneUtrRow {
    pub gene_id: String,
    pub contig: String,
    pub strand: Strand,
    pub old: GeneFlanks,
    pub new: GeneFlanks,
    pub max: GeneFlanks,
}

/// Output columns: key columns, then `{old,new,max}_{5utr,3utr}_{length,start,end}`.
pub fn output_header() -> Vec<String> {
    let mut header: Vec<String> = ["gene_id", "contig", "strand"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for variant in ["old", "new", "max"] {
        for side in ["5utr", "3utr"] {
            for field in ["length", "start", "end"] {
                header.push(format!("{}_{}_{}", variant, side, field));
            }
        }
    }
    header
}

fn flank_to_tsv(flank: &Option<Flank>, config: &TsvConfig) -> String {
    vec![
        flank.map(|f| f.length()),
        flank.map(|f| f.start),
        flank.map(|f| f.end),
    ]
    .to_tsv(config)
}

impl TsvSerialize for GeneUtrRow {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        let mut fields = vec![
            self.gene_id.to_tsv(config),
            self.contig.to_tsv(config),
            self.strand.to_string(),
        ];
        for flanks in [&self.old, &self.new, &self.max] {
            let (five_prime, three_prime) = flanks.oriented(self.strand);
            fields.push(flank_to_tsv(&five_prime, config));
            fields.push(flank_to_tsv(&three_prime, config));
        }
        fields.join("\t")
    }
}

/// Build the row of one gene from its upstream and downstream extensions.
pub fn reconcile_gene(
    gene: &GeneInfo,
    upstream: Option<&UtrExtension>,
    downstream: Option<&UtrExtension>,
) -> GeneUtrRow {
    let (left, right) = if gene.strand.is_reverse() {
        (downstream, upstream)
    } else {
        (upstream, downstream)
    };
    let old = GeneFlanks::from_extents(
        left.and_then(|e| e.old_utr_length),
        right.and_then(|e| e.old_utr_length),
        gene.start,
        gene.end,
    );
    let new = GeneFlanks::from_extents(
        left.map(|e| e.new_utr_length),
        right.map(|e| e.new_utr_length),
        gene.start,
        gene.end,
    );
    let max = old.max_extension(&new);
    GeneUtrRow {
        gene_id: gene.gene_id.clone(),
        contig: gene.contig.clone(),
        strand: gene.strand,
        old,
        new,
        max,
    }
}

/// One row per gene-info gene, in gene-info order.
pub fn reconcile(
    genes: &IndexMap<String, GeneInfo>,
    upstream: &IndexMap<String, UtrExtension>,
    downstream: &IndexMap<String, UtrExtension>,
) -> Vec<GeneUtrRow> {
    genes
        .values()
        .map(|gene| {
            reconcile_gene(
                gene,
                upstream.get(&gene.gene_id),
                downstream.get(&gene.gene_id),
            )
        })
        .collect()
}

/// Gene IDs with coverage but no gene-info entry. These get no output row.
pub fn orphan_genes<'a>(
    genes: &IndexMap<String, GeneInfo>,
    coverage_ids: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    let mut orphans: Vec<String> = coverage_ids
        .filter(|id| !genes.contains_key(*id))
        .map(|id| id.to_string())
        .collect();
    orphans.sort();
    orphans.dedup();
    if !orphans.is_empty() {
        warn!(
            "{} genes with coverage are missing from the gene info table and were dropped",
            orphans.len()
        );
    }
    orphans
}
