//! Command entry points: `extend` and `fit`.

use indexmap::IndexMap;
use log::{info, warn};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{
    beta::MaximumLikelihoodBeta,
    config::ExtensionConfig,
    coverage::{CoverageTable, Direction},
    decode::{DecodeCounter, SequenceDecoder, UtrExtension},
    error::UtrExtError,
    estimate::{write_model_report, ModelParameters, ParameterEstimator},
    hmm::LogSpaceViterbi,
    io::{parsers::read_gene_info, OutputFile, UTR_TSV},
    reconcile::{orphan_genes, output_header, reconcile},
    reporting::{CommandOutput, Report},
    traits::TsvSerialize,
};

/// The coverage table written next to a gene-info file by the read extension step.
pub fn default_coverage_path(gene_info: &Path, direction: Direction) -> PathBuf {
    PathBuf::from(format!(
        "{}.readextension_{}_sense.tsv.gz",
        gene_info.display(),
        direction
    ))
}

/// Everything one direction's pass produces.
pub struct DirectionResult {
    pub direction: Direction,
    pub parameters: ModelParameters,
    pub extensions: IndexMap<String, UtrExtension>,
    pub counter: DecodeCounter,
    pub gene_ids: Vec<String>,
}

/// Fit a model to the coverage table at `coverage`, adding dropped and
/// unused rows to `report`.
pub fn fit_direction(
    coverage: &Path,
    direction: Direction,
    config: &ExtensionConfig,
    report: &mut Report,
) -> Result<(CoverageTable, ModelParameters), UtrExtError> {
    let table = CoverageTable::from_path(coverage, direction)?;
    if table.n_bins != config.territory_bins() {
        let message = format!(
            "{}: table has {} bins but the territory is {} bins of {}bp",
            direction,
            table.n_bins,
            config.territory_bins(),
            config.bin_size
        );
        warn!("{}", message);
        report.add_issue(message);
    }

    let (profiles, summary) = table.scaled_profiles(config.estimation_scale);
    report.add_profile_summary(direction, &summary);

    let estimator = ParameterEstimator::new(config, MaximumLikelihoodBeta::default());
    let parameters = estimator.estimate(&profiles)?;
    let unused = summary.profiles.saturating_sub(parameters.genes_used);
    if unused > 0 {
        report.add_issue(format!(
            "{}: {} of {} complete rows not used for fitting as not expressed",
            direction, unused, summary.profiles
        ));
    }
    Ok((table, parameters))
}

/// Estimate parameters from, then decode, one direction's coverage table.
///
/// # Errors
///
/// Table and estimation errors are fatal; per-gene decoding failures are
/// only counted.
pub fn extend_direction(
    coverage: &Path,
    direction: Direction,
    config: &ExtensionConfig,
    report: &mut Report,
) -> Result<DirectionResult, UtrExtError> {
    let (table, parameters) = fit_direction(coverage, direction, config, report)?;
    let model = parameters.hmm()?;
    let decoder = SequenceDecoder::new(&model, LogSpaceViterbi, config);
    let (extensions, counter) = decoder.decode_all(&table);
    let gene_ids = table.gene_ids().map(|id| id.to_string()).collect();
    Ok(DirectionResult {
        direction,
        parameters,
        extensions,
        counter,
        gene_ids,
    })
}

/// Build new UTRs for every gene of the gene-info table, writing one row per gene.
pub fn utrext_extend(
    gene_info: &PathBuf,
    upstream: Option<&PathBuf>,
    downstream: Option<&PathBuf>,
    output: Option<&PathBuf>,
    fit_output: Option<&PathBuf>,
    config: &ExtensionConfig,
) -> Result<CommandOutput<()>, UtrExtError> {
    config.validate()?;
    let genes = read_gene_info(gene_info)?;
    info!("read {} genes from {}", genes.len(), gene_info.display());

    // for reporting stuff to the user
    let mut report = Report::new();

    let upstream_path = upstream
        .cloned()
        .unwrap_or_else(|| default_coverage_path(gene_info, Direction::Upstream));
    let downstream_path = downstream
        .cloned()
        .unwrap_or_else(|| default_coverage_path(gene_info, Direction::Downstream));

    let upstream = extend_direction(&upstream_path, Direction::Upstream, config, &mut report)?;
    let downstream =
        extend_direction(&downstream_path, Direction::Downstream, config, &mut report)?;
    for result in [&upstream, &downstream] {
        report.add_decode_counts(result.direction, &result.counter);
    }

    let mut seen = HashSet::new();
    let coverage_ids = upstream
        .gene_ids
        .iter()
        .chain(downstream.gene_ids.iter())
        .map(|id| id.as_str())
        .filter(|id| seen.insert(*id));
    let orphans = orphan_genes(&genes, coverage_ids);
    if !orphans.is_empty() {
        report.add_issue(format!(
            "{} genes with coverage were not in the gene info table and have no output row",
            orphans.len()
        ));
    }

    let rows = reconcile(&genes, &upstream.extensions, &downstream.extensions);
    let output_stream = output.map_or(OutputFile::new_stdout(Some(output_header())), |file| {
        OutputFile::new(file, Some(output_header()))
    });
    let mut writer = output_stream.writer()?;
    for row in &rows {
        writeln!(writer, "{}", row.to_tsv(&UTR_TSV))?;
    }
    writer.flush()?;
    info!("wrote {} genes", rows.len());

    if let Some(fit_output) = fit_output {
        write_model_report(
            &[
                (Direction::Upstream, &upstream.parameters),
                (Direction::Downstream, &downstream.parameters),
            ],
            Some(fit_output),
        )?;
    }

    Ok(CommandOutput::new((), report))
}

/// Fit the model of a single coverage table and write it as a TSV.
pub fn utrext_fit(
    coverage: &PathBuf,
    direction: Direction,
    output: Option<&PathBuf>,
    config: &ExtensionConfig,
) -> Result<CommandOutput<ModelParameters>, UtrExtError> {
    config.validate()?;
    let mut report = Report::new();
    let (_, parameters) = fit_direction(coverage, direction, config, &mut report)?;

    write_model_report(&[(direction, &parameters)], output)?;
    Ok(CommandOutput::new(parameters, report))
}
