use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use utrext::{
    commands::{utrext_extend, utrext_fit},
    prelude::*,
};

const INFO: &str = "\
utrext: estimate UTR extensions from binned read coverage with a hidden Markov model
usage: utrext [--help] <subcommand>

Subcommands:

  extend: fit the model to upstream and downstream coverage and write new UTRs for every gene.

  fit:    fit the model to a single coverage table and write its parameters.

";

#[derive(Parser)]
#[clap(name = "utrext")]
#[clap(about = INFO)]
struct Cli {
    /// increase logging verbosity (-d for debug, -dd for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// number of threads used for decoding (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Extend {
        /// a TSV gene info table with gene_id, contig, strand, start and end columns
        #[arg(required = true)]
        gene_info: PathBuf,

        /// upstream coverage table (default: <GENE_INFO>.readextension_upstream_sense.tsv.gz)
        #[arg(long)]
        upstream: Option<PathBuf>,

        /// downstream coverage table (default: <GENE_INFO>.readextension_downstream_sense.tsv.gz)
        #[arg(long)]
        downstream: Option<PathBuf>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// an optional file to write the fitted model parameters to
        #[arg(long)]
        fit_output: Option<PathBuf>,

        #[command(flatten)]
        config: ExtensionConfig,
    },
    Fit {
        /// a coverage table
        #[arg(required = true)]
        coverage: PathBuf,

        /// which side of the genes the coverage table describes
        #[arg(long, value_enum, default_value_t = Direction::Downstream)]
        direction: Direction,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        config: ExtensionConfig,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run() -> Result<(), UtrExtError> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| UtrExtError::InvalidConfig(e.to_string()))?;
    }

    let report = match &cli.command {
        Some(Commands::Extend {
            gene_info,
            upstream,
            downstream,
            output,
            fit_output,
            config,
        }) => {
            utrext_extend(
                gene_info,
                upstream.as_ref(),
                downstream.as_ref(),
                output.as_ref(),
                fit_output.as_ref(),
                config,
            )?
            .into_parts()
            .1
        }
        Some(Commands::Fit {
            coverage,
            direction,
            output,
            config,
        }) => {
            let (parameters, report) =
                utrext_fit(coverage, *direction, output.as_ref(), config)?.into_parts();
            info!(
                "fitted on {} genes: {}",
                parameters.genes_used, parameters.transitions
            );
            report
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };

    for entry in report.entries() {
        warn!("{}", entry);
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
