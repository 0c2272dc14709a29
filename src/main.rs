use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use namfinder::align::{map_reads, InputBuffer, MapOpt, MappingStatistics};
use namfinder::index::{IndexMeta, IndexParameters, StrobemerIndex};
use namfinder::io::reads::ReadSource;
use namfinder::io::refs::References;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "namfinder",
    author,
    version,
    about = "Find non-overlapping approximate matches (NAMs) between reads and a reference using strobemer seeds",
    arg_required_else_help = true
)]
struct Cli {
    /// Number of threads
    #[arg(short = 't', long = "threads", default_value_t = 3)]
    threads: usize,
    /// Number of reads processed by a worker thread at once
    #[arg(long = "chunk-size", default_value_t = 10_000, hide = true)]
    chunk_size: usize,

    /// Redirect output to file (stdout if omitted)
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
    /// Verbose output
    #[arg(short = 'v')]
    verbose: bool,
    /// Sort output NAMs of each query by score instead of by reference, query and reference coordinate
    #[arg(short = 'S')]
    sort_on_scores: bool,
    /// Drop NAMs whose boundary k-mers match the read in neither orientation
    #[arg(long = "drop-unresolved")]
    drop_unresolved: bool,
    /// Print statistics of indexing to PATH
    #[arg(long = "index-statistics", value_name = "PATH")]
    index_statistics: Option<PathBuf>,
    /// Do not map reads; only build the strobemer index and write it to disk
    #[arg(short = 'i', long = "create-index")]
    create_index: bool,
    /// Use an index previously written with --create-index
    #[arg(long = "use-index")]
    use_index: bool,

    /// Strobe length, must be in [9, 32]
    #[arg(short = 'k', default_value_t = 20)]
    k: i32,
    /// Submer size used for creating syncmers; k-s must be even
    #[arg(short = 's', default_value_t = 16)]
    s: i32,
    /// Lower syncmer offset from k/(k-s+1); start sample second syncmer this many syncmers after the first
    #[arg(short = 'l', default_value_t = 0)]
    l: i32,
    /// Upper syncmer offset from k/(k-s+1); stop sample second syncmer this many syncmers after the first
    #[arg(short = 'u', default_value_t = 7)]
    u: i32,
    /// Maximum distance between the starts of the two strobes, at most 255
    #[arg(short = 'm', default_value_t = 255)]
    max_dist: i32,
    /// Mask (do not process) strobemer hits with count larger than C
    #[arg(short = 'C', default_value_t = 1000)]
    filter_cutoff: i32,
    /// Print at most L NAMs per query; the NAMs with the highest score are kept
    #[arg(short = 'L', default_value_t = 1000)]
    max_nams: usize,

    /// Reference in FASTA format, optionally gzip compressed
    reference: PathBuf,
    /// Reads in FASTA or FASTQ format, optionally gzip compressed
    #[arg(required_unless_present = "create_index")]
    reads: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::info!("This is namfinder {}", env!("CARGO_PKG_VERSION"));
    if cfg!(debug_assertions) {
        log::info!("***** Binary was compiled without optimizations - this will be very slow *****");
    }

    let params = IndexParameters::new(cli.k, cli.s, cli.l, cli.u, cli.max_dist, cli.filter_cutoff)
        .context("a seeding parameter is invalid")?;
    let opt = MapOpt {
        max_nams: cli.max_nams,
        sort_on_scores: cli.sort_on_scores,
        drop_unresolved: cli.drop_unresolved,
        n_threads: cli.threads.max(1),
        chunk_size: cli.chunk_size.max(1),
    };
    log_parameters(&params, &opt);

    let timer = Instant::now();
    let references = References::from_fasta(&cli.reference)?;
    log::info!("Time reading reference: {:.2} s", timer.elapsed().as_secs_f64());
    let largest = references.lengths.iter().copied().max().unwrap_or(0);
    log::info!(
        "Reference size: {:.2} Mbp ({} contig{}; largest: {:.2} Mbp)",
        references.total_length() as f64 / 1e6,
        references.len(),
        if references.len() == 1 { "" } else { "s" },
        largest as f64 / 1e6
    );

    let index_path = index_file_name(&cli.reference, &params);
    let index = if cli.use_index {
        load_index(&index_path, &references, &params)?
    } else {
        build_index(&cli.reference, &references, params, opt.n_threads)?
    };

    if let Some(path) = &cli.index_statistics {
        index.print_diagnostics(path)?;
        log::debug!("Finished printing index statistics to {}", path.display());
    }

    if cli.create_index {
        let timer = Instant::now();
        index.write(&index_path)?;
        log::info!("Total time writing index: {:.2} s", timer.elapsed().as_secs_f64());
        log::info!("Index written to {}", index_path.display());
        return Ok(());
    }

    let reads = cli.reads.as_deref().context("no reads file given")?;
    let statistics = run_mapping(reads, cli.output.as_deref(), &opt, &references, &index)?;
    statistics.log_summary();
    Ok(())
}

fn log_parameters(params: &IndexParameters, opt: &MapOpt) {
    log::debug!("{params}");
    log::debug!("Using");
    log::debug!("k: {}", params.k);
    log::debug!("s: {}", params.s);
    log::debug!("w_min: {}", params.w_min);
    log::debug!("w_max: {}", params.w_max);
    log::debug!("Maximum seed length: {}", params.max_dist + params.k);
    log::debug!("C: {}", params.filter_cutoff);
    log::debug!("L: {}", opt.max_nams);
    let syncmer_span = params.k - params.s + 1;
    log::debug!(
        "Expected [w_min, w_max] in #nucleotides: [{}, {}]",
        syncmer_span * params.w_min,
        syncmer_span * params.w_max
    );
    log::debug!("Threads: {}", opt.n_threads);
}

/// `<reference><extension>`, e.g. `genome.fa.sti`
fn index_file_name(reference: &Path, params: &IndexParameters) -> PathBuf {
    let mut name = reference.as_os_str().to_owned();
    name.push(params.filename_extension());
    PathBuf::from(name)
}

fn build_index(
    reference_path: &Path,
    references: &References,
    params: IndexParameters,
    n_threads: usize,
) -> Result<StrobemerIndex> {
    log::info!("Indexing ...");
    let timer = Instant::now();
    let mut index = StrobemerIndex::new(params);
    index.populate(references, params.filter_cutoff, n_threads)?;
    index.set_meta(IndexMeta {
        reference_file: Some(reference_path.display().to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });
    index.stats.log_summary();
    log::info!("Total time indexing: {:.2} s", timer.elapsed().as_secs_f64());
    Ok(index)
}

fn load_index(
    path: &Path,
    references: &References,
    params: &IndexParameters,
) -> Result<StrobemerIndex> {
    let timer = Instant::now();
    let index = StrobemerIndex::read(path, references)
        .with_context(|| format!("cannot load index '{}'", path.display()))?;
    if index.parameters != *params {
        log::warn!(
            "Index was built with {}; its parameters take precedence over the command line",
            index.parameters
        );
    }
    if let Some(ts) = &index.meta().build_timestamp {
        log::debug!("Index built at {ts}");
    }
    log::info!("Total time reading index: {:.2} s", timer.elapsed().as_secs_f64());
    Ok(index)
}

fn run_mapping(
    reads: &Path,
    output: Option<&Path>,
    opt: &MapOpt,
    references: &References,
    index: &StrobemerIndex,
) -> Result<MappingStatistics> {
    let timer = Instant::now();
    let input = InputBuffer::new(ReadSource::open(reads)?, opt.chunk_size);
    log::info!("Running in single-end mode");
    let statistics = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file '{}'", path.display()))?;
            map_reads(input, BufWriter::new(file), opt, references, index)?.0
        }
        None => map_reads(input, BufWriter::new(std::io::stdout()), opt, references, index)?.0,
    };
    log::info!("Done!");
    log::info!("Total time mapping: {:.2} s", timer.elapsed().as_secs_f64());
    Ok(statistics)
}
