use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use patspace::align::FuzzyOpt;
use patspace::index::genome::Genome;
use patspace::index::locator::LocatorOpt;
use patspace::index::GenomeIndex;
use patspace::io::manifest::Manifest;
use patspace::logging::init_log;
use patspace::pipeline::{find, FindOpt, FindPaths};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "patspace", author, version, about = "Pattern space cDNA to genome matcher", arg_required_else_help = true)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct LocatorArgs {
    /// Query tile length
    #[arg(long = "pat-size", default_value_t = 11)]
    pat_size: usize,
    /// Tile hits a pair of neighbouring blocks needs
    #[arg(long = "min-match", default_value_t = 4)]
    min_match: usize,
    #[arg(long = "block-size", default_value_t = 1024)]
    block_size: usize,
    /// Largest distance between blocks of one candidate region
    #[arg(long = "max-intron", default_value_t = 32768)]
    max_intron: usize,
    /// Tiles seen more often than this are treated as repeats
    #[arg(long = "max-pat-count", default_value_t = 16384)]
    max_pat_count: usize,
}

impl From<LocatorArgs> for LocatorOpt {
    fn from(a: LocatorArgs) -> Self {
        LocatorOpt {
            pat_size: a.pat_size,
            min_match: a.min_match,
            block_size: a.block_size,
            max_intron: a.max_intron,
            max_pat_count: a.max_pat_count,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the genome index once and save it as <prefix>.psx
    Index {
        /// File listing the genome FASTA files
        genome_list: String,
        /// Output prefix
        #[arg(short, long, default_value = "genome")]
        output: String,
        #[command(flatten)]
        locator: LocatorArgs,
    },
    /// Align cDNA against the genome and report contigs glued by a cDNA
    Find {
        /// File listing the genome FASTA files
        genome_list: String,
        /// File listing the cDNA FASTA files
        cdna_list: String,
        /// 5'/3' EST pairs, one `name5 name3` per line
        pair_file: String,
        /// Writes <outRoot>.hit, <outRoot>.glu and <outRoot>.ok
        out_root: String,
        /// Prebuilt index from `patspace index`
        #[arg(short = 'i', long = "index")]
        index: Option<String>,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Work units evaluated per parallel batch
        #[arg(long = "batch-size", default_value_t = 512)]
        batch_size: usize,
        /// Queries at least this long are skipped
        #[arg(long = "max-query-size", default_value_t = 20000)]
        max_query_size: usize,
        #[command(flatten)]
        locator: LocatorArgs,
        /// Exact seed length of the local aligner
        #[arg(long = "seed-len", default_value_t = 10, value_parser = clap::value_parser!(u8).range(4..=32))]
        seed_len: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_log(cli.verbose);
    match cli.command {
        Commands::Index {
            genome_list,
            output,
            locator,
        } => run_index(&genome_list, &output, locator.into()),
        Commands::Find {
            genome_list,
            cdna_list,
            pair_file,
            out_root,
            index,
            threads,
            batch_size,
            max_query_size,
            locator,
            seed_len,
        } => {
            let opt = FindOpt {
                threads,
                batch_size,
                max_query_size,
                locator: locator.into(),
                aligner: FuzzyOpt {
                    seed_len: usize::from(seed_len),
                    ..FuzzyOpt::default()
                },
            };
            let paths = FindPaths {
                genome_list,
                cdna_list,
                pair_file,
                out_root,
                index,
            };
            find(&paths, &opt)?;
            Ok(())
        }
    }
}

fn run_index(genome_list: &str, output: &str, opt: LocatorOpt) -> Result<()> {
    let manifest = Manifest::load(genome_list)?;
    let genome = Genome::load(&manifest)?;
    info!(
        "genome: {} BACs, {} sequences, {} bases",
        genome.bacs.len(),
        genome.targets.len(),
        genome.total_len()
    );

    let mut idx = GenomeIndex::build(genome, opt);
    idx.meta.build_args = Some(std::env::args().collect::<Vec<_>>().join(" "));
    idx.meta.build_timestamp = Some(chrono::Utc::now().to_rfc3339());

    let out_path = format!("{}.psx", output);
    idx.save_to_file(&out_path)?;
    info!("index saved: {}", out_path);
    Ok(())
}
