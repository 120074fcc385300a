//! xdb-maker: CLI tool for generating and checking xdb files.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use xdb::{load_segments, IndexPolicy, Maker, MakerConfig, Searcher};

#[derive(Parser)]
#[command(name = "xdb-maker")]
#[command(version)]
#[command(about = "Generate and query xdb IPv4 region files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an xdb file from a segment source
    Gen {
        /// Source segment file (`start|end|region` per line)
        #[arg(long)]
        src: PathBuf,

        /// Output xdb file
        #[arg(long)]
        dst: PathBuf,

        /// Index policy: vector or btree
        #[arg(long, value_parser = parse_policy)]
        index_policy: Option<IndexPolicy>,

        /// JSON maker configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print build statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up addresses in an xdb file
    Search {
        /// xdb file
        #[arg(long)]
        db: PathBuf,

        /// Addresses to look up
        #[arg(required = true)]
        ips: Vec<String>,
    },

    /// Check every source segment against an xdb file
    Verify {
        /// xdb file
        #[arg(long)]
        db: PathBuf,

        /// Source segment file the xdb file was built from
        #[arg(long)]
        src: PathBuf,
    },
}

fn parse_policy(s: &str) -> Result<IndexPolicy, String> {
    IndexPolicy::parse(s).ok_or_else(|| format!("invalid index policy `{}`", s))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Gen {
            src,
            dst,
            index_policy,
            config,
            json,
        } => generate(&src, &dst, index_policy, config.as_ref(), json),
        Commands::Search { db, ips } => search(&db, &ips),
        Commands::Verify { db, src } => verify(&db, &src),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn generate(
    src: &PathBuf,
    dst: &PathBuf,
    index_policy: Option<IndexPolicy>,
    config: Option<&PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => MakerConfig::load(path)?,
        None => MakerConfig::default(),
    };
    if let Some(policy) = index_policy {
        config.index_policy = policy;
    }

    let started = Instant::now();
    let mut maker = Maker::open(config, src, dst)?;
    maker.init()?;
    let stats = maker.start()?;
    maker.end()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "Done, segments: {}, regions: {}, index blocks: {}, size: {} bytes, elapsed: {:?}",
            stats.segments,
            stats.regions,
            stats.index_blocks,
            stats.file_size,
            started.elapsed()
        );
    }
    Ok(())
}

fn search(db: &PathBuf, ips: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let searcher = Searcher::open(db)?;

    for ip in ips {
        let started = Instant::now();
        match searcher.search_str(ip)? {
            Some(region) => println!(
                "{} => {}, took: {:?}",
                ip,
                String::from_utf8_lossy(region),
                started.elapsed()
            ),
            None => println!("{} => <not found>, took: {:?}", ip, started.elapsed()),
        }
    }
    Ok(())
}

fn verify(db: &PathBuf, src: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let segments = load_segments(BufReader::new(File::open(src)?))?;
    let searcher = Searcher::open(db)?;

    let started = Instant::now();
    let report = searcher.verify(&segments)?;
    println!(
        "Verified {} segments with {} lookups in {:?}",
        report.segments,
        report.lookups,
        started.elapsed()
    );

    if !report.is_ok() {
        return Err(format!("{} segments failed to verify", report.mismatches.len()).into());
    }
    Ok(())
}
