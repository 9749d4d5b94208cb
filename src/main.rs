mod config;
mod digits;
mod error;
mod hash_index;
mod pi_files;
mod rolling_hash;
mod search;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use config::SearchConfig;
use digits::{DigitSource, MemoryDigits};
use pi_files::{PlainDigitFile, SegmentLayout, SegmentedPiFiles};
use search::{SearchEngine, SearchEvent, SearchReport};

/// Finds how many decimal digits of pi are needed before some N-digit string repeats.
#[derive(Parser, Debug)]
#[command(name = "pi-repeat", version, about)]
struct Cli {
    /// Length of the repeated digit string to search for
    #[arg(value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    n: u32,

    /// Trailing digits of each window used as the hash key (must be below N)
    #[arg(long, default_value_t = config::DEFAULT_KEY_DIGITS)]
    key_digits: u32,

    /// Windows recorded per batch; bounds memory use
    #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Stop searching past this digit offset
    #[arg(long, default_value_t = config::DEFAULT_MAX_TOTAL)]
    max_total: u64,

    /// Directory holding the digits of pi as pi-0001.txt, pi-0002.txt, ...
    #[arg(long, env = "PI_REPEAT_DIR", default_value = "pi")]
    pi_dir: PathBuf,

    /// Read digits from a single file instead of the segment directory
    #[arg(long, conflicts_with = "pi_dir")]
    digits_file: Option<PathBuf>,

    /// Search the given digits instead of reading any files
    #[arg(long, conflicts_with_all = ["pi_dir", "digits_file"])]
    digits: Option<String>,

    /// Digits on each line of a segment file
    #[arg(long, default_value_t = 100)]
    digits_per_line: usize,

    /// Lines in each segment file
    #[arg(long, default_value_t = 1_000_000)]
    lines_per_segment: u64,

    /// Log level: error, warn, info, debug, trace (defaults to RUST_LOG, then info)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) {
    let env = Env::default().default_filter_or(level.unwrap_or("info"));
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

fn search<S: DigitSource>(source: S, config: SearchConfig) -> Result<SearchReport> {
    let n = config.window_len;
    let mut engine = SearchEngine::new(source, config).context("Failed to set up the search")?;

    let report = engine
        .run_with(|event| match event {
            SearchEvent::BatchStarted { index, start } => {
                debug!("Batch {} from offset {}", index, start);
            }
            SearchEvent::Candidate(m) => {
                println!(
                    "Found possible match {} at position {} ({} total digits):{}",
                    n,
                    m.position,
                    m.end(),
                    m
                );
            }
            SearchEvent::Confirmed(m) => {
                println!(
                    "Found match {} at position {} ({} total digits):{}",
                    n,
                    m.position,
                    m.end(),
                    m
                );
            }
        })
        .context("Search failed")?;

    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = SearchConfig::new(cli.n as usize)
        .with_key_digits(cli.key_digits)
        .with_batch_size(cli.batch_size)
        .with_max_total(cli.max_total);
    config.validate()?;

    println!("Searching for a repeated string of {} digits in pi...", cli.n);
    info!(
        "N={} K={} batch={} ceiling={}",
        config.window_len, config.key_digits, config.batch_size, config.max_total
    );

    let start = Instant::now();
    let report = match (&cli.digits, &cli.digits_file) {
        (Some(text), _) => {
            let digits = MemoryDigits::from_text(text).context("Invalid --digits value")?;
            if digits.is_empty() {
                anyhow::bail!("--digits must contain at least one digit");
            }
            info!("Searching {} digits given on the command line", digits.len());
            search(digits, config.clone())?
        }
        (None, Some(path)) => {
            let file = PlainDigitFile::open(path)
                .with_context(|| format!("Failed to open digit file: {}", path.display()))?;
            search(file, config.clone())?
        }
        (None, None) => {
            let layout = SegmentLayout {
                digits_per_line: cli.digits_per_line,
                lines_per_segment: cli.lines_per_segment,
            };
            let files = SegmentedPiFiles::new(&cli.pi_dir, layout).with_context(|| {
                format!("Failed to find digit segments in {}", cli.pi_dir.display())
            })?;
            if files.available_digits() < config.max_total {
                warn!(
                    "Scan ceiling {} exceeds the {} digits on disk",
                    config.max_total,
                    files.available_digits()
                );
            }
            search(files, config.clone())?
        }
    };
    let elapsed = start.elapsed();

    match &report.best {
        Some(best) => println!("Best={}", best.position),
        None => println!("Best=none"),
    }
    if report.exhaustive {
        println!("Search complete after {} batch(es)", report.batches);
    } else {
        println!(
            "Scan ceiling {} reached; result is the best found so far",
            config.max_total
        );
    }
    println!("Time elapsed: {:.3}s", elapsed.as_secs_f64());

    Ok(())
}
