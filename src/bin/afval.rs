use std::path::{Path, PathBuf};
use std::str::FromStr;

use afval::pipeline::ArtifactStats;
use afval::{observability, presets, storage, AfvalConfig, Reference, WeighingSources};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "afval",
    version = afval::VERSION,
    about = "Encode, decode and enrich waste-container datasets"
)]
struct Cli {
    /// JSON config file; every setting is optional.
    #[arg(long, global = true, env = "AFVAL_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a row-oriented dataset with the transform of the given kind.
    Encode {
        /// Dataset kind, e.g. gebieden, containers, wegingen.
        kind: String,
        input: PathBuf,
        output: PathBuf,
    },
    /// Decode an encoded artifact back into a row-oriented dataset.
    Decode { artifact: PathBuf, output: PathBuf },
    /// Show the encoded size of every field in an artifact.
    Inspect { artifact: PathBuf },
    /// Merge a freshly pulled dataset into the local copy.
    Merge {
        local: PathBuf,
        update: PathBuf,
        /// Fields identifying a record; repeat for a composite key.
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
    },
    /// Add new source weighings to the published weighings artifact.
    Weighings {
        #[arg(long)]
        vehicles: PathBuf,
        #[arg(long)]
        weighings: PathBuf,
        /// Encoded containers artifact.
        #[arg(long)]
        containers: PathBuf,
        /// Encoded areas artifact.
        #[arg(long)]
        areas: PathBuf,
        /// Encoded weighings artifact, read and rewritten.
        #[arg(long)]
        output: PathBuf,
        /// Where to write the artifact holding only the new weighings.
        #[arg(long)]
        delta: PathBuf,
        /// Drop weighings older than this RFC 3339 instant.
        #[arg(long)]
        after: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AfvalConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AfvalConfig::default(),
    };

    let level = match cli.verbose {
        0 => LevelFilter::from_str(&config.logging.level)
            .with_context(|| format!("unknown log level '{}'", config.logging.level))?,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    observability::init_logging(level, config.logging.file.as_deref())
        .context("failed to set up logging")?;

    match cli.command {
        Command::Encode {
            kind,
            input,
            output,
        } => run_encode(&config, &kind, &input, &output),
        Command::Decode { artifact, output } => run_decode(&artifact, &output),
        Command::Inspect { artifact } => run_inspect(&artifact),
        Command::Merge {
            local,
            update,
            keys,
        } => run_merge(&local, &update, &keys),
        Command::Weighings {
            vehicles,
            weighings,
            containers,
            areas,
            output,
            delta,
            after,
        } => {
            let after = after
                .map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .with_context(|| format!("invalid --after instant '{s}'"))
                })
                .transpose()?;
            let paths = WeighingPaths {
                vehicles,
                weighings,
                containers,
                areas,
                output,
                delta,
            };
            run_weighings(&config, &paths, after)
        }
    }
}

fn run_encode(config: &AfvalConfig, kind: &str, input: &Path, output: &Path) -> Result<()> {
    let Some(spec) = config.transform(kind) else {
        let known: Vec<&str> = config.transforms.keys().map(String::as_str).collect();
        bail!("unknown dataset kind '{kind}' (known: {})", known.join(", "));
    };
    let dataset = storage::load_dataset(input)
        .with_context(|| format!("failed to read dataset {}", input.display()))?;
    let artifact = afval::encode(&dataset, spec).with_context(|| format!("failed to encode {kind}"))?;
    storage::save_encoded(output, &artifact)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stats = artifact.stats()?;
    println!(
        "{} {} records -> {} bytes",
        "encoded".green().bold(),
        dataset.len(),
        stats.total_bytes
    );
    Ok(())
}

fn run_decode(artifact: &Path, output: &Path) -> Result<()> {
    let Some(encoded) = storage::load_artifact(artifact)
        .with_context(|| format!("failed to read artifact {}", artifact.display()))?
    else {
        bail!("artifact {} does not exist", artifact.display());
    };
    let dataset = afval::decode(&encoded).context("failed to decode artifact")?;
    storage::save_dataset(output, &dataset)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{} {} records", "decoded".green().bold(), dataset.len());
    Ok(())
}

fn print_stats(stats: &ArtifactStats) {
    println!(
        "{} {}",
        "last_change".bold(),
        stats.last_change.as_deref().unwrap_or("-")
    );
    println!("{:<6} {:<18} {:>10}  {}", "chan", "field", "bytes", "chain");
    for field in &stats.fields {
        let share = field.encoded_bytes as f64 / stats.total_bytes.max(1) as f64;
        let bytes = format!("{:>10}", field.encoded_bytes);
        let bytes = if share > 0.25 {
            bytes.red()
        } else if share > 0.10 {
            bytes.yellow()
        } else {
            bytes.normal()
        };
        println!(
            "{:<6} {:<18} {}  {}",
            field.channel,
            field.field,
            bytes,
            field.chain.dimmed()
        );
    }
    println!(
        "{:<25} {:>10}",
        "transform".bold(),
        stats.transform_bytes
    );
    println!("{:<25} {:>10}", "total".bold(), stats.total_bytes);
}

fn run_inspect(artifact: &Path) -> Result<()> {
    let Some(encoded) = storage::load_artifact(artifact)
        .with_context(|| format!("failed to read artifact {}", artifact.display()))?
    else {
        bail!("artifact {} does not exist", artifact.display());
    };
    print_stats(&encoded.stats()?);
    Ok(())
}

fn run_merge(local: &Path, update: &Path, keys: &[String]) -> Result<()> {
    let current = storage::load_dataset(local)
        .with_context(|| format!("failed to read {}", local.display()))?;
    let fresh = storage::load_dataset(update)
        .with_context(|| format!("failed to read {}", update.display()))?;
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    let merged = storage::merge(current, fresh, &keys);
    storage::save_dataset(local, &merged)
        .with_context(|| format!("failed to write {}", local.display()))?;
    println!("{} {} records", "merged".green().bold(), merged.len());
    Ok(())
}

struct WeighingPaths {
    vehicles: PathBuf,
    weighings: PathBuf,
    containers: PathBuf,
    areas: PathBuf,
    output: PathBuf,
    delta: PathBuf,
}

fn run_weighings(
    config: &AfvalConfig,
    paths: &WeighingPaths,
    after: Option<DateTime<Utc>>,
) -> Result<()> {
    let Some(spec) = config.transform(presets::WEGINGEN) else {
        bail!("no '{}' transform configured", presets::WEGINGEN);
    };

    let vehicles = storage::load_dataset(&paths.vehicles).context("failed to read vehicles")?;
    let weighings = storage::load_dataset(&paths.weighings).context("failed to read weighings")?;
    let containers = storage::load_encoded(&paths.containers).context("failed to read containers")?;
    let areas = storage::load_encoded(&paths.areas).context("failed to read areas")?;
    let existing = storage::load_encoded(&paths.output).context("failed to read published weighings")?;

    let update = afval::update_weighings(
        existing,
        WeighingSources {
            vehicles: &vehicles,
            weighings: &weighings,
        },
        Reference {
            containers: &containers,
            areas: &areas,
        },
        &config.enrichment,
        after,
    )?;
    let Some(update) = update else {
        println!("{} no changes since the last run", "skipped".yellow());
        return Ok(());
    };

    let delta = afval::encode(&update.delta, spec)
        .context("failed to encode new weighings")?
        .with_last_delta(update.base.clone());
    storage::save_encoded(&paths.delta, &delta)?;
    let full = afval::encode(&update.full, spec).context("failed to encode weighings")?;
    storage::save_encoded(&paths.output, &full)?;

    println!(
        "{} {} new weighings ({} matched), {} in total",
        "published".green().bold(),
        update.delta.len(),
        update.summary.matched,
        update.full.len()
    );
    Ok(())
}
