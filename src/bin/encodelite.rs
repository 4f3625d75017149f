//! A command line interface to the `encodelite` crate.
//!
//! ```shell
//! cargo run --release --bin=encodelite --features=binaries -- tree
//! ```
//!
//! The following subcommands are provided:
//!
//! * `tree`: builds the cell type hierarchy from the live archive (or from a
//!   previously downloaded catalog) and prints it as JSON.
//! * `options`: prints every filter option along with the hierarchy as JSON.
//! * `search`: searches released files, experiments, or datasets and prints
//!   the merged results as a table.
//! * `assemblies`: prints the assemblies of released files, optionally for a
//!   single organism.
//! * `overlap`: runs a region-overlap search for a BED file and prints the
//!   results as a table.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use encodelite::Config;
use encodelite::catalog;
use encodelite::client::Client;
use encodelite::hierarchy;
use encodelite::overlap;
use encodelite::search::Criteria;
use encodelite::search::Kind;
use flate2::read::GzDecoder;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;
use tempdir::TempDir;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

////////////////////////////////////////////////////////////////////////////////////////
// Configuration
////////////////////////////////////////////////////////////////////////////////////////

/// Loads configuration from the provided path.
///
/// A missing file results in the default configuration.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(
            "config file not found: {}; using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    Config::from_path(path).with_context(|| format!("reading config: {}", path.display()))
}

////////////////////////////////////////////////////////////////////////////////////////
// Subcommands
////////////////////////////////////////////////////////////////////////////////////////

/// Reads a downloaded catalog, transparently decompressing it if needed.
fn read_catalog(path: &Path) -> Result<Vec<catalog::Record>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let reader: Box<dyn Read> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    };

    catalog::read_records(BufReader::new(reader)).context("reading catalog")
}

/// Builds and prints the cell type hierarchy.
fn tree(config: &Config, catalog: Option<&Path>) -> Result<()> {
    let records = match catalog {
        Some(path) => read_catalog(path)?,
        None => Client::new(config)
            .context("creating client")?
            .fetch_catalog()
            .context("fetching catalog")?,
    };

    info!("tree: building from {} records", records.len());
    let tree = hierarchy::build(records);

    println!(
        "{}",
        serde_json::to_string_pretty(&tree).context("serializing tree")?
    );

    Ok(())
}

/// Prints every filter option.
fn options(config: &Config) -> Result<()> {
    let options = Client::new(config)
        .context("creating client")?
        .options()
        .context("fetching options")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&options).context("serializing options")?
    );

    Ok(())
}

/// Prints a table with the provided headers and rows.
fn print_table<I>(headers: &[&str], rows: I)
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());

    for row in rows {
        builder.push_record(row);
    }

    let table = builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string();

    println!("{}", table);
}

/// Searches the archive's metadata and prints the results.
fn search(config: &Config, filters: SearchArgs) -> Result<()> {
    let criteria = Criteria {
        kind: Some(Kind::searchable(&filters.kind)),
        search_term: filters.query,
        assay_title: filters.assay,
        organism: filters.organism,
        assembly: filters.assembly,
        include_cell_types: filters.cell_type,
        exclude_cell_types: filters.exclude_cell_type,
        include_targets: filters.target,
        limit: filters.limit,
        after: filters.after,
        ..Criteria::from_config(config)
    };

    let results = Client::new(config)
        .context("creating client")?
        .search(&criteria)
        .context("searching")?;

    for url in &results.urls {
        info!("requested: {url}");
    }

    if filters.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("serializing results")?
        );
        return Ok(());
    }

    let field = |value: Option<&str>| value.unwrap_or_default().to_string();
    print_table(
        &["accession", "type", "cell type", "target", "organism", "assembly"],
        results.items.iter().map(|item| {
            vec![
                field(item.accession()),
                field(item.kind()),
                field(item.cell_type()),
                field(item.target()),
                field(item.organism()),
                field(item.assembly()),
            ]
        }),
    );

    info!("{} results", results.total);
    Ok(())
}

/// Prints the assemblies for an organism.
fn assemblies(config: &Config, organism: Option<&str>) -> Result<()> {
    let assemblies = Client::new(config)
        .context("creating client")?
        .assemblies(organism)
        .context("fetching assemblies")?;

    for assembly in assemblies {
        println!("{assembly}");
    }

    Ok(())
}

/// Runs an overlap search and prints the results.
fn overlap(config: &Config, bed: &Path, directory: Option<PathBuf>) -> Result<()> {
    if !bed.is_file() {
        bail!("query file not found: {}", bed.display());
    }

    let work_dir = match directory {
        Some(dir) => {
            std::fs::create_dir_all(&dir).context("creating working directory")?;
            dir
        }
        None => TempDir::new("overlap")
            .context("creating (temporary) working directory")?
            .into_path(),
    };

    info!("working directory: {}", work_dir.display());

    let outcome = overlap::search(config, bed, &work_dir).context("running overlap search")?;

    info!("index: {}", outcome.meta.index_dir.display());
    info!("genome length: {}", outcome.meta.genome_len);

    match (outcome.table, outcome.raw_output) {
        (Some(table), _) => {
            let headers = table.headers().iter().map(String::as_str).collect::<Vec<_>>();
            print_table(&headers, table.rows().iter().cloned());
        }
        (None, Some(raw)) => print!("{raw}"),
        (None, None) => warn!("the search produced no output"),
    }

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

/// The filters of a metadata search.
#[derive(clap::Args)]
struct SearchArgs {
    /// The kind of object to search for (`File`, `Experiment`, or `Dataset`).
    #[arg(long = "type", default_value = "File")]
    kind: String,

    /// Free text to search for.
    #[arg(long)]
    query: Option<String>,

    /// The assay title.
    #[arg(long)]
    assay: Option<String>,

    /// The organism (scientific name).
    #[arg(long)]
    organism: Option<String>,

    /// The genome assembly.
    #[arg(long)]
    assembly: Option<String>,

    /// A cell type to include (may be repeated).
    #[arg(long)]
    cell_type: Vec<String>,

    /// A cell type to exclude from the results (may be repeated).
    #[arg(long)]
    exclude_cell_type: Vec<String>,

    /// A target to include (may be repeated).
    #[arg(long)]
    target: Vec<String>,

    /// The number of results (between 1 and 200).
    #[arg(long)]
    limit: Option<usize>,

    /// The pagination cursor.
    #[arg(long)]
    after: Option<String>,

    /// Prints the results as JSON.
    #[arg(long)]
    json: bool,
}

/// The subcommands.
#[derive(Subcommand)]
enum Command {
    /// Builds the cell type hierarchy.
    Tree {
        /// A previously downloaded biosample type catalog (JSON, optionally
        /// gzipped). If not provided, the catalog is fetched from the
        /// archive.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Prints every filter option along with the cell type hierarchy.
    Options,

    /// Searches released files, experiments, or datasets.
    Search(SearchArgs),

    /// Prints the assemblies of released files.
    Assemblies {
        /// Restricts the assemblies to a single organism.
        #[arg(long)]
        organism: Option<String>,
    },

    /// Runs a region-overlap search for a BED file.
    Overlap {
        /// The BED file (optionally gzipped).
        bed: PathBuf,

        /// If desired, a permanent directory within which to do the work.
        /// This is generally for debugging only.
        #[arg(short, long)]
        directory: Option<PathBuf>,
    },
}

/// Explores ENCODE biosample metadata.
#[derive(Parser)]
struct Args {
    /// The configuration file.
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// The subcommand.
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args.config)?;

    match args.command {
        Command::Tree { catalog } => tree(&config, catalog.as_deref()),
        Command::Options => options(&config),
        Command::Search(filters) => search(&config, filters),
        Command::Assemblies { organism } => assemblies(&config, organism.as_deref()),
        Command::Overlap { bed, directory } => overlap(&config, &bed, directory),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .with_writer(std::io::stderr)
            .init(),
    };

    run(args)
}
