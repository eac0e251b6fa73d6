//! exoquery: build Exoplanet Archive queries and normalize their rows.
//!
//! # Usage
//!
//! ```bash
//! # Build a query
//! exoquery query --table ps --select pl_name,pl_masse --confirmed --limit 10
//!
//! # Full request URL for the TAP sync endpoint
//! exoquery query --table ps --select '*' --where 'pl_masse > 1' --url
//!
//! # Normalize a JSON array of rows
//! exoquery transform rows.json --format table
//! ```

use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use exoquery::prelude::*;
use exoquery::load::LoadSummary;
use exoquery::presets;
use exoquery::tap::QueryMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exoquery")]
#[command(version)]
#[command(about = "ADQL query builder and row normalizer for the NASA Exoplanet Archive", long_about = None)]
#[command(after_help = "EXAMPLES:
    exoquery query --table ps --select pl_name,pl_masse --confirmed --limit 10
    exoquery preset mass --min-mass 0.5 --max-mass 2 --url
    exoquery transform rows.json --format table
    exoquery transform rows.csv --input csv --format jsonl")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "EXOQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// TAP service root, overriding the config file
    #[arg(long, global = true, env = "EXOQUERY_BASE_URL")]
    base_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
    Jsonl,
}

#[derive(Clone, Copy, ValueEnum)]
enum Input {
    Json,
    Csv,
    Tsv,
}

impl From<Input> for OutputFormat {
    fn from(input: Input) -> Self {
        match input {
            Input::Json => OutputFormat::Json,
            Input::Csv => OutputFormat::Csv,
            Input::Tsv => OutputFormat::Tsv,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Confirmed,
    Candidates,
    Mass,
    Systems,
    Tess,
    Kepler,
    Microlensing,
}

/// How to print a built query.
#[derive(clap::Args)]
struct Emit {
    /// Print the URL-encoded form
    #[arg(long)]
    encoded: bool,

    /// Print the full TAP request URL
    #[arg(long, conflicts_with = "encoded")]
    url: bool,

    /// Use the asynchronous endpoint for --url
    #[arg(long = "async", requires = "url")]
    async_mode: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a query from clause flags
    Query {
        /// Table to query
        #[arg(short, long)]
        table: String,

        /// Comma-separated columns
        #[arg(short, long, value_delimiter = ',', default_value = "*")]
        select: Vec<String>,

        /// Replace all conditions with this one
        #[arg(long = "where")]
        where_: Option<String>,

        /// Append an AND condition
        #[arg(long)]
        and_where: Vec<String>,

        /// Append an OR condition
        #[arg(long)]
        or_where: Vec<String>,

        /// Confirmed planets only
        #[arg(long, conflicts_with = "candidates")]
        confirmed: bool,

        /// Candidate planets only
        #[arg(long)]
        candidates: bool,

        /// Default parameter sets only
        #[arg(long)]
        default_flag: bool,

        /// Discovery method, e.g. "Transit"
        #[arg(long)]
        method: Option<String>,

        /// Cone search: RA,DEC,RADIUS in degrees
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        circle: Vec<f64>,

        /// Maximum number of rows (rendered as TOP)
        #[arg(short, long)]
        limit: Option<u64>,

        /// Column to order by
        #[arg(long)]
        order_by: Option<String>,

        /// Descending order
        #[arg(long, requires = "order_by")]
        desc: bool,

        #[command(flatten)]
        emit: Emit,
    },
    /// Print one of the built-in queries
    Preset {
        #[arg(value_enum)]
        name: Preset,

        #[arg(short, long)]
        limit: Option<u64>,

        /// Disposition filter for tess / kepler
        #[arg(long)]
        disposition: Option<String>,

        /// Lower mass bound for `mass`, Earth masses
        #[arg(long, default_value_t = 0.0)]
        min_mass: f64,

        /// Upper mass bound for `mass`, Earth masses
        #[arg(long)]
        max_mass: Option<f64>,

        #[command(flatten)]
        emit: Emit,
    },
    /// Normalize rows from FILE or stdin
    Transform {
        file: Option<PathBuf>,

        /// Input layout: a JSON array of objects, or delimited text with a header row
        #[arg(short, long, value_enum, default_value = "json")]
        input: Input,

        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Skip the exoplanet-specific rules
        #[arg(long)]
        no_exoplanet: bool,
    },
    /// List archive tables
    Tables,
    /// List discovery methods
    Methods,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "exoquery=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("EXOQUERY_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = ExoConfig::load_or_default(cli.config.as_deref()).context("loading config")?;
    if let Some(base_url) = &cli.base_url {
        config.archive.base_url = base_url.clone();
        config.validate()?;
    }

    match &cli.command {
        Commands::Query {
            table,
            select,
            where_,
            and_where,
            or_where,
            confirmed,
            candidates,
            default_flag,
            method,
            circle,
            limit,
            order_by,
            desc,
            emit,
        } => {
            let mut query = QueryBuilder::new().select(select.iter().cloned()).from_table(table.as_str());
            if let Some(condition) = where_ {
                query = query.set_where(condition.as_str());
            }
            for condition in and_where {
                query = query.and_where(condition);
            }
            for condition in or_where {
                query = query.or_where(condition);
            }
            if *confirmed {
                query = query.where_confirmed();
            }
            if *candidates {
                query = query.where_candidates();
            }
            if *default_flag {
                query = query.where_default_flag();
            }
            if let Some(method) = method {
                query = match method.parse::<DiscoveryMethod>() {
                    Ok(m) => query.where_discovery_method(m),
                    Err(_) => query.where_discovery_method_str(method),
                };
            }
            match circle.as_slice() {
                [] => {}
                [ra, dec, radius] => query = query.where_spatial_circle(*ra, *dec, *radius),
                other => bail!("--circle takes RA,DEC,RADIUS, got {} value(s)", other.len()),
            }
            if let Some(column) = order_by {
                query = query.order_by(column, !desc);
            }
            if let Some(n) = limit {
                query = query.limit(*n);
            }
            emit_query(&query, emit, &config, cli.verbose)
        }
        Commands::Preset {
            name,
            limit,
            disposition,
            min_mass,
            max_mass,
            emit,
        } => {
            let query = match name {
                Preset::Confirmed => presets::confirmed_planets(&[], *limit),
                Preset::Candidates => presets::candidate_planets(&[], *limit),
                Preset::Mass => presets::planets_with_mass(*min_mass, *max_mass, *limit),
                Preset::Systems => presets::systems_overview(*limit),
                Preset::Tess => presets::tess_candidates(disposition.as_deref(), *limit),
                Preset::Kepler => presets::kepler_objects(disposition.as_deref(), *limit),
                Preset::Microlensing => presets::microlensing_events(*limit),
            };
            emit_query(&query, emit, &config, cli.verbose)
        }
        Commands::Transform {
            file,
            input,
            format,
            no_exoplanet,
        } => transform_rows(file.as_ref(), (*input).into(), *format, *no_exoplanet, &config),
        Commands::Tables => {
            list("Archive tables", TableName::all().iter().map(|t| t.as_str()));
            Ok(())
        }
        Commands::Methods => {
            list("Discovery methods", DiscoveryMethod::all().iter().map(|m| m.as_str()));
            Ok(())
        }
    }
}

fn emit_query(query: &QueryBuilder, emit: &Emit, config: &ExoConfig, verbose: bool) -> Result<()> {
    let adql = query.build()?;
    if verbose {
        eprintln!("{} {}", "ADQL:".dimmed(), adql.yellow());
    }

    if emit.url {
        let mode = if emit.async_mode { QueryMode::Async } else { QueryMode::Sync };
        let endpoint = TapEndpoint::from_config(&config.archive);
        println!("{}", endpoint.request_url(query, config.archive.format, mode)?);
    } else if emit.encoded {
        println!("{}", query.to_url_encoded()?);
    } else {
        println!("{}", adql);
    }
    Ok(())
}

fn transform_rows(
    file: Option<&PathBuf>,
    input: OutputFormat,
    format: Format,
    no_exoplanet: bool,
    config: &ExoConfig,
) -> Result<()> {
    let body = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let rows = decode_rows(&body, input)?;

    let mut transform = config.transform.clone();
    if no_exoplanet {
        transform.exoplanet_rules = false;
    }
    let pipeline = transform.build_pipeline();

    let mut sink = MemorySink::default();
    let summary = BatchLoader::from_config(&config.pipeline)?.run(&rows, &pipeline, &mut sink)?;
    let records: Vec<Record> = sink.records().cloned().collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        Format::Jsonl => {
            let mut out = JsonLinesSink::new(std::io::stdout().lock());
            out.write_batch(&records)?;
        }
        Format::Table => print_table(&records, summary),
    }
    Ok(())
}

fn print_table(records: &[Record], summary: LoadSummary) {
    if records.is_empty() {
        println!("{}", "(no rows)".dimmed());
        return;
    }

    let columns: Vec<&String> = records
        .iter()
        .flat_map(|r| r.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cell = |record: &Record, column: &String| -> String {
        record.get(column).map(|v| v.to_string()).unwrap_or_default()
    };

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| {
            records
                .iter()
                .map(|r| cell(r, c).len())
                .max()
                .unwrap_or(0)
                .max(c.len())
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:width$}", cell(record, c), width = *w))
            .collect();
        println!("{}", cells.join(" │ "));
    }

    println!();
    println!(
        "{} row(s) in {} batch(es)",
        summary.records.to_string().cyan(),
        summary.batches.to_string().cyan()
    );
}

fn list<'a>(title: &str, items: impl Iterator<Item = &'a str>) {
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for item in items {
        println!("  • {}", item.white());
    }
}
