//! Bizdesk command-line interface
//!
//! Runs the same list and analytics code as the front-end against JSON
//! exports of the back-end API, and inspects persisted preferences.
//!
//! # Usage
//!
//! ```bash
//! bizdesk kpi documents.json                 # KPI summary
//! bizdesk kpi documents.json --format json   # KPIs as JSON
//! bizdesk linearize documents.json           # Flat records as JSON
//! bizdesk list documents.json --sort montant --desc --filter cities=Lyon
//! bizdesk list documents.json --search acme
//! bizdesk prefs get theme
//! bizdesk prefs set theme '"dark"'
//! bizdesk prefs remove theme
//! ```
//!
//! `-` reads the document collection from stdin.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use bizdesk::analytics::{
    AnalyticsPipeline, KpiOptions, Kpis, LinearField, LinearRecord, linearize,
};
use bizdesk::config::{self, AppConfig};
use bizdesk::core::filtering::{FilterKind, FilterSelection, fuzzy_search};
use bizdesk::core::sorting::{SortConfig, SortDirection, sorted_refs};
use bizdesk::storage::{StorageContext, validate_key};
use bizdesk::utils::{ensure_dirs, format_amount, get_state_dir, truncate_string};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bizdesk")]
#[command(about = "Business desk list, analytics and preference tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute KPIs for a document collection
    Kpi {
        /// JSON file with the document collection (`-` for stdin)
        file: PathBuf,
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Flatten a document collection and print the records as JSON
    Linearize {
        /// JSON file with the document collection (`-` for stdin)
        file: PathBuf,
    },
    /// Print documents as a sorted, filtered table
    List {
        /// JSON file with the document collection (`-` for stdin)
        file: PathBuf,
        /// Column to sort by (reference, client, ville, contact, montant, date, statut, kind)
        #[arg(short, long, default_value = "client")]
        sort: String,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Filter as KIND=VALUE (categories, cities, sectors, regions, companies); repeatable
        #[arg(short, long, value_name = "KIND=VALUE")]
        filter: Vec<String>,
        /// Fuzzy search over reference, client, contact and products
        #[arg(long)]
        search: Option<String>,
    },
    /// Inspect or edit persisted preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print the stored JSON for a key
    Get { key: String },
    /// Store a JSON value under a key
    Set { key: String, value: String },
    /// Delete a key
    Remove { key: String },
}

fn main() -> ExitCode {
    let _ = ensure_dirs();
    init_logging();
    let cli = Cli::parse();
    let config = config::load_config_blocking();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(handle_cli(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to `<state dir>/bizdesk.log` so stdout stays machine-readable
fn init_logging() {
    if let Some(mut log_path) = get_state_dir() {
        log_path.push("bizdesk.log");
        if let Ok(file) = std::fs::File::create(log_path) {
            tracing_subscriber::fmt().with_writer(file).init();
            return;
        }
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
}

async fn read_source(file: &Path) -> std::io::Result<Arc<str>> {
    if file == Path::new("-") {
        use tokio::io::AsyncReadExt;

        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(Arc::from(buf))
    } else {
        Ok(Arc::from(tokio::fs::read_to_string(file).await?))
    }
}

async fn handle_cli(
    command: Commands,
    config: AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Kpi { file, format } => {
            let source = read_source(&file).await?;

            let mut pipeline = AnalyticsPipeline::new(KpiOptions {
                won_statuses: config.won_statuses,
            });
            pipeline.set_source(source)?;
            let kpis = pipeline.kpis();

            match format.as_str() {
                "text" => print_kpis(&kpis),
                "json" => println!("{}", serde_json::to_string_pretty(&*kpis)?),
                _ => return Err("Invalid format. Use 'text' or 'json'.".into()),
            }
        }
        Commands::Linearize { file } => {
            let source = read_source(&file).await?;
            let records = linearize(&source)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::List {
            file,
            sort,
            desc,
            filter,
            search,
        } => {
            let key: LinearField = sort
                .parse()
                .map_err(|_| format!("Unknown sort column '{sort}'"))?;
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };

            let mut selection = FilterSelection::new();
            for arg in &filter {
                let (kind, value) = parse_filter(arg)?;
                selection.select(kind, value);
            }

            let source = read_source(&file).await?;
            let records = linearize(&source)?;
            let filtered: Vec<LinearRecord> = selection
                .snapshot()
                .apply(&records)
                .into_iter()
                .cloned()
                .collect();

            let rows: Vec<&LinearRecord> = match search.as_deref() {
                // Fuzzy results are ordered by relevance, not by column
                Some(query) if !query.trim().is_empty() => fuzzy_search(&filtered, query)
                    .into_iter()
                    .map(|(r, _)| r)
                    .collect(),
                _ => sorted_refs(&filtered, &SortConfig { key, direction }),
            };
            print_table(&rows);
            println!("{} of {} documents", rows.len(), records.len());
        }
        Commands::Prefs { action } => {
            let ctx = StorageContext::open(config.resolved_storage_dir());
            if !ctx.is_durable() {
                return Err("No data directory available for preferences".into());
            }

            match action {
                PrefsAction::Get { key } => match ctx.store.read(&key)? {
                    Some(raw) => println!("{raw}"),
                    None => println!("(not set)"),
                },
                PrefsAction::Set { key, value } => {
                    validate_key(&key)?;
                    let parsed: serde_json::Value = serde_json::from_str(&value).map_err(|e| {
                        format!("Value must be JSON (quote strings: '\"dark\"'): {e}")
                    })?;
                    ctx.store.write(&key, &serde_json::to_string_pretty(&parsed)?)?;
                    println!("✓ Saved '{key}'");
                }
                PrefsAction::Remove { key } => {
                    ctx.store.remove(&key)?;
                    println!("✓ Removed '{key}'");
                }
            }
        }
    }
    Ok(())
}

fn parse_filter(arg: &str) -> Result<(FilterKind, String), String> {
    let (kind, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("Filter '{arg}' must look like KIND=VALUE"))?;
    let kind: FilterKind = kind
        .trim()
        .parse()
        .map_err(|_| format!("Unknown filter kind '{kind}'"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("Filter '{arg}' has an empty value"));
    }
    Ok((kind, value.to_string()))
}

fn print_kpis(kpis: &Kpis) {
    println!("Documents:        {}", kpis.document_count);
    println!("Total:            {}", format_amount(kpis.total_montant));
    println!("Average:          {}", format_amount(kpis.average_montant));
    println!("Weighted:         {}", format_amount(kpis.weighted_montant));
    println!(
        "Won:              {} ({:.1}%)",
        kpis.won_count,
        kpis.acceptance_rate * 100.0
    );
    if let Some(top) = &kpis.top_client {
        println!("Top client:       {} ({})", top.nom, format_amount(top.montant));
    }

    if !kpis.count_by_status.is_empty() {
        println!();
        println!("By status:");
        for (statut, count) in &kpis.count_by_status {
            let montant = kpis.montant_by_status.get(statut).copied().unwrap_or_default();
            println!("  {statut:<16} {count:>5}  {:>16}", format_amount(montant));
        }
    }

    if !kpis.montant_by_month.is_empty() {
        println!();
        println!("By month:");
        for (month, montant) in &kpis.montant_by_month {
            println!("  {month}  {:>16}", format_amount(*montant));
        }
    }
}

fn print_table(rows: &[&LinearRecord]) {
    println!(
        "{:<14} {:<24} {:<14} {:>14} {:<10} {:<12}",
        "REFERENCE", "CLIENT", "VILLE", "MONTANT", "DATE", "STATUT"
    );
    for r in rows {
        let reference = r.reference.as_deref().unwrap_or(&r.document_id);
        let date = r.date.as_deref().unwrap_or("-");
        println!(
            "{:<14} {:<24} {:<14} {:>14} {:<10} {:<12}",
            truncate_string(reference, 14),
            truncate_string(&r.client_nom, 24),
            truncate_string(r.client_ville.as_deref().unwrap_or("-"), 14),
            format_amount(r.montant),
            truncate_string(date, 10),
            truncate_string(&r.statut, 12),
        );
    }
}
