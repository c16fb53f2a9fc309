//! Freightload CLI - generate and manage freight exchange test offers
//!
//! # Main Commands
//!
//! ```bash
//! freightload serve                          # Start HTTP server (port 3000)
//! freightload generate freight -n 50         # Generate offers from data/freight.csv
//! freightload generate vehicle-space --post  # Generate and submit
//! freightload post freight offers.json       # Submit a JSON array of offers
//! freightload list freight                   # List our offers
//! freightload delete-all freight --yes       # Delete every offer of a kind
//! ```
//!
//! # CSV Commands
//!
//! ```bash
//! freightload parse input.csv        # Just parse CSV to JSON
//! freightload csv-info freight       # Inspect the canonical CSV
//! freightload backups                # List CSV backups
//! freightload restore <filename>     # Restore a backup
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use freightload::{
    delete_all, generate_offers, parse_csv_file_auto, start_server, submit_offers, validate_count,
    BulkOptions, CsvStore, OfferApi, OfferKind, Settings, TimocomClient,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "freightload")]
#[command(about = "Generate and submit freight exchange test offers", long_about = None)]
struct Cli {
    /// Data directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Freight,
    VehicleSpace,
}

impl From<Kind> for OfferKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Freight => OfferKind::Freight,
            Kind::VehicleSpace => OfferKind::VehicleSpace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate offers from the canonical CSV
    Generate {
        #[arg(value_enum)]
        kind: Kind,

        /// Number of offers (1..=10000)
        #[arg(short = 'n', long, default_value = "10")]
        count: i64,

        /// Read this CSV instead of the canonical one
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output file (default: JSON export under the data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Submit the generated offers
        #[arg(long)]
        post: bool,
    },

    /// Submit a JSON array of offers
    Post {
        #[arg(value_enum)]
        kind: Kind,

        /// Input JSON file
        input: PathBuf,
    },

    /// List our offers of one kind
    List {
        #[arg(value_enum)]
        kind: Kind,
    },

    /// Delete every offer of one kind
    DeleteAll {
        #[arg(value_enum)]
        kind: Kind,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect the canonical CSV of one kind
    CsvInfo {
        #[arg(value_enum)]
        kind: Kind,
    },

    /// List CSV backups
    Backups,

    /// Restore a CSV backup
    Restore {
        /// Backup file name, e.g. freight_backup_20260101_120000.csv
        filename: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let result = match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            start_server(settings).await
        }

        Commands::Generate {
            kind,
            count,
            csv,
            output,
            post,
        } => cmd_generate(&settings, kind.into(), count, csv, output.as_deref(), post).await,

        Commands::Post { kind, input } => cmd_post(&settings, kind.into(), &input).await,

        Commands::List { kind } => cmd_list(kind.into()).await,

        Commands::DeleteAll { kind, yes } => cmd_delete_all(&settings, kind.into(), yes).await,

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::CsvInfo { kind } => cmd_csv_info(&settings, kind.into()),

        Commands::Backups => cmd_backups(&settings),

        Commands::Restore { filename } => cmd_restore(&settings, &filename),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn store(settings: &Settings) -> CsvStore {
    CsvStore::new(&settings.data_dir, settings.backup_retention)
}

fn bulk_options(settings: &Settings) -> BulkOptions {
    BulkOptions {
        concurrency: settings.bulk_concurrency,
        retry_delay: settings.retry_delay,
        batch_delay: settings.batch_delay,
    }
}

fn client() -> Result<TimocomClient, Box<dyn std::error::Error>> {
    TimocomClient::from_env().map_err(|e| format!("{} ({})", e, e.hint()).into())
}

async fn cmd_generate(
    settings: &Settings,
    kind: OfferKind,
    count: i64,
    csv: Option<PathBuf>,
    output: Option<&Path>,
    post: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let count = validate_count(count)?;
    // fail on credentials before generating anything
    let api = if post { Some(client()?) } else { None };

    let store = store(settings);
    let path = csv.unwrap_or_else(|| store.csv_path(kind));
    eprintln!("📄 Generating {} {}s from {}", count, kind.label(), path.display());

    let report = generate_offers(kind, &path, count)?;
    eprintln!(
        "   {} usable rows, {} variations, {} rows skipped",
        report.usable_rows,
        report.variations,
        report.skipped.len()
    );

    match output {
        Some(out) => {
            let json = serde_json::to_string_pretty(&report.offers)?;
            write_output(&json, Some(out))?;
        }
        None => {
            let exported = store.export_offers(kind, &report.offers)?;
            eprintln!("💾 Exported to: {}", exported.display());
        }
    }

    if let Some(api) = api {
        let payloads = report
            .offers
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let result = submit_offers(&api, kind, &payloads, bulk_options(settings)).await;
        print_json(&result)?;
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_post(settings: &Settings, kind: OfferKind, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📤 Posting: {}", input.display());

    let content = fs::read_to_string(input)?;
    let offers: Vec<Value> = serde_json::from_str(&content)?;
    eprintln!("   {} {}s", offers.len(), kind.label());

    let api = client()?;
    let result = submit_offers(&api, kind, &offers, bulk_options(settings)).await;
    print_json(&result)?;

    if result.failed > 0 {
        return Err(format!("{} of {} offers failed", result.failed, result.total).into());
    }
    Ok(())
}

async fn cmd_list(kind: OfferKind) -> Result<(), Box<dyn std::error::Error>> {
    let api = client()?;
    let response = api.list(kind).await?;
    print_json(&response.data)
}

async fn cmd_delete_all(settings: &Settings, kind: OfferKind, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err(format!("Refusing to delete all {}s without --yes", kind.label()).into());
    }

    let api = client()?;
    let result = delete_all(&api, kind, settings.delete_delay).await?;
    print_json(&result)
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_csv_info(settings: &Settings, kind: OfferKind) -> Result<(), Box<dyn std::error::Error>> {
    let info = store(settings).info(kind)?;
    print_json(&info)
}

fn cmd_backups(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let backups = store(settings).backups()?;
    if backups.is_empty() {
        eprintln!("📋 No backups yet.");
        return Ok(());
    }

    eprintln!("📋 Backups ({}):\n", backups.len());
    for b in backups {
        println!("  📄 {} ({} bytes)", b.filename, b.size_bytes);
    }
    Ok(())
}

fn cmd_restore(settings: &Settings, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = store(settings).restore(filename)?;
    eprintln!("♻️  Restored {} to {}", filename, outcome.path);
    if let Some(backup) = &outcome.backup {
        eprintln!("   Previous file saved as {}", backup);
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
