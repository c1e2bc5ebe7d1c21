// src/main.rs
use clap::{Parser, Subcommand};
use disclosure_extractor::chinamoney::client::{self, BondClient, FetchConfig};
use disclosure_extractor::extractors::{parse_rule_sets, reg_search_with, ExtractOptions};
use disclosure_extractor::storage::StorageManager;
use disclosure_extractor::utils::{self, error::StorageError, AppError};
use std::path::Path;
use std::time::Duration;

/// Command Line Interface for disclosure field extraction and bond list download
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract structured fields from a disclosure text file
    Extract {
        /// UTF-8 disclosure text
        #[arg(short, long)]
        text: String,

        /// JSON array of rule-sets, e.g. [{"标的证券": "*自定义*"}]
        #[arg(short, long)]
        rules: String,

        /// Directory for the results and metadata files (prints to stdout if omitted)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Fail when the custom sentinel is used on a field with no custom extractor
        #[arg(long)]
        strict: bool,
    },

    /// Download the ChinaMoney bond list page by page into a CSV file
    FetchBonds {
        /// ChinaMoney bond type code
        #[arg(long, default_value = "100001")]
        bond_type: String,

        /// Label written to the Bond Type column
        #[arg(long, default_value = "Treasury Bond")]
        bond_type_label: String,

        /// Issue year to query
        #[arg(long, default_value = "2023")]
        issue_year: String,

        /// Rows requested per page
        #[arg(long, default_value_t = 15)]
        page_size: u32,

        /// Pause between pages in milliseconds
        #[arg(long, default_value_t = 150)]
        delay_ms: u64,

        /// Output directory for the CSV file
        #[arg(short, long, default_value = ".")]
        output_dir: String,

        /// CSV file name (defaults to treasury_bond_<issue_year>.csv)
        #[arg(short, long)]
        file_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    match args.command {
        Command::Extract { text, rules, output_dir, strict } => {
            run_extract(&text, &rules, output_dir.as_deref(), strict)
        }
        Command::FetchBonds {
            bond_type,
            bond_type_label,
            issue_year,
            page_size,
            delay_ms,
            output_dir,
            file_name,
        } => {
            if page_size == 0 {
                return Err(AppError::Config("--page-size must be at least 1".to_string()));
            }
            let file_name = file_name.unwrap_or_else(|| format!("treasury_bond_{}.csv", issue_year));
            let config = FetchConfig {
                bond_type_code: bond_type,
                issue_year,
                page_size,
                page_delay: Duration::from_millis(delay_ms),
                bond_type_label,
                ..FetchConfig::default()
            };
            run_fetch_bonds(config, &output_dir, &file_name).await
        }
    }
}

fn run_extract(text_path: &str, rules_path: &str, output_dir: Option<&str>, strict: bool) -> Result<(), AppError> {
    let text = std::fs::read_to_string(text_path)?;
    let rule_sets = parse_rule_sets(&std::fs::read_to_string(rules_path)?)?;
    tracing::info!("Loaded {} rule-sets from {}", rule_sets.len(), rules_path);

    let options = ExtractOptions { strict_custom_fields: strict };
    let results = reg_search_with(&text, &rule_sets, &options)?;

    for (index, result) in results.iter().enumerate() {
        let missing: Vec<&str> = result
            .iter()
            .filter(|(_, value)| value.is_absent())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Rule-set {}: no value for {:?}", index, missing);
        }
    }

    match output_dir {
        Some(dir) => {
            let storage = StorageManager::new(dir)?;
            let stem = Path::new(text_path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");

            // Metadata describes the saved results, so it is only written once they are on disk.
            storage.save_extraction(stem, text_path, &results)?;
        }
        None => {
            let json = serde_json::to_string_pretty(&results)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            println!("{}", json);
        }
    }

    Ok(())
}

async fn run_fetch_bonds(config: FetchConfig, output_dir: &str, file_name: &str) -> Result<(), AppError> {
    let storage = StorageManager::new(output_dir)?;
    let bond_client = BondClient::new(config)?;
    tracing::info!(
        "Fetching bond type {} issued in {}",
        bond_client.config().bond_type_code,
        bond_client.config().issue_year
    );

    let summary = client::fetch_all(&bond_client, bond_client.config()).await?;
    let path = storage.save_bond_csv(file_name, &summary.rows)?;

    tracing::info!(
        "Saved: {} | rows={} | pages={}",
        path.display(),
        summary.rows.len(),
        summary.pages
    );
    Ok(())
}
