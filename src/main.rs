// src/main.rs
use clap::Parser;
use std::path::{Path, PathBuf};
use tax_summary_extractor::extractors::Language;
use tax_summary_extractor::storage::StorageManager;
use tax_summary_extractor::summary::{self, ClientFile};
use tax_summary_extractor::utils::{self, AppError};
use tax_summary_extractor::ExtractionConfig;

/// Command Line Interface for the tax summary extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON manifest listing the client summary PDFs
    #[arg(short, long)]
    manifest: PathBuf,

    /// Output directory for the batch summary
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Debug mode - dump the segmented sections of every document
    #[arg(short, long)]
    debug: bool,

    /// Maximum baseline distance for words to share a line
    #[arg(long, default_value = "1.0")]
    line_tolerance: f32,

    /// Language assumed when a document has no language marker (EN or FR)
    #[arg(long, default_value = "EN")]
    default_language: Language,
}

fn load_manifest(path: &Path) -> Result<Vec<ClientFile>, AppError> {
    let content = std::fs::read_to_string(path)?;
    let clients: Vec<ClientFile> = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Invalid manifest {}: {}", path.display(), e)))?;

    // relative PDF paths are resolved against the manifest's directory
    let base = path.parent().map(PathBuf::from).unwrap_or_default();
    Ok(clients
        .into_iter()
        .map(|mut client| {
            if client.path.is_relative() {
                client.path = base.join(&client.path);
            }
            client
        })
        .collect())
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    if !(args.line_tolerance.is_finite() && args.line_tolerance >= 0.0) {
        return Err(AppError::Config(format!("Invalid line tolerance {}", args.line_tolerance)));
    }

    // 3. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;

    let config = ExtractionConfig {
        vertical_tolerance: args.line_tolerance,
        default_language: args.default_language,
        debug_dir: args.debug.then(|| storage.debug_dir()),
    };

    // 4. Load the client manifest
    let clients = load_manifest(&args.manifest)?;
    tracing::info!("Found {} client files", clients.len());

    if clients.is_empty() {
        return Err(AppError::Config(format!("No client files listed in {}", args.manifest.display())));
    }

    // 5. Extract every client, then group into cohorts
    let outcome = summary::run_batch(&clients, &config);
    let cohorts = summary::group_cohorts(outcome.records.clone());
    for cohort in &cohorts {
        tracing::info!("Cohort: {}", cohort.document_title());
    }

    // 6. Save the batch summary
    let path = storage.save_summary(&outcome, &cohorts)?;
    tracing::info!("Summary written to {}", path.display());

    let success_count = outcome.records.len();
    let failure_count = outcome.failures.len();
    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any of the {} client files",
            failure_count
        )));
    }

    Ok(())
}
