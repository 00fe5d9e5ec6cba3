// src/summary/record.rs
//! One client-year record per input document, built by running the
//! extraction stages in order, and the batch loop that collects them.

use crate::config::ExtractionConfig;
use crate::extractors::benefits::{
    extract_carryforward, extract_schedule, extract_tax_summary, BenefitKind, BenefitSchedule,
    CarryforwardAmounts, TaxSummary,
};
use crate::extractors::layout::document_lines;
use crate::extractors::sections::{segment_required, SectionKind};
use crate::extractors::vocabulary::Language;
use crate::pdf::reader;
use crate::utils::debug_dump;
use crate::utils::error::ExtractError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

/// Placeholder partner label used for clients filed on their own.
const NO_PARTNER: &str = "Individual Summary";

/// One entry of the batch manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFile {
    #[serde(alias = "summary_file_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub label: String,
    /// Filing year hint. Read from the document when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub couple_with: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    /// Language hint. Overrides marker-phrase detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl ClientFile {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            year: None,
            couple_with: None,
            is_primary: false,
            language: None,
        }
    }

    /// The declared partner's label, if this client files as part of a couple.
    pub fn partner_label(&self) -> Option<&str> {
        self.couple_with
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty() && *label != NO_PARTNER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientYearRecord {
    pub client: ClientFile,
    pub year: i32,
    pub language: Language,
    pub tax_summary: TaxSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carryforward: Option<CarryforwardAmounts>,
    pub benefits: BTreeMap<BenefitKind, BenefitSchedule>,
}

impl ClientYearRecord {
    pub fn full_name(&self) -> String {
        self.tax_summary.full_name()
    }
}

fn resolve_language<S: AsRef<str>>(client: &ClientFile, lines: &[S], config: &ExtractionConfig) -> Language {
    if let Some(language) = client.language {
        return language;
    }
    Language::detect(lines).unwrap_or_else(|| {
        tracing::warn!(
            "No language marker in {}, assuming {}",
            client.path.display(),
            config.default_language
        );
        config.default_language
    })
}

/// Builds a record from the reconstructed lines of one document.
pub fn build_record<S: AsRef<str>>(
    client: &ClientFile,
    lines: &[S],
    config: &ExtractionConfig,
) -> Result<ClientYearRecord, ExtractError> {
    let language = resolve_language(client, lines, config);
    let vocab = language.vocabulary();
    let year = client
        .year
        .or_else(|| vocab.detect_year(lines))
        .ok_or(ExtractError::UnknownYear)?;

    let sections = segment_required(lines, vocab)?;

    if let Some(dir) = &config.debug_dir {
        if let Err(e) = debug_dump::save_sections(dir, &client.path, &sections) {
            tracing::warn!("Failed to save section dump for {}: {}", client.path.display(), e);
        }
    }

    let tax_summary = extract_tax_summary(sections.lines(SectionKind::TaxReturnSummary), vocab)?;
    let province = tax_summary.province_kind();
    tracing::debug!("{} resides in {:?} ({})", tax_summary.full_name(), province, tax_summary.province);

    let carryforward = Some(extract_carryforward(
        sections.lines(SectionKind::CarryforwardSummary),
        province,
        vocab,
    ))
    .filter(|amounts| !amounts.is_empty());

    let mut benefits = BTreeMap::new();
    for kind in BenefitKind::ALL {
        if !sections.contains(kind.section()) {
            continue;
        }
        if !kind.applies_to(province) {
            tracing::debug!("Skipping {:?}: not paid in {:?}", kind, province);
            continue;
        }
        let schedule = extract_schedule(kind, sections.lines(kind.section()), year, vocab);
        tracing::debug!("{:?}: total {} ({:?})", kind, schedule.total, schedule.total_source);
        if !schedule.is_empty() {
            benefits.insert(kind, schedule);
        }
    }

    Ok(ClientYearRecord {
        client: client.clone(),
        year,
        language,
        tax_summary,
        carryforward,
        benefits,
    })
}

/// Reads the client's PDF and builds its record.
pub fn extract_client(client: &ClientFile, config: &ExtractionConfig) -> Result<ClientYearRecord, ExtractError> {
    let pages = reader::read_pages(&client.path)?;
    let lines = document_lines(&pages, config.vertical_tolerance);
    tracing::debug!("{}: {} lines", client.path.display(), lines.len());
    build_record(client, &lines, config)
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// A client whose document could not be extracted.
#[derive(Debug, Serialize)]
pub struct ClientFailure {
    pub path: PathBuf,
    pub label: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ExtractError,
}

/// Records of every client that extracted cleanly plus the failures.
#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    pub records: Vec<ClientYearRecord>,
    pub failures: Vec<ClientFailure>,
}

/// Runs `extract` over every client in order. A failing client is recorded
/// and the batch continues.
pub fn run_batch_with<F>(clients: &[ClientFile], mut extract: F) -> BatchOutcome
where
    F: FnMut(&ClientFile) -> Result<ClientYearRecord, ExtractError>,
{
    let mut outcome = BatchOutcome::default();

    for client in clients {
        tracing::info!("Processing {} ({})", client.label, client.path.display());
        match extract(client) {
            Ok(record) => {
                tracing::info!(
                    "Extracted {} {}: {} benefit schedule(s)",
                    record.full_name(),
                    record.year,
                    record.benefits.len()
                );
                outcome.records.push(record);
            }
            Err(error) => {
                if error.is_malformed_document() {
                    tracing::error!("Malformed document {}: {}", client.path.display(), error);
                } else {
                    tracing::error!("Failed to read {}: {}", client.path.display(), error);
                }
                outcome.failures.push(ClientFailure {
                    path: client.path.clone(),
                    label: client.label.clone(),
                    error,
                });
            }
        }
    }

    outcome
}

pub fn run_batch(clients: &[ClientFile], config: &ExtractionConfig) -> BatchOutcome {
    run_batch_with(clients, |client| extract_client(client, config))
}
