// src/extractors/vocabulary.rs
//! Language-specific label tables. Every extractor is written once and reads
//! its labels, month names and number conventions from a [`Vocabulary`].

// --- Imports ---
use crate::extractors::benefits::BenefitKind;
use crate::extractors::numbers::NumberFormat;
use crate::extractors::sections::SectionKind;
use crate::extractors::table::TableShape;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Language ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "EN", alias = "en")]
    English,
    #[serde(rename = "FR", alias = "fr")]
    French,
}

impl Language {
    pub fn vocabulary(self) -> &'static Vocabulary {
        match self {
            Language::English => &ENGLISH,
            Language::French => &FRENCH,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "EN",
            Language::French => "FR",
        }
    }

    /// Looks for the "Executive summary" / "Sommaire principal" marker.
    pub fn detect<S: AsRef<str>>(lines: &[S]) -> Option<Language> {
        lines.iter().find_map(|line| {
            let lower = line.as_ref().to_lowercase();
            if lower.contains("executive summary") {
                Some(Language::English)
            } else if lower.contains("sommaire principal") {
                Some(Language::French)
            } else {
                None
            }
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EN" | "ENGLISH" => Ok(Language::English),
            "FR" | "FRENCH" => Ok(Language::French),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

// --- Months ---
/// Calendar months in benefit-year order (July through June).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    July,
    August,
    September,
    October,
    November,
    December,
    January,
    February,
    March,
    April,
    May,
    June,
}

impl Month {
    pub const BENEFIT_YEAR: [Month; 12] = [
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// --- Data Structures ---
pub struct TaxSummaryLabels {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub province: &'static str,
    pub federal_refund: &'static str,
    pub federal_owing: &'static str,
    pub provincial_refund: &'static str,
    pub provincial_owing: &'static str,
}

pub struct CarryforwardLabels {
    pub federal_tuition: &'static str,
    pub quebec_tuition_20: &'static str,
    pub quebec_tuition_8: &'static str,
    /// Tuition line used outside Québec, skipped when it names a province.
    pub generic_tuition: &'static str,
    pub provincial_marker: &'static str,
    /// Values end before this word when present (French "Annexe" column).
    pub value_terminator: Option<&'static str>,
}

/// Per-language shape of one benefit table.
#[derive(Debug, Clone, Copy)]
pub struct BenefitLayout {
    pub stated_total: Option<&'static str>,
    pub shape: TableShape,
}

pub struct Vocabulary {
    pub language: Language,
    pub number_format: NumberFormat,
    /// Indexed in benefit-year order, see [`Month::BENEFIT_YEAR`].
    pub month_names: [&'static str; 12],
    /// Recognized section titles, in match priority order.
    pub section_titles: Vec<(SectionKind, &'static str)>,
    pub tax_summary: TaxSummaryLabels,
    pub carryforward: CarryforwardLabels,
    pub document_prefix: &'static str,
    year_pattern: Regex,
}

impl Vocabulary {
    pub fn month_label(&self, month: Month, year: i32) -> String {
        format!("{} {}", self.month_names[month.index()], year)
    }

    pub fn title(&self, kind: SectionKind) -> Option<&'static str> {
        self.section_titles
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, title)| *title)
    }

    /// Reads the taxation year from a cover line such as
    /// "... for the 2023 taxation year".
    pub fn detect_year<S: AsRef<str>>(&self, lines: &[S]) -> Option<i32> {
        lines.iter().find_map(|line| {
            self.year_pattern
                .captures(line.as_ref())
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    pub fn benefit_layout(&self, kind: BenefitKind) -> BenefitLayout {
        let (stated_total, shape) = match (self.language, kind) {
            (Language::English, BenefitKind::GstCredit) => {
                (Some("Goods and Services Tax Credit"), TableShape::Simple)
            }
            (Language::French, BenefitKind::GstCredit) => (
                Some("Crédit pour taxe sur les produits et services"),
                TableShape::Simple,
            ),
            (Language::English, BenefitKind::ChildBenefit) => {
                (Some("Total entitlement ="), TableShape::TrailingPair)
            }
            (Language::French, BenefitKind::ChildBenefit) => {
                (Some("Prestation totale ="), TableShape::SkipCounts(3))
            }
            (_, BenefitKind::FamilyAllowance) => (None, TableShape::QuarterlyMonthly),
            (_, BenefitKind::SolidarityCredit)
            | (_, BenefitKind::CarbonRebate)
            | (_, BenefitKind::ClimateActionCredit)
            | (_, BenefitKind::OntarioTrillium) => (None, TableShape::Simple),
        };
        BenefitLayout { stated_total, shape }
    }
}

// --- Vocabulary Tables (Lazy Static) ---
static ENGLISH: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
    language: Language::English,
    number_format: NumberFormat::english(),
    month_names: [
        "July", "August", "September", "October", "November", "December", "January",
        "February", "March", "April", "May", "June",
    ],
    section_titles: vec![
        (SectionKind::TaxReturnSummary, "Tax return summary"),
        (SectionKind::GstCredit, "GST/HST Tax Credit"),
        (SectionKind::SolidarityCredit, "Solidarity Tax Credit"),
        (SectionKind::ChildBenefit, "calculation for the Canada Child Benefit (CCB)"),
        (SectionKind::CarryforwardSummary, "Summary of Carryforward Amounts"),
        (SectionKind::FamilyAllowance, "Family allowance measure"),
        (SectionKind::CarbonRebate, "Canada carbon rebate"),
        (SectionKind::OntarioTrillium, "Ontario Trillium Benefit"),
        (SectionKind::ClimateActionCredit, "British Columbia Climate Action Tax Credit"),
    ],
    tax_summary: TaxSummaryLabels {
        first_name: "First name",
        last_name: "Last name",
        province: "Province of residence",
        federal_refund: "Refund 48400",
        federal_owing: "Balance owing 48500",
        provincial_refund: "Refund 478",
        provincial_owing: "Balance due 479",
    },
    carryforward: CarryforwardLabels {
        federal_tuition: "Tuition and educations amounts - federal",
        quebec_tuition_20: "Tuition and educations amounts (20%) - Quebec",
        quebec_tuition_8: "Tuition and educations amounts (8%) - Quebec",
        generic_tuition: "Tuition and educations amounts",
        provincial_marker: "Provincial",
        value_terminator: None,
    },
    document_prefix: "Summary",
    year_pattern: Regex::new(r"(?i)\bfor\s+(?:the\s+)?(\d{4})\s+taxation\s+year")
        .expect("english year pattern"),
});

static FRENCH: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
    language: Language::French,
    number_format: NumberFormat::french(),
    month_names: [
        "juillet", "août", "septembre", "octobre", "novembre", "décembre", "janvier",
        "février", "mars", "avril", "mai", "juin",
    ],
    section_titles: vec![
        (SectionKind::TaxReturnSummary, "Sommaire de la déclaration"),
        (SectionKind::GstCredit, "Estimation du crédit pour la TPS/TVH"),
        (SectionKind::SolidarityCredit, "Estimation du calcul du crédit d'impôt pour solidarité"),
        (SectionKind::ChildBenefit, "l'allocation canadienne pour enfants"),
        (SectionKind::CarryforwardSummary, "Sommaire des montants reportés"),
        (SectionKind::FamilyAllowance, "la mesure de l'Allocation famille"),
        (SectionKind::CarbonRebate, "remise canadienne sur le carbone"),
        (SectionKind::OntarioTrillium, "Prestation Trillium de l'Ontario"),
        (SectionKind::ClimateActionCredit, "action climatique de la Colombie-Britannique"),
    ],
    tax_summary: TaxSummaryLabels {
        first_name: "Prénom",
        last_name: "Nom",
        province: "Province de résidence",
        federal_refund: "Remboursement 48400",
        federal_owing: "Solde dû 48500",
        provincial_refund: "Remboursement 478",
        provincial_owing: "Solde à payer 479",
    },
    carryforward: CarryforwardLabels {
        federal_tuition: "Frais de scolarité et montant relatif aux études - fédéral",
        quebec_tuition_20: "Frais de scolarité et montant relatif aux études (20%) - Québec",
        quebec_tuition_8: "Frais de scolarité et montant relatif aux études (8%) - Québec",
        generic_tuition: "Frais de scolarité et du montant relatif aux études",
        provincial_marker: "Provincial",
        value_terminator: Some("Annexe"),
    },
    document_prefix: "Sommaire",
    year_pattern: Regex::new(r"(?i)pour\s+l['’]ann[ée]e\s+d['’]imposition\s+(\d{4})")
        .expect("french year pattern"),
});
