// src/extractors/benefits.rs
//! Typed records built from section content: the tax-return summary, the
//! carryforward balances and one payment schedule per benefit program.

// --- Imports ---
use crate::extractors::fields::{amount_before_any, amount_between, remainder_after, text_after_label};
use crate::extractors::sections::SectionKind;
use crate::extractors::table::{row_amount, TableShape};
use crate::extractors::vocabulary::{Month, Vocabulary};
use crate::utils::error::ExtractError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Benefit Programs ---
/// Government benefit programs with a payment schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitKind {
    GstCredit,
    SolidarityCredit,
    ChildBenefit,
    FamilyAllowance,
    CarbonRebate,
    ClimateActionCredit,
    OntarioTrillium,
}

// --- Payment Calendars ---
/// Payment months as (month, years after the filing year).
type Calendar = &'static [(Month, i32)];

const QUARTERLY: Calendar = &[
    (Month::July, 1),
    (Month::October, 1),
    (Month::January, 2),
    (Month::April, 2),
];

// carbon rebate payments start in April of the year after filing
const CARBON_QUARTERLY: Calendar = &[
    (Month::April, 1),
    (Month::July, 1),
    (Month::October, 1),
    (Month::January, 2),
];

const MONTHLY: Calendar = &[
    (Month::July, 1),
    (Month::August, 1),
    (Month::September, 1),
    (Month::October, 1),
    (Month::November, 1),
    (Month::December, 1),
    (Month::January, 2),
    (Month::February, 2),
    (Month::March, 2),
    (Month::April, 2),
    (Month::May, 2),
    (Month::June, 2),
];

impl BenefitKind {
    pub const ALL: [BenefitKind; 7] = [
        BenefitKind::GstCredit,
        BenefitKind::SolidarityCredit,
        BenefitKind::ChildBenefit,
        BenefitKind::FamilyAllowance,
        BenefitKind::CarbonRebate,
        BenefitKind::ClimateActionCredit,
        BenefitKind::OntarioTrillium,
    ];

    pub fn section(self) -> SectionKind {
        match self {
            BenefitKind::GstCredit => SectionKind::GstCredit,
            BenefitKind::SolidarityCredit => SectionKind::SolidarityCredit,
            BenefitKind::ChildBenefit => SectionKind::ChildBenefit,
            BenefitKind::FamilyAllowance => SectionKind::FamilyAllowance,
            BenefitKind::CarbonRebate => SectionKind::CarbonRebate,
            BenefitKind::ClimateActionCredit => SectionKind::ClimateActionCredit,
            BenefitKind::OntarioTrillium => SectionKind::OntarioTrillium,
        }
    }

    pub fn calendar(self) -> Calendar {
        match self {
            BenefitKind::GstCredit
            | BenefitKind::FamilyAllowance
            | BenefitKind::ClimateActionCredit => QUARTERLY,
            BenefitKind::CarbonRebate => CARBON_QUARTERLY,
            BenefitKind::SolidarityCredit
            | BenefitKind::ChildBenefit
            | BenefitKind::OntarioTrillium => MONTHLY,
        }
    }

    /// Province whose residents receive this benefit, if it is provincial.
    pub fn province(self) -> Option<Province> {
        match self {
            BenefitKind::SolidarityCredit | BenefitKind::FamilyAllowance => Some(Province::Quebec),
            BenefitKind::OntarioTrillium => Some(Province::Ontario),
            BenefitKind::ClimateActionCredit => Some(Province::BritishColumbia),
            _ => None,
        }
    }

    pub fn applies_to(self, province: Province) -> bool {
        self.province().map_or(true, |p| p == province)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Province {
    Quebec,
    Ontario,
    BritishColumbia,
    Other,
}

impl Province {
    /// Maps the printed province of residence in either language.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'é' | 'è' | 'ê' => 'e',
                '-' => ' ',
                other => other,
            })
            .collect();

        if normalized.starts_with("quebec") {
            Province::Quebec
        } else if normalized.starts_with("ontario") {
            Province::Ontario
        } else if normalized.starts_with("british columbia")
            || normalized.starts_with("colombie britannique")
        {
            Province::BritishColumbia
        } else {
            Province::Other
        }
    }
}

// --- Tax Return Summary ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub first_name: String,
    pub last_name: String,
    pub province: String,
    pub federal_refund: Decimal,
    pub federal_owing: Decimal,
    pub provincial_refund: Decimal,
    pub provincial_owing: Decimal,
}

impl TaxSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn province_kind(&self) -> Province {
        Province::from_label(&self.province)
    }
}

/// Name, province and refund/balance figures from the tax-return summary.
/// Name and province are required; amounts default to zero.
pub fn extract_tax_summary<S: AsRef<str>>(lines: &[S], vocab: &Vocabulary) -> Result<TaxSummary, ExtractError> {
    let labels = &vocab.tax_summary;
    let fmt = &vocab.number_format;

    let mut first_name = None;
    let mut last_name = None;
    let mut province = None;
    let mut amounts = [Decimal::ZERO; 4];
    let amount_labels = [
        labels.federal_refund,
        labels.federal_owing,
        labels.provincial_refund,
        labels.provincial_owing,
    ];

    for line in lines.iter().map(|l| l.as_ref()) {
        if first_name.is_none() {
            first_name = text_after_label(line, labels.first_name);
        }
        if last_name.is_none() {
            last_name = text_after_label(line, labels.last_name);
        }
        if province.is_none() {
            province = text_after_label(line, labels.province);
        }
        for (slot, label) in amounts.iter_mut().zip(amount_labels) {
            let value = amount_between(label, "", line, fmt);
            if !value.is_zero() {
                *slot = value;
            }
        }
    }

    let [federal_refund, federal_owing, provincial_refund, provincial_owing] = amounts;
    Ok(TaxSummary {
        first_name: first_name.ok_or(ExtractError::MissingField("first name"))?.to_string(),
        last_name: last_name.ok_or(ExtractError::MissingField("last name"))?.to_string(),
        province: province.ok_or(ExtractError::MissingField("province"))?.to_string(),
        federal_refund,
        federal_owing,
        provincial_refund,
        provincial_owing,
    })
}

// --- Carryforwards ---
/// Unused tuition balances carried into later years.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarryforwardAmounts {
    pub federal_tuition: Decimal,
    pub quebec_tuition_20_percent: Decimal,
    pub quebec_tuition_8_percent: Decimal,
}

impl CarryforwardAmounts {
    pub fn is_empty(&self) -> bool {
        self.federal_tuition.is_zero()
            && self.quebec_tuition_20_percent.is_zero()
            && self.quebec_tuition_8_percent.is_zero()
    }
}

fn carryforward_value(line: &str, label: &str, vocab: &Vocabulary) -> Option<Decimal> {
    let mut rest = remainder_after(line, label)?;
    if let Some(terminator) = vocab.carryforward.value_terminator {
        if let Some(end) = rest.find(&terminator.to_lowercase()) {
            rest.truncate(end);
        }
    }
    let fmt = &vocab.number_format;
    let raw = fmt.find_whole_amount(&rest)?;
    Some(fmt.parse_whole_amount(raw))
}

/// Tuition carryforwards. Québec balances only exist for Québec residents;
/// elsewhere a generic tuition line supplies the federal balance.
pub fn extract_carryforward<S: AsRef<str>>(lines: &[S], province: Province, vocab: &Vocabulary) -> CarryforwardAmounts {
    let labels = &vocab.carryforward;
    let mut result = CarryforwardAmounts::default();

    for line in lines.iter().map(|l| l.as_ref()) {
        if let Some(v) = carryforward_value(line, labels.federal_tuition, vocab) {
            result.federal_tuition = v;
        } else if province != Province::Quebec && !line.contains(labels.provincial_marker) {
            if let Some(v) = carryforward_value(line, labels.generic_tuition, vocab) {
                result.federal_tuition = v;
            }
        }

        if province == Province::Quebec {
            if let Some(v) = carryforward_value(line, labels.quebec_tuition_20, vocab) {
                result.quebec_tuition_20_percent = v;
            }
            if let Some(v) = carryforward_value(line, labels.quebec_tuition_8, vocab) {
                result.quebec_tuition_8_percent = v;
            }
        }
    }

    result
}

// --- Benefit Schedules ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalSource {
    /// Read from the total printed in the document.
    Stated,
    /// Sum of the payment amounts.
    Summed,
}

/// Payments of one benefit over the benefit year plus their total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitSchedule {
    pub kind: BenefitKind,
    pub payments: BTreeMap<Month, Decimal>,
    pub total: Decimal,
    pub total_source: TotalSource,
}

impl BenefitSchedule {
    pub fn sum_of_payments(&self) -> Decimal {
        self.payments.values().copied().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_zero() && self.payments.values().all(Decimal::is_zero)
    }
}

/// Builds the schedule of `kind` from its section lines, for returns filed
/// for `year`.
pub fn extract_schedule<S: AsRef<str>>(
    kind: BenefitKind,
    lines: &[S],
    year: i32,
    vocab: &Vocabulary,
) -> BenefitSchedule {
    let layout = vocab.benefit_layout(kind);
    let fmt = &vocab.number_format;
    let labels: Vec<(Month, String)> = kind
        .calendar()
        .iter()
        .map(|&(month, offset)| (month, vocab.month_label(month, year + offset)))
        .collect();

    let mut payments: BTreeMap<Month, Decimal> =
        labels.iter().map(|(month, _)| (*month, Decimal::ZERO)).collect();
    let mut stated = Decimal::ZERO;

    for line in lines.iter().map(|l| l.as_ref()) {
        if let Some(total_label) = layout.stated_total {
            let value = amount_between(total_label, "", line, fmt);
            if !value.is_zero() {
                stated = value;
            }
        }

        for (month, label) in &labels {
            let value = match layout.shape {
                TableShape::Simple => {
                    let stops: Vec<&str> = labels
                        .iter()
                        .filter(|(other, _)| other != month)
                        .map(|(_, l)| l.as_str())
                        .collect();
                    amount_before_any(label, &stops, line, fmt)
                }
                shape => row_amount(line, label, shape, fmt),
            };
            if !value.is_zero() {
                tracing::trace!("{:?} {:?}: {}", kind, month, value);
                payments.insert(*month, value);
            }
        }
    }

    let summed: Decimal = payments.values().copied().sum();
    let (total, total_source) = if layout.stated_total.is_some() && !stated.is_zero() {
        (stated, TotalSource::Stated)
    } else {
        (summed, TotalSource::Summed)
    };

    tracing::debug!("{:?} total {} ({:?})", kind, total, total_source);
    BenefitSchedule { kind, payments, total, total_source }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::vocabulary::Language;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn en() -> &'static Vocabulary {
        Language::English.vocabulary()
    }

    fn fr() -> &'static Vocabulary {
        Language::French.vocabulary()
    }

    #[test]
    fn gst_credit_prefers_stated_total() {
        let lines = [
            "Goods and Services Tax Credit (if line 24 is less than $1, enter zero). 1 234 56",
            "July 2024 308 64 January 2025 308 64",
            "October 2024 308 64 April 2025 308 64",
        ];
        let schedule = extract_schedule(BenefitKind::GstCredit, &lines, 2023, en());
        assert_eq!(schedule.total, dec("1234.56"));
        assert_eq!(schedule.total_source, TotalSource::Stated);
        assert_eq!(schedule.payments[&Month::July], dec("308.64"));
        assert_eq!(schedule.payments[&Month::April], dec("308.64"));
        assert_eq!(schedule.sum_of_payments(), dec("1234.56"));
    }

    #[test]
    fn gst_credit_sums_without_stated_total() {
        let lines = ["juillet 2024 80 25 janvier 2025 80 25", "octobre 2024 80 25 avril 2025 80 00"];
        let schedule = extract_schedule(BenefitKind::GstCredit, &lines, 2023, fr());
        assert_eq!(schedule.total_source, TotalSource::Summed);
        assert_eq!(schedule.total, dec("320.75"));
    }

    #[test]
    fn solidarity_reads_six_months_per_line() {
        let lines = [
            "July 2024 45 50 August 2024 45 50 September 2024 45 50 October 2024 45 50 November 2024 45 50 December 2024 45 50",
            "January 2025 46 00 February 2025 46 00 March 2025 46 00 April 2025 46 00 May 2025 46 00 June 2025 46 00",
        ];
        let schedule = extract_schedule(BenefitKind::SolidarityCredit, &lines, 2023, en());
        assert_eq!(schedule.payments.len(), 12);
        assert_eq!(schedule.payments[&Month::December], dec("45.50"));
        assert_eq!(schedule.payments[&Month::June], dec("46.00"));
        assert_eq!(schedule.total, dec("549.00"));
    }

    #[test]
    fn child_benefit_english_uses_trailing_pair() {
        let lines = [
            "Total entitlement = 6 497 76",
            "July 2024 2 0 541 48",
            "August 2024 2 0 541 48",
        ];
        let schedule = extract_schedule(BenefitKind::ChildBenefit, &lines, 2023, en());
        assert_eq!(schedule.payments[&Month::July], dec("541.48"));
        assert_eq!(schedule.payments[&Month::September], Decimal::ZERO);
        assert_eq!(schedule.total, dec("6497.76"));
    }

    #[test]
    fn child_benefit_french_skips_count_columns() {
        let lines = [
            "Juillet 2024 2 0 1 512 32",
            "Août 2024 2 0 1 512 32",
            "Janvier 2025 2 0 0 1 024 10",
        ];
        let schedule = extract_schedule(BenefitKind::ChildBenefit, &lines, 2023, fr());
        assert_eq!(schedule.payments[&Month::July], dec("512.32"));
        assert_eq!(schedule.payments[&Month::January], dec("1024.10"));
        // no "Prestation totale" line: total falls back to the sum
        assert_eq!(schedule.total_source, TotalSource::Summed);
        assert_eq!(schedule.total, dec("2048.74"));
    }

    #[test]
    fn family_allowance_recovers_thousands_digit() {
        let lines = [
            "Juillet 2024 0 1 596 96 532 32",
            "Octobre 2024 2 1 596 96 198 99",
            "Janvier 2025 0 0 596 96 198 99",
            "Avril 2025 0 0 596 96 198 99",
        ];
        let schedule = extract_schedule(BenefitKind::FamilyAllowance, &lines, 2023, fr());
        assert_eq!(schedule.payments[&Month::July], dec("1596.96"));
        assert_eq!(schedule.payments[&Month::October], dec("596.96"));
        assert_eq!(schedule.total, dec("3387.84"));
    }

    #[test]
    fn family_allowance_english_reads_comma_grouped_quarters() {
        let lines = ["July 2024 0 1,596 96 532 32", "October 2024 0 596 96 198 99"];
        let schedule = extract_schedule(BenefitKind::FamilyAllowance, &lines, 2023, en());
        assert_eq!(schedule.payments[&Month::July], dec("1596.96"));
        assert_eq!(schedule.payments[&Month::October], dec("596.96"));
        assert_eq!(schedule.total, dec("2193.92"));
    }

    #[test]
    fn carbon_rebate_always_sums() {
        let lines = [
            "Line 5 plus line 6 999 99",
            "April 2024 140 00 October 2024 140 00",
            "July 2024 140 00 January 2025 140 00",
        ];
        let schedule = extract_schedule(BenefitKind::CarbonRebate, &lines, 2023, en());
        assert_eq!(schedule.total, dec("560.00"));
        assert_eq!(schedule.total_source, TotalSource::Summed);
        assert_eq!(schedule.payments[&Month::April], dec("140.00"));
    }

    #[test]
    fn climate_credit_and_trillium_sum_components() {
        let lines = ["July 2024 126 50 January 2025 126 50", "October 2024 126 50 April 2025 126 50"];
        let climate = extract_schedule(BenefitKind::ClimateActionCredit, &lines, 2023, en());
        assert_eq!(climate.total, dec("506.00"));

        let lines = ["July 2024 90 00 January 2025 91 00", "August 2024 90 00 February 2025 91 00"];
        let trillium = extract_schedule(BenefitKind::OntarioTrillium, &lines, 2023, en());
        assert_eq!(trillium.payments[&Month::February], dec("91.00"));
        assert_eq!(trillium.total, dec("362.00"));
    }

    #[test]
    fn summed_benefits_total_matches_payments() {
        let lines = [
            "July 2024 10 01 August 2024 20 02 October 2024 30 03 January 2025 40 04 April 2025 50 05",
            "juillet 2024 0 0 150 00 50 00 octobre 2024 0 0 150 00 50 00",
        ];
        for language in [Language::English, Language::French] {
            let vocab = language.vocabulary();
            for kind in BenefitKind::ALL {
                if vocab.benefit_layout(kind).stated_total.is_some() {
                    continue;
                }
                let schedule = extract_schedule(kind, &lines, 2023, vocab);
                let diff = (schedule.total - schedule.sum_of_payments()).abs();
                assert!(diff <= dec("0.01"), "{:?}/{:?}", language, kind);
            }
        }
    }

    #[test]
    fn empty_section_gives_empty_schedule() {
        let lines: [&str; 0] = [];
        let schedule = extract_schedule(BenefitKind::GstCredit, &lines, 2023, en());
        assert!(schedule.is_empty());
        assert_eq!(schedule.payments.len(), 4);
    }

    #[test]
    fn tax_summary_reads_names_and_amounts() {
        let lines = [
            "First name John",
            "Last name Smith",
            "Province of residence Quebec",
            "Refund 48400 1,250 75",
            "Balance due 479 = 312 00",
        ];
        let summary = extract_tax_summary(&lines, en()).unwrap();
        assert_eq!(summary.full_name(), "John Smith");
        assert_eq!(summary.province_kind(), Province::Quebec);
        assert_eq!(summary.federal_refund, dec("1250.75"));
        assert_eq!(summary.federal_owing, Decimal::ZERO);
        assert_eq!(summary.provincial_owing, dec("312.00"));
    }

    #[test]
    fn french_tax_summary_does_not_confuse_prenom_and_nom() {
        let lines = [
            "Prénom Marie",
            "Nom Tremblay",
            "Province de résidence Québec",
            "Solde dû 48500 1 020 00",
            "Remboursement 478 = 85 10",
        ];
        let summary = extract_tax_summary(&lines, fr()).unwrap();
        assert_eq!(summary.first_name, "Marie");
        assert_eq!(summary.last_name, "Tremblay");
        assert_eq!(summary.federal_owing, dec("1020.00"));
        assert_eq!(summary.provincial_refund, dec("85.10"));
    }

    #[test]
    fn tax_summary_without_province_is_malformed() {
        let lines = ["First name John", "Last name Smith"];
        assert!(matches!(
            extract_tax_summary(&lines, en()),
            Err(ExtractError::MissingField("province"))
        ));
    }

    #[test]
    fn carryforward_for_quebec_resident() {
        let lines = [
            "Tuition and educations amounts - federal 5,000 Schedule 11",
            "Tuition and educations amounts (20%) - Quebec 3,200",
            "Tuition and educations amounts (8%) - Quebec 800",
        ];
        let amounts = extract_carryforward(&lines, Province::Quebec, en());
        assert_eq!(amounts.federal_tuition, dec("5000"));
        assert_eq!(amounts.quebec_tuition_20_percent, dec("3200"));
        assert_eq!(amounts.quebec_tuition_8_percent, dec("800"));
    }

    #[test]
    fn carryforward_outside_quebec_uses_generic_line() {
        let lines = [
            "Tuition and educations amounts 2,450",
            "Tuition and educations amounts - Provincial 1,900",
            "Tuition and educations amounts (20%) - Quebec 3,200",
        ];
        let amounts = extract_carryforward(&lines, Province::Ontario, en());
        assert_eq!(amounts.federal_tuition, dec("2450"));
        assert!(amounts.quebec_tuition_20_percent.is_zero());
    }

    #[test]
    fn french_carryforward_stops_at_annexe() {
        let lines = ["Frais de scolarité et montant relatif aux études - fédéral 12 500 Annexe 11"];
        let amounts = extract_carryforward(&lines, Province::Quebec, fr());
        assert_eq!(amounts.federal_tuition, dec("12500"));
    }

    #[test]
    fn provincial_benefits_are_gated_by_province() {
        assert!(BenefitKind::SolidarityCredit.applies_to(Province::Quebec));
        assert!(!BenefitKind::SolidarityCredit.applies_to(Province::Ontario));
        assert!(BenefitKind::GstCredit.applies_to(Province::Other));
        assert_eq!(Province::from_label("Colombie-Britannique"), Province::BritishColumbia);
        assert_eq!(Province::from_label("Québec"), Province::Quebec);
    }
}
