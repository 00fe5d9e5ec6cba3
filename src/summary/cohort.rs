// src/summary/cohort.rs
//! Groups client-year records into the cohorts that each get one output
//! document: couples for a single year, individuals across years.

use crate::extractors::vocabulary::Language;
use crate::summary::record::ClientYearRecord;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cohort {
    Couple {
        label: String,
        primary: ClientYearRecord,
        secondary: ClientYearRecord,
    },
    Individual {
        name: String,
        /// Sorted by year, ascending.
        records: Vec<ClientYearRecord>,
    },
}

impl Cohort {
    pub fn years(&self) -> Vec<i32> {
        match self {
            Cohort::Couple { primary, .. } => vec![primary.year],
            Cohort::Individual { records, .. } => records.iter().map(|r| r.year).collect(),
        }
    }

    /// Language of the output document: that of the first record.
    pub fn language(&self) -> Language {
        match self {
            Cohort::Couple { primary, .. } => primary.language,
            Cohort::Individual { records, .. } => {
                records.first().map(|r| r.language).unwrap_or_default()
            }
        }
    }

    /// Title of the cohort's output document, e.g. "Summary Ann Lee 2021, 2022 & 2023".
    pub fn document_title(&self) -> String {
        let prefix = self.language().vocabulary().document_prefix;
        match self {
            Cohort::Couple { primary, secondary, .. } => format!(
                "{} {} & {} {}",
                prefix,
                primary.full_name(),
                secondary.full_name(),
                primary.year
            ),
            Cohort::Individual { records, .. } => {
                let name = records.first().map(|r| r.full_name()).unwrap_or_default();
                format!("{} {} {}", prefix, name, join_years(&self.years()))
            }
        }
    }
}

fn join_years(years: &[i32]) -> String {
    match years {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(i32::to_string).collect();
            format!("{} & {}", head.join(", "), last)
        }
    }
}

/// Lowercased full name with whitespace collapsed.
fn name_key(record: &ClientYearRecord) -> String {
    record
        .full_name()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Groups records into couple and individual cohorts. Couples come first, in
/// input order, followed by individuals in order of first appearance.
///
/// A couple aggregates one year only: records of the same pair for later
/// years are dropped. Members of an incomplete couple (partner missing, or
/// not exactly one primary) are treated as individuals.
pub fn group_cohorts(records: Vec<ClientYearRecord>) -> Vec<Cohort> {
    let mut slots: Vec<Option<ClientYearRecord>> = records.into_iter().map(Some).collect();
    let mut couples = Vec::new();
    let mut seen_pairs: Vec<(String, String)> = Vec::new();
    let mut singles: Vec<ClientYearRecord> = Vec::new();

    for i in 0..slots.len() {
        let Some(record) = slots[i].take() else {
            continue;
        };
        let Some(partner_label) = record.client.partner_label().map(str::to_string) else {
            singles.push(record);
            continue;
        };

        let key = pair_key(&record.client.label, &partner_label);
        if seen_pairs.contains(&key) {
            tracing::warn!(
                "Couple '{}' already grouped for another year, dropping {} {}",
                partner_label,
                record.full_name(),
                record.year
            );
            continue;
        }

        // the partner must name this client back
        let own_label = record.client.label.trim();
        let partner_index = (i + 1..slots.len()).find(|&j| {
            slots[j].as_ref().is_some_and(|other| {
                other.client.label == partner_label
                    && other.client.partner_label() == Some(own_label)
                    && other.year == record.year
            })
        });
        let Some(partner) = partner_index.and_then(|j| slots[j].take()) else {
            tracing::warn!(
                "Partner '{}' of {} not found for {}, treating as individual",
                partner_label,
                record.full_name(),
                record.year
            );
            singles.push(record);
            continue;
        };

        let (primary, secondary) = match (record.client.is_primary, partner.client.is_primary) {
            (true, false) => (record, partner),
            (false, true) => (partner, record),
            _ => {
                tracing::warn!(
                    "Couple '{}' needs exactly one primary member, treating both as individuals",
                    partner_label
                );
                singles.push(record);
                singles.push(partner);
                continue;
            }
        };

        tracing::debug!("Grouped couple {} & {}", primary.full_name(), secondary.full_name());
        seen_pairs.push(key);
        couples.push(Cohort::Couple {
            label: partner_label,
            primary,
            secondary,
        });
    }

    let mut individuals: Vec<(String, Vec<ClientYearRecord>)> = Vec::new();
    for record in singles {
        let key = name_key(&record);
        match individuals.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(record),
            None => individuals.push((key, vec![record])),
        }
    }

    couples
        .into_iter()
        .chain(individuals.into_iter().map(|(_, mut records)| {
            records.sort_by_key(|r| r.year);
            let name = records.first().map(|r| r.full_name()).unwrap_or_default();
            Cohort::Individual { name, records }
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::extractors::vocabulary::Language;
    use crate::summary::record::tests::english_lines;
    use crate::summary::record::{build_record, ClientFile};

    fn record(first: &str, last: &str, year: i32, client: ClientFile) -> ClientYearRecord {
        let lines = english_lines(first, last, "Ontario", year);
        build_record(&client, &lines, &ExtractionConfig::default()).unwrap()
    }

    fn member(path: &str, label: &str, partner: &str, primary: bool) -> ClientFile {
        let mut client = ClientFile::new(path, label);
        client.couple_with = Some(partner.to_string());
        client.is_primary = primary;
        client
    }

    #[test]
    fn individual_years_are_merged_and_sorted() {
        let records = vec![
            record("Ann", "Lee", 2023, ClientFile::new("a23.pdf", "Ann")),
            record("Ann", "Lee", 2021, ClientFile::new("a21.pdf", "Ann")),
            record("ANN", "lee", 2022, ClientFile::new("a22.pdf", "Ann")),
        ];
        let cohorts = group_cohorts(records);

        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].years(), vec![2021, 2022, 2023]);
        assert_eq!(cohorts[0].document_title(), "Summary Ann Lee 2021, 2022 & 2023");
    }

    #[test]
    fn couple_is_ordered_by_primary_flag() {
        let records = vec![
            record("Bo", "Chan", 2023, member("bo.pdf", "Bo", "Al", false)),
            record("Al", "Chan", 2023, member("al.pdf", "Al", "Bo", true)),
        ];
        let cohorts = group_cohorts(records);

        assert_eq!(cohorts.len(), 1);
        let Cohort::Couple { primary, secondary, .. } = &cohorts[0] else {
            panic!("expected a couple");
        };
        assert_eq!(primary.full_name(), "Al Chan");
        assert_eq!(secondary.full_name(), "Bo Chan");
        assert_eq!(cohorts[0].document_title(), "Summary Al Chan & Bo Chan 2023");
    }

    #[test]
    fn couple_keeps_only_its_first_year() {
        let records = vec![
            record("Al", "Chan", 2022, member("al22.pdf", "Al", "Bo", true)),
            record("Bo", "Chan", 2022, member("bo22.pdf", "Bo", "Al", false)),
            record("Al", "Chan", 2023, member("al23.pdf", "Al", "Bo", true)),
            record("Bo", "Chan", 2023, member("bo23.pdf", "Bo", "Al", false)),
        ];
        let cohorts = group_cohorts(records);

        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].years(), vec![2022]);
    }

    #[test]
    fn incomplete_couples_fall_back_to_individuals() {
        let records = vec![
            record("Al", "Chan", 2023, member("al.pdf", "Al", "Bo", true)),
            record("Bo", "Chan", 2023, member("bo.pdf", "Bo", "Al", true)),
            record("Cy", "Diaz", 2023, member("cy.pdf", "Cy", "Dee", false)),
            record("Ed", "Fox", 2023, member("ed.pdf", "Ed", "Individual Summary", false)),
        ];
        let cohorts = group_cohorts(records);

        assert_eq!(cohorts.len(), 4);
        assert!(cohorts.iter().all(|c| matches!(c, Cohort::Individual { .. })));
    }

    #[test]
    fn partner_must_declare_the_couple_back() {
        let records = vec![
            record("Al", "Chan", 2023, member("al.pdf", "Al", "Bo", true)),
            record("Bo", "Chan", 2023, member("bo.pdf", "Bo", "Individual Summary", false)),
            record("Cy", "Diaz", 2023, member("cy.pdf", "Cy", "Dee", true)),
            record("Dee", "Diaz", 2023, member("dee.pdf", "Dee", "Ed", false)),
        ];
        let cohorts = group_cohorts(records);

        assert_eq!(cohorts.len(), 4);
        assert!(cohorts.iter().all(|c| matches!(c, Cohort::Individual { .. })));
    }

    #[test]
    fn french_cohort_titles_use_french_prefix() {
        let mut rec = record("Marie", "Gagnon", 2023, ClientFile::new("m.pdf", "Marie"));
        rec.language = Language::French;
        let cohorts = group_cohorts(vec![rec]);
        assert_eq!(cohorts[0].document_title(), "Sommaire Marie Gagnon 2023");
    }

    #[test]
    fn joins_years_for_titles() {
        assert_eq!(join_years(&[2023]), "2023");
        assert_eq!(join_years(&[2022, 2023]), "2022 & 2023");
        assert_eq!(join_years(&[]), "");
    }
}
