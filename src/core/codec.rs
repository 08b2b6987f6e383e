//! Census interchange format.
//!
//! A census is a JSON object mapping each holder identity to its balance as a
//! decimal string. Balances have no fixed width, so they are never routed
//! through JSON numbers. A two-column CSV (`identity,balance`) is accepted as
//! well.

use crate::domain::model::{GroupDistribution, Record, SearchStatus};
use crate::utils::error::{CensusError, Result};
use num_bigint::BigUint;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Strict decimal parsing: ASCII digits only, no sign, no separators and no
/// leading zeros, so every accepted string formats back to itself.
pub fn parse_balance(identity: &str, value: &str) -> Result<BigUint> {
    let invalid = |reason: &str| CensusError::InvalidBalance {
        identity: identity.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("balance is empty"));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("balance must contain decimal digits only"));
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(invalid("balance has leading zeros"));
    }

    BigUint::parse_bytes(value.as_bytes(), 10).ok_or_else(|| invalid("balance is not a decimal number"))
}

/// Object entries in document order. Repeated keys are kept so they can be
/// reported instead of silently overwritten.
struct CensusEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for CensusEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = CensusEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping identities to decimal balance strings")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(CensusEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parses a JSON census. Records come back ordered by identity.
pub fn parse_census_json(data: &[u8]) -> Result<Vec<Record>> {
    let CensusEntries(entries) = serde_json::from_slice(data)?;

    let mut census = BTreeMap::new();
    for (identity, value) in entries {
        let balance = parse_balance(&identity, &value)?;
        match census.entry(identity) {
            Entry::Occupied(entry) => {
                return Err(CensusError::DuplicateIdentity {
                    identity: entry.key().clone(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(balance);
            }
        }
    }

    Ok(census
        .into_iter()
        .map(|(identity, balance)| Record { identity, balance })
        .collect())
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    identity: String,
    balance: String,
}

/// Parses an `identity,balance` CSV with a header row, keeping file order.
pub fn parse_census_csv(data: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row?;
        if !seen.insert(row.identity.clone()) {
            return Err(CensusError::DuplicateIdentity {
                identity: row.identity,
            });
        }
        let balance = parse_balance(&row.identity, &row.balance)?;
        records.push(Record {
            identity: row.identity,
            balance,
        });
    }
    Ok(records)
}

/// Picks the parser from the file extension; anything but `.csv` is JSON.
pub fn parse_census(path: &str, data: &[u8]) -> Result<Vec<Record>> {
    let is_csv = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        parse_census_csv(data)
    } else {
        parse_census_json(data)
    }
}

pub fn census_to_json(records: &[Record]) -> Result<String> {
    let mut map = BTreeMap::new();
    for record in records {
        if map
            .insert(record.identity.as_str(), record.balance.to_string())
            .is_some()
        {
            return Err(CensusError::DuplicateIdentity {
                identity: record.identity.clone(),
            });
        }
    }
    Ok(serde_json::to_string_pretty(&map)?)
}

/// Number of holders per rounded balance, ascending by balance.
pub fn group_distribution(records: &[Record]) -> Vec<GroupDistribution> {
    let mut counts: BTreeMap<&BigUint, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(&record.balance).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(balance, holders)| GroupDistribution {
            rounded_balance: balance.to_string(),
            holders,
        })
        .collect()
}

pub fn distribution_to_csv(rows: &[GroupDistribution]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| CensusError::IoError(e.into_error()))?;
    String::from_utf8(data).map_err(|e| CensusError::ConfigError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

/// Run summary written next to the rounded census.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub holders: usize,
    pub outliers: usize,
    pub groups: usize,
    pub distinct_balances: usize,
    pub accuracy: f64,
    pub min_accuracy: f64,
    pub privacy_threshold: usize,
    pub evaluated_thresholds: usize,
    pub status: SearchStatus,
}
