//! Per-country import/export balance.
//!
//! Counts how many transactions each country appears in as importer and as
//! exporter, overall and for every year in the table.

use std::collections::{BTreeMap, BTreeSet};

use crate::ingest::TransactionTable;

use super::types::{CountryBalance, TradeBalanceReport, YearBalance};

/// Build the balance table. Rows without a year count toward totals only;
/// rows missing a partner only count for the partner that is present.
pub fn trade_balance(transactions: &TransactionTable) -> TradeBalanceReport {
    let years: BTreeSet<i32> = transactions.rows().iter().filter_map(|r| r.year).collect();

    let mut countries: BTreeMap<String, CountryBalance> = BTreeMap::new();

    for record in transactions.rows() {
        if let Some(importer) = record.importer.as_deref().filter(|c| !c.trim().is_empty()) {
            let balance = country_entry(&mut countries, importer, &years);
            balance.total_imports += 1;
            if let Some(year) = record.year {
                if let Some(counts) = balance.per_year.get_mut(&year) {
                    counts.imports += 1;
                }
            }
        }
        if let Some(exporter) = record.exporter.as_deref().filter(|c| !c.trim().is_empty()) {
            let balance = country_entry(&mut countries, exporter, &years);
            balance.total_exports += 1;
            if let Some(year) = record.year {
                if let Some(counts) = balance.per_year.get_mut(&year) {
                    counts.exports += 1;
                }
            }
        }
    }

    let countries = countries
        .into_values()
        .map(|mut balance| {
            balance.net_imports = balance.total_imports as i64 - balance.total_exports as i64;
            for year in balance.per_year.values_mut() {
                year.net_imports = year.imports as i64 - year.exports as i64;
            }
            balance
        })
        .collect();

    TradeBalanceReport {
        years: years.into_iter().collect(),
        countries,
    }
}

fn country_entry<'a>(
    countries: &'a mut BTreeMap<String, CountryBalance>,
    code: &str,
    years: &BTreeSet<i32>,
) -> &'a mut CountryBalance {
    countries
        .entry(code.to_string())
        .or_insert_with(|| CountryBalance {
            country: code.to_string(),
            total_imports: 0,
            total_exports: 0,
            net_imports: 0,
            per_year: years.iter().map(|&y| (y, YearBalance::default())).collect(),
        })
}
