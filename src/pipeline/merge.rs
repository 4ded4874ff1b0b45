use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{AppError, AppResult, MergeSource};
use crate::model::{AccountRecord, MergedSnapshot, RawHolding, WellKnownEntry};

/// Merges the rich list with the well-known registry into one
/// deduplicated snapshot, sorted by descending balance.
///
/// Every holding keeps its observed balance; when the registry also
/// knows the address, the registry wins on identity. Registry entries
/// absent from the rich list are appended with a zero balance so the
/// output always covers the whole registry. Duplicate addresses within
/// either input are a contract violation and abort the merge.
pub fn merge(
    holdings: &[RawHolding],
    well_known: &[WellKnownEntry],
    snapshot_at: DateTime<Utc>,
) -> AppResult<MergedSnapshot> {
    let mut registry: HashMap<&str, &WellKnownEntry> = HashMap::with_capacity(well_known.len());
    for entry in well_known {
        if registry.insert(entry.address.as_str(), entry).is_some() {
            return Err(AppError::MergeInput {
                address: entry.address.clone(),
                source: MergeSource::WellKnown,
            });
        }
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(holdings.len());
    let mut records: Vec<AccountRecord> = Vec::with_capacity(holdings.len() + well_known.len());

    for holding in holdings {
        if !seen.insert(holding.address.as_str()) {
            return Err(AppError::MergeInput {
                address: holding.address.clone(),
                source: MergeSource::Holdings,
            });
        }
        let record = match registry.get(holding.address.as_str()) {
            Some(entry) => AccountRecord::from_well_known(entry, holding.balance_xrp()),
            None => AccountRecord::from_holding(holding),
        };
        records.push(record);
    }

    let mut appended = 0usize;
    for entry in well_known {
        if seen.insert(entry.address.as_str()) {
            records.push(AccountRecord::from_well_known(entry, Decimal::ZERO));
            appended += 1;
        }
    }
    if appended > 0 {
        debug!("Appended {} registry accounts missing from the rich list", appended);
    }

    // Address is the tie-breaker so equal balances still order deterministically.
    records.sort_by(|a, b| {
        b.balance_xrp
            .cmp(&a.balance_xrp)
            .then_with(|| a.address.cmp(&b.address))
    });

    Ok(MergedSnapshot {
        records,
        snapshot_at,
    })
}
