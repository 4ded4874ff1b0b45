use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Drops per XRP. The ledger counts in drops; everything downstream
/// of the sources works in whole XRP.
pub const DROPS_PER_XRP: Decimal = dec!(1_000_000);

/// Placeholder label for accounts without a registry identity.
pub const UNKNOWN_LABEL: &str = "Unknown";

pub fn drops_to_xrp(drops: u64) -> Decimal {
    Decimal::from(drops) / DROPS_PER_XRP
}

// ========== Source Inputs ==========

/// Identity block attached to a rich-list entry by the source API.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawIdentity {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub domain: Option<String>,
    pub twitter: Option<String>,
}

/// One rich-list entry as returned by the source API: an address, its
/// balance in drops and an optional identity block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawHolding {
    #[serde(rename = "account")]
    pub address: String,
    #[serde(rename = "balance")]
    pub balance_drops: u64,
    #[serde(rename = "name", default)]
    pub identity: Option<RawIdentity>,
}

impl RawHolding {
    pub fn balance_xrp(&self) -> Decimal {
        drops_to_xrp(self.balance_drops)
    }
}

/// One entry of the curated well-known account registry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WellKnownEntry {
    #[serde(rename = "account")]
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Builds the display label from an identity: "Name (Description)" when
/// both are present, the bare name when only the name is, "Unknown"
/// otherwise. A literal "Unknown" name counts as no name, so it never
/// picks up a description suffix.
pub fn format_label(name: Option<&str>, desc: Option<&str>) -> String {
    let name = match name.filter(|n| !n.trim().is_empty()) {
        Some(n) => n,
        None => return UNKNOWN_LABEL.to_string(),
    };
    if name.trim() == UNKNOWN_LABEL {
        return UNKNOWN_LABEL.to_string();
    }
    match desc.filter(|d| !d.trim().is_empty()) {
        Some(d) => format!("{} ({})", name, d),
        None => name.to_string(),
    }
}

// ========== Pipeline Records ==========

/// One account as it moves through merge, validation and ranking.
/// `rank` and `percentage` are zero until the ranking stage fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub address: String,
    pub label: String,
    pub balance_xrp: Decimal,
    pub escrow_xrp: Decimal,
    pub domain: String,
    pub twitter: String,
    pub verified: bool,
    pub exists: bool,
    pub rank: u32,
    pub percentage: Decimal,
}

impl AccountRecord {
    /// Record for a rich-list entry with no registry identity.
    pub fn from_holding(holding: &RawHolding) -> Self {
        let identity = holding.identity.clone().unwrap_or_default();
        Self {
            address: holding.address.clone(),
            label: format_label(identity.name.as_deref(), identity.desc.as_deref()),
            balance_xrp: holding.balance_xrp(),
            escrow_xrp: Decimal::ZERO,
            domain: identity.domain.unwrap_or_default(),
            twitter: identity.twitter.unwrap_or_default(),
            verified: false,
            exists: true,
            rank: 0,
            percentage: Decimal::ZERO,
        }
    }

    /// Record carrying a registry identity. The registry is authoritative
    /// for identity fields; the balance comes from whichever side knew it.
    pub fn from_well_known(entry: &WellKnownEntry, balance_xrp: Decimal) -> Self {
        Self {
            address: entry.address.clone(),
            label: format_label(entry.name.as_deref(), entry.desc.as_deref()),
            balance_xrp,
            escrow_xrp: Decimal::ZERO,
            domain: entry.domain.clone().unwrap_or_default(),
            twitter: entry.twitter.clone().unwrap_or_default(),
            verified: entry.verified,
            exists: true,
            rank: 0,
            percentage: Decimal::ZERO,
        }
    }

    /// Balance plus escrowed funds, the quantity rankings are built on.
    pub fn total_xrp(&self) -> Decimal {
        self.balance_xrp + self.escrow_xrp
    }
}

/// Deduplicated union of the rich list and the registry, in descending
/// balance order. The timestamp is fixed at merge time and never changes.
#[derive(Debug, Clone)]
pub struct MergedSnapshot {
    pub records: Vec<AccountRecord>,
    pub snapshot_at: DateTime<Utc>,
}

impl MergedSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Final pipeline product: validated records with contiguous ranks and
/// supply percentages, plus the grand total they were computed against.
#[derive(Debug, Clone)]
pub struct RankedSnapshot {
    pub records: Vec<AccountRecord>,
    pub snapshot_at: DateTime<Utc>,
    pub total_xrp: Decimal,
}

impl RankedSnapshot {
    /// Rows in publishing shape, each stamped with the snapshot time.
    pub fn rows(&self) -> impl Iterator<Item = SnapshotRow<'_>> + '_ {
        let snapshot_date = self.snapshot_at;
        self.records.iter().map(move |record| SnapshotRow {
            rank: record.rank,
            address: &record.address,
            label: &record.label,
            balance_xrp: record.balance_xrp,
            escrow_xrp: record.escrow_xrp,
            percentage: record.percentage,
            domain: &record.domain,
            twitter: &record.twitter,
            verified: record.verified,
            exists: record.exists,
            snapshot_date,
        })
    }
}

// ========== Published Rows ==========

/// One published row. Field names and order are the contract every
/// store writes; downstream consumers key on them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SnapshotRow<'a> {
    pub rank: u32,
    pub address: &'a str,
    pub label: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_xrp: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub escrow_xrp: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub domain: &'a str,
    pub twitter: &'a str,
    pub verified: bool,
    pub exists: bool,
    pub snapshot_date: DateTime<Utc>,
}

impl SnapshotRow<'_> {
    /// Column names, in the order the serialized fields appear.
    pub const COLUMNS: [&'static str; 11] = [
        "rank",
        "address",
        "label",
        "balance_xrp",
        "escrow_xrp",
        "percentage",
        "domain",
        "twitter",
        "verified",
        "exists",
        "snapshot_date",
    ];
}
