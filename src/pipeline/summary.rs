use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::model::RankedSnapshot;

/// Labels beginning with one of these collapse into the prefix itself,
/// folding an exchange's many numbered wallets into one line.
const GROUP_PREFIXES: [&str; 7] = [
    "Ripple",
    "Coinbase",
    "Bitrue",
    "Binance",
    "WhiteBIT",
    "CoinCola",
    "Crypto.com",
];

/// Aggregated holdings for one grouped label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub grouped_label: String,
    pub accounts: usize,
    pub total_balance: Decimal,
    pub total_escrow: Decimal,
    pub total_xrp: Decimal,
}

/// Canonical grouping key for a display label: known prefixes collapse,
/// anything containing "gatehub" becomes "gatehub", and remaining labels
/// lose a leading `~` and a trailing ` (N)` wallet counter.
pub fn group_label(label: &str) -> String {
    for prefix in GROUP_PREFIXES {
        if label.starts_with(prefix) {
            return prefix.to_string();
        }
    }
    if label.to_lowercase().contains("gatehub") {
        return "gatehub".to_string();
    }
    let label = label.strip_prefix('~').unwrap_or(label);
    strip_wallet_counter(label).to_string()
}

/// Removes a trailing parenthesized integer, e.g. "Wallet (3)" -> "Wallet".
fn strip_wallet_counter(label: &str) -> &str {
    let trimmed = label.trim_end();
    let Some(without_paren) = trimmed.strip_suffix(')') else {
        return trimmed;
    };
    let Some(open) = without_paren.rfind('(') else {
        return trimmed;
    };
    let counter = &without_paren[open + 1..];
    if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed;
    }
    without_paren[..open].trim_end()
}

/// Collapses a ranked snapshot into per-group totals, ordered by
/// descending balance with the label as tie-breaker.
pub fn summarize(snapshot: &RankedSnapshot) -> Vec<LabelSummary> {
    let mut groups: HashMap<String, LabelSummary> = HashMap::new();

    for record in &snapshot.records {
        let key = group_label(&record.label);
        let group = groups.entry(key.clone()).or_insert_with(|| LabelSummary {
            grouped_label: key,
            accounts: 0,
            total_balance: Decimal::ZERO,
            total_escrow: Decimal::ZERO,
            total_xrp: Decimal::ZERO,
        });
        group.accounts += 1;
        group.total_balance += record.balance_xrp;
        group.total_escrow += record.escrow_xrp;
        group.total_xrp += record.total_xrp();
    }

    let mut summaries: Vec<LabelSummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| {
        b.total_balance
            .cmp(&a.total_balance)
            .then_with(|| a.grouped_label.cmp(&b.grouped_label))
    });
    summaries
}
