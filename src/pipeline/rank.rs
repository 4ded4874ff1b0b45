use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::model::{MergedSnapshot, RankedSnapshot};

/// Decimal places kept on the published percentage.
const PERCENTAGE_SCALE: u32 = 6;

/// Orders the snapshot by total holdings (balance plus escrow), assigns
/// contiguous 1-based ranks and each account's share of the grand total.
/// Equal totals break ties by address so reruns produce identical output.
pub fn rank(snapshot: MergedSnapshot) -> RankedSnapshot {
    let MergedSnapshot {
        mut records,
        snapshot_at,
    } = snapshot;

    records.sort_by(|a, b| {
        b.total_xrp()
            .cmp(&a.total_xrp())
            .then_with(|| a.address.cmp(&b.address))
    });

    let total_xrp: Decimal = records.iter().map(|r| r.total_xrp()).sum();

    for (index, record) in records.iter_mut().enumerate() {
        record.rank = (index + 1) as u32;
        record.percentage = if total_xrp.is_zero() {
            Decimal::ZERO
        } else {
            (record.total_xrp() / total_xrp * dec!(100)).round_dp(PERCENTAGE_SCALE)
        };
    }

    info!(
        "📊 Ranked {} accounts holding {} XRP in total",
        records.len(),
        total_xrp
    );

    RankedSnapshot {
        records,
        snapshot_at,
        total_xrp,
    }
}
