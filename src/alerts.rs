use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pipeline::summary::LabelSummary;

/// Thresholds and presentation for holdings-change alerts. A change is
/// significant only when it clears both thresholds.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub threshold_percent: Decimal,
    pub threshold_xrp: Decimal,
    /// Period the comparison covers, shown in the alert header.
    pub period_label: String,
    pub summary_url: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold_percent: dec!(5.0),
            threshold_xrp: dec!(1000000),
            period_label: "1H".to_string(),
            summary_url: "http://xrp-rich-list-summary.shirome.net".to_string(),
        }
    }
}

/// One group whose holdings moved past both thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeAlert {
    pub name: String,
    pub balance_change: Decimal,
    pub percentage_change: Decimal,
}

/// Compares the current per-group totals against the previous run's.
/// Groups without a baseline are skipped; a brand-new exchange is not a
/// balance movement.
pub fn detect_significant_changes(
    current: &[LabelSummary],
    previous: &[LabelSummary],
    config: &AlertConfig,
) -> Vec<ExchangeAlert> {
    let baseline: HashMap<&str, &LabelSummary> = previous
        .iter()
        .map(|summary| (summary.grouped_label.as_str(), summary))
        .collect();

    let mut alerts = Vec::new();
    for summary in current {
        let Some(prior) = baseline.get(summary.grouped_label.as_str()) else {
            continue;
        };

        let balance_change = summary.total_xrp - prior.total_xrp;
        let percentage_change = if prior.total_xrp.is_zero() {
            Decimal::ZERO
        } else {
            balance_change / prior.total_xrp * dec!(100)
        };

        if balance_change.abs() >= config.threshold_xrp
            && percentage_change.abs() >= config.threshold_percent
        {
            alerts.push(ExchangeAlert {
                name: summary.grouped_label.clone(),
                balance_change,
                percentage_change,
            });
        }
    }
    alerts
}

/// Renders alerts as a short announcement, one group per entry.
/// Returns `None` when there is nothing to announce.
pub fn format_alert(alerts: &[ExchangeAlert], config: &AlertConfig) -> Option<String> {
    if alerts.is_empty() {
        return None;
    }

    let mut lines = vec![
        "🚨 XRP Rich List Alert".to_string(),
        format!("📊 Changes {}", config.period_label),
        String::new(),
    ];

    for alert in alerts {
        let sign = if alert.balance_change >= Decimal::ZERO {
            "+"
        } else {
            ""
        };
        let arrow = if alert.balance_change >= Decimal::ZERO {
            "↗️"
        } else {
            "↘️"
        };
        lines.push(alert.name.clone());
        lines.push(format!(
            "  {} {}{} XRP ({}{}%)",
            arrow,
            sign,
            format_whole_xrp(alert.balance_change),
            sign,
            format_percent(alert.percentage_change)
        ));
    }

    lines.push(format!("\n{}", config.summary_url));
    Some(lines.join("\n"))
}

/// Whole-XRP rendering with thousands separators: 1234567.8 -> "1,234,568".
fn format_whole_xrp(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(0);
    rounded.rescale(0);
    let raw = rounded.to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// One decimal place, always shown: 5 -> "5.0".
fn format_percent(percent: Decimal) -> String {
    let mut rounded = percent.round_dp(1);
    rounded.rescale(1);
    rounded.to_string()
}
