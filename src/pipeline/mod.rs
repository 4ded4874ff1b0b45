use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::{self, AlertConfig, ExchangeAlert};
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerQuery;
use crate::sources::AccountSource;
use crate::store::SnapshotStore;

pub mod merge;
pub mod rank;
pub mod summary;
pub mod validate;

use summary::LabelSummary;
use validate::{LedgerValidator, ValidationStats, ValidatorConfig};

/// Counters from one completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub holdings_fetched: usize,
    pub well_known_fetched: usize,
    pub merged_total: usize,
    pub validation: ValidationStats,
    pub published_rows: usize,
    pub alerts: Vec<ExchangeAlert>,
}

/// Fetch, merge, validate, rank, publish. The whole run works on data it
/// owns; stores only see a snapshot once every stage has finished, so a
/// failure anywhere leaves the previous published output in place.
pub struct SnapshotPipeline {
    source: Arc<dyn AccountSource>,
    validator: LedgerValidator,
    stores: Vec<Arc<dyn SnapshotStore>>,
    alert_config: AlertConfig,
    /// Per-group totals from the previous run, the alert baseline.
    last_summary: Mutex<Option<Vec<LabelSummary>>>,
}

impl SnapshotPipeline {
    pub fn new(
        source: Arc<dyn AccountSource>,
        ledger: Arc<dyn LedgerQuery>,
        stores: Vec<Arc<dyn SnapshotStore>>,
        validator_config: ValidatorConfig,
        alert_config: AlertConfig,
    ) -> Self {
        Self {
            source,
            validator: LedgerValidator::new(ledger, validator_config),
            stores,
            alert_config,
            last_summary: Mutex::new(None),
        }
    }

    pub async fn run(&self) -> AppResult<PipelineReport> {
        let run_id = Uuid::new_v4();
        info!("🚀 Starting snapshot run {}", run_id);

        let holdings = self.source.rich_list().await?;
        let well_known = self.source.well_known().await?;

        let merged = merge::merge(&holdings, &well_known, Utc::now())?;
        info!("✓ Merged snapshot holds {} accounts", merged.len());

        let (validated, validation) = self.validator.validate(merged).await;
        if !validation.accounted() {
            return Err(AppError::Internal(format!(
                "validation counters do not cover the snapshot: {:?}",
                validation
            )));
        }

        let ranked = rank::rank(validated);

        for store in &self.stores {
            store.publish(&ranked).await?;
            info!("✓ Snapshot published to {}", store.name());
        }

        let current_summary = summary::summarize(&ranked);
        let alerts = {
            let mut baseline = self.last_summary.lock().await;
            let alerts = match baseline.as_deref() {
                Some(previous) => alerts::detect_significant_changes(
                    &current_summary,
                    previous,
                    &self.alert_config,
                ),
                None => Vec::new(),
            };
            *baseline = Some(current_summary);
            alerts
        };

        if let Some(announcement) = alerts::format_alert(&alerts, &self.alert_config) {
            warn!("🚨 Significant holdings changes:\n{}", announcement);
        }

        let report = PipelineReport {
            run_id,
            holdings_fetched: holdings.len(),
            well_known_fetched: well_known.len(),
            merged_total: ranked.records.len(),
            validation,
            published_rows: ranked.records.len(),
            alerts,
        };

        info!(
            "✅ Run {} complete: {} rows published ({} verified, {} not found, {} unresolved)",
            report.run_id,
            report.published_rows,
            validation.verified,
            validation.not_found,
            validation.unresolved
        );

        Ok(report)
    }
}
