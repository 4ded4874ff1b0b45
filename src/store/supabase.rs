use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::model::RankedSnapshot;
use crate::retry::{with_retry, RetryPolicy};

use super::SnapshotStore;

/// Rows per insert request.
const INSERT_BATCH_SIZE: usize = 100;
/// Postgres SQLSTATE for a statement timeout. Maintenance functions that
/// hit it keep running server-side, so the run continues.
const STATEMENT_TIMEOUT: &str = "57014";

/// Connection details for the hosted Postgres REST gateway.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub table: String,
    /// Server-side functions invoked after a successful upload, in order.
    pub maintenance_functions: Vec<String>,
}

impl SupabaseConfig {
    pub fn new(url: String, key: String) -> Self {
        Self {
            url,
            key,
            table: "xrpl_rich_list".to_string(),
            // The summary table feeds the change trackers, so it refreshes
            // first; retention cleanup and analyze close the chain.
            maintenance_functions: [
                "update_rich_list_summary",
                "update_balance_changes",
                "update_available_changes",
                "update_category_changes",
                "update_country_changes",
                "delete_old_statistics",
                "update_category_statistics",
                "update_country_statistics",
                "update_available_statistics",
                "cleanup_old_rich_list_data",
                "analyze_rich_list_tables",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    pub fn with_table(mut self, table: String) -> Self {
        self.table = table;
        self
    }
}

/// Uploads snapshots through the REST gateway in fixed-size batches,
/// then kicks off the server-side aggregation functions.
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
    insert_retry: RetryPolicy,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            insert_retry: RetryPolicy::constant(2, Duration::from_secs(5)),
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn rpc_url(&self, function: &str) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.config.url.trim_end_matches('/'),
            function
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    /// Cheap read proving the URL and key work before anything is written.
    pub async fn test_connection(&self) -> AppResult<()> {
        let policy = RetryPolicy::exponential(2, Duration::from_secs(5));
        with_retry(&policy, "supabase connection test", || async {
            let response = self
                .authorized(self.client.get(self.table_url()))
                .query(&[("select", "address"), ("limit", "1")])
                .send()
                .await
                .map_err(|e| AppError::Store(format!("connection test failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(AppError::Store(format!(
                    "connection test returned HTTP {}",
                    response.status()
                )));
            }
            Ok(())
        })
        .await?;

        info!("✅ Supabase connection verified");
        Ok(())
    }

    async fn insert_batch(&self, rows: &[Value]) -> AppResult<()> {
        with_retry(&self.insert_retry, "supabase batch insert", || async {
            let response = self
                .authorized(self.client.post(self.table_url()))
                .header("Prefer", "return=minimal")
                .json(&rows)
                .send()
                .await
                .map_err(|e| AppError::Store(format!("batch insert failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Store(format!(
                    "batch insert returned HTTP {}: {}",
                    status, body
                )));
            }
            Ok(())
        })
        .await
    }

    async fn call_rpc(&self, function: &str) -> AppResult<()> {
        let response = self
            .authorized(self.client.post(self.rpc_url(function)))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AppError::Store(format!("rpc {} failed: {}", function, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!(
                "rpc {} returned HTTP {}: {}",
                function, status, body
            )));
        }
        Ok(())
    }

    /// Runs the configured maintenance functions in order. A statement
    /// timeout is logged and skipped; any other failure stops the chain.
    pub async fn run_maintenance(&self) -> AppResult<()> {
        for function in &self.config.maintenance_functions {
            match self.call_rpc(function).await {
                Ok(()) => info!("✓ Maintenance function {} completed", function),
                Err(error) if is_statement_timeout(&error) => {
                    warn!(
                        "⚠️ Maintenance function {} timed out server-side, continuing: {}",
                        function, error
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }
}

fn is_statement_timeout(error: &AppError) -> bool {
    matches!(error, AppError::Store(message) if message.contains(STATEMENT_TIMEOUT))
}

#[async_trait]
impl SnapshotStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn publish(&self, snapshot: &RankedSnapshot) -> AppResult<()> {
        let rows: Vec<Value> = snapshot
            .rows()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::Store(format!("row serialization failed: {}", e)))?;

        let mut uploaded = 0usize;
        for batch in rows.chunks(INSERT_BATCH_SIZE) {
            self.insert_batch(batch).await?;
            uploaded += batch.len();
            info!("📤 Uploaded {}/{} rows", uploaded, rows.len());
        }

        info!(
            "✅ Upload to table {} complete ({} rows)",
            self.config.table, uploaded
        );

        self.run_maintenance().await
    }
}
