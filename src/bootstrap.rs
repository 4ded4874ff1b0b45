use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::ledger::XrplClient;
use crate::pipeline::SnapshotPipeline;
use crate::sources::XrpscanClient;
use crate::store::{CsvStore, SnapshotStore, SupabaseStore};

/// Wires the pipeline from configuration. Upload credentials are proved
/// against the gateway here, before any snapshot work starts.
pub async fn initialize_pipeline(config: &Config) -> AppResult<SnapshotPipeline> {
    info!("Initializing pipeline components ...");

    let source = Arc::new(XrpscanClient::new(config.xrpscan_api_url.clone()));
    info!("✅ Account source initialized ({})", config.xrpscan_api_url);

    let ledger = Arc::new(XrplClient::new(config.xrpl_rpc_url.clone()));
    info!("✅ Ledger client initialized ({})", config.xrpl_rpc_url);

    let mut stores: Vec<Arc<dyn SnapshotStore>> =
        vec![Arc::new(CsvStore::new(config.csv_output_path.clone()))];
    info!("✅ CSV store registered ({})", config.csv_output_path);

    if let Some(supabase_config) = config.supabase.clone() {
        let table = supabase_config.table.clone();
        let store = SupabaseStore::new(supabase_config);
        store.test_connection().await?;
        stores.push(Arc::new(store));
        info!("✅ Supabase store registered (table {})", table);
    } else {
        error!("⚠️  SUPABASE_URL/SUPABASE_KEY not set - table upload disabled");
    }

    Ok(SnapshotPipeline::new(
        source,
        ledger,
        stores,
        config.validator.clone(),
        config.alerts.clone(),
    ))
}
