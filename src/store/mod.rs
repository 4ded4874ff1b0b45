use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::RankedSnapshot;

pub mod csv;
pub mod supabase;

pub use self::csv::CsvStore;
pub use self::supabase::SupabaseStore;

/// A destination a finished snapshot is published to. Publishing is
/// all-or-nothing per store: a failed publish must leave whatever the
/// store held before untouched.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Short sink name for logs.
    fn name(&self) -> &'static str;

    async fn publish(&self, snapshot: &RankedSnapshot) -> AppResult<()>;
}
