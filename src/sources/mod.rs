use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::{RawHolding, WellKnownEntry};

pub mod xrpscan;

pub use xrpscan::XrpscanClient;

/// Produces the two account lists the merge stage consumes.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Current rich list: addresses with drop balances and whatever
    /// identity the source attaches to them.
    async fn rich_list(&self) -> AppResult<Vec<RawHolding>>;

    /// Curated registry of well-known accounts.
    async fn well_known(&self) -> AppResult<Vec<WellKnownEntry>>;
}
