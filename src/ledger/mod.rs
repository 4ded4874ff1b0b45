use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::LedgerError;

pub mod xrpl;

pub use xrpl::XrplClient;

/// Result of a balance query: whether the account is on ledger and, if
/// so, its spendable XRP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountBalance {
    pub exists: bool,
    pub balance_xrp: Decimal,
}

impl AccountBalance {
    pub fn existing(balance_xrp: Decimal) -> Self {
        Self {
            exists: true,
            balance_xrp,
        }
    }

    pub fn not_found() -> Self {
        Self {
            exists: false,
            balance_xrp: Decimal::ZERO,
        }
    }
}

/// Read-only ledger queries the validator runs against each address.
/// Errors are transient by definition; a definitive "no such account"
/// comes back as a successful `AccountBalance::not_found`.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Spendable balance as of the last validated ledger.
    async fn get_balance(&self, address: &str) -> Result<AccountBalance, LedgerError>;

    /// Total XRP locked in escrows owned by `address`. Zero when the
    /// account holds none.
    async fn get_escrow_sum(&self, address: &str) -> Result<Decimal, LedgerError>;
}
