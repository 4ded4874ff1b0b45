use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::ledger::LedgerQuery;
use crate::model::{AccountRecord, MergedSnapshot};
use crate::retry::{with_retry, RetryPolicy};

/// Progress is logged only when the processed count lands exactly on a
/// multiple of this, so off-interval batch sizes log rarely.
const PROGRESS_INTERVAL: usize = 100;

/// Tuning for one validation pass.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Addresses queried concurrently per batch.
    pub batch_size: usize,
    /// Retries per query after the first attempt.
    pub max_retries: u32,
    /// Delay before each retry.
    pub retry_delay: Duration,
    /// Pause between batches, skipped after the final one.
    pub inter_batch_delay: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            inter_batch_delay: Duration::from_secs(1),
        }
    }
}

/// Terminal state of one address after a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The ledger confirmed the account; carries fresh figures.
    Verified {
        balance_xrp: Decimal,
        escrow_xrp: Decimal,
    },
    /// The ledger definitively does not know the account.
    NotFound,
    /// The retry budget ran out without a definitive answer.
    Unresolved,
}

/// Per-pass counters. The three outcome counts always sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub total: usize,
    pub verified: usize,
    pub not_found: usize,
    pub unresolved: usize,
}

impl ValidationStats {
    fn record(&mut self, outcome: &ValidationOutcome) {
        match outcome {
            ValidationOutcome::Verified { .. } => self.verified += 1,
            ValidationOutcome::NotFound => self.not_found += 1,
            ValidationOutcome::Unresolved => self.unresolved += 1,
        }
    }

    pub fn accounted(&self) -> bool {
        self.verified + self.not_found + self.unresolved == self.total
    }
}

/// Re-checks every merged account against the ledger in fixed-size
/// concurrent batches. Works on its own copy of the snapshot; nothing
/// is published from here, so a failed pass cannot corrupt prior output.
pub struct LedgerValidator {
    ledger: Arc<dyn LedgerQuery>,
    config: ValidatorConfig,
}

impl LedgerValidator {
    pub fn new(ledger: Arc<dyn LedgerQuery>, config: ValidatorConfig) -> Self {
        Self { ledger, config }
    }

    /// Validates the snapshot in place and returns it with the pass
    /// counters. Individual query failures degrade the affected account;
    /// they never abort the pass.
    pub async fn validate(&self, snapshot: MergedSnapshot) -> (MergedSnapshot, ValidationStats) {
        let MergedSnapshot {
            mut records,
            snapshot_at,
        } = snapshot;

        let total = records.len();
        let mut stats = ValidationStats {
            total,
            ..Default::default()
        };

        let batch_size = self.config.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let policy = RetryPolicy::constant(self.config.max_retries, self.config.retry_delay);

        info!(
            "🔄 Validating {} accounts in {} batches of up to {}",
            total, batch_count, batch_size
        );

        let mut processed = 0usize;
        for (batch_index, batch) in records.chunks_mut(batch_size).enumerate() {
            let tasks: Vec<_> = batch
                .iter()
                .map(|record| {
                    let address = record.address.clone();
                    let ledger = Arc::clone(&self.ledger);
                    let policy = policy.clone();
                    async move {
                        let outcome = validate_address(ledger, &address, &policy).await;
                        (address, outcome)
                    }
                })
                .collect();

            // Outcomes are keyed by address; completion order carries no meaning.
            let mut outcomes: HashMap<String, ValidationOutcome> =
                join_all(tasks).await.into_iter().collect();

            for record in batch.iter_mut() {
                let outcome = outcomes
                    .remove(record.address.as_str())
                    .unwrap_or(ValidationOutcome::Unresolved);
                stats.record(&outcome);
                apply_outcome(record, outcome);
            }

            processed += batch.len();
            if processed % PROGRESS_INTERVAL == 0 {
                info!("🔄 Validated {}/{} accounts", processed, total);
            }

            if batch_index + 1 < batch_count {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
        }

        info!(
            "✅ Validation pass complete: {} verified, {} not found, {} unresolved",
            stats.verified, stats.not_found, stats.unresolved
        );

        (
            MergedSnapshot {
                records,
                snapshot_at,
            },
            stats,
        )
    }
}

/// Resolves one address to a terminal outcome. The balance query decides
/// between the three states; the escrow query only refines a verified
/// account and degrades to zero when its own retries run out.
async fn validate_address(
    ledger: Arc<dyn LedgerQuery>,
    address: &str,
    policy: &RetryPolicy,
) -> ValidationOutcome {
    let balance = match with_retry(policy, address, || ledger.get_balance(address)).await {
        Ok(balance) => balance,
        Err(error) => {
            warn!("⚠️ Could not verify {}: {}", address, error);
            return ValidationOutcome::Unresolved;
        }
    };

    if !balance.exists {
        return ValidationOutcome::NotFound;
    }

    let escrow_xrp = match with_retry(policy, address, || ledger.get_escrow_sum(address)).await {
        Ok(escrow) => escrow,
        Err(error) => {
            warn!("⚠️ Escrow lookup failed for {}, assuming none: {}", address, error);
            Decimal::ZERO
        }
    };

    ValidationOutcome::Verified {
        balance_xrp: balance.balance_xrp,
        escrow_xrp,
    }
}

fn apply_outcome(record: &mut AccountRecord, outcome: ValidationOutcome) {
    match outcome {
        ValidationOutcome::Verified {
            balance_xrp,
            escrow_xrp,
        } => {
            record.balance_xrp = balance_xrp;
            record.escrow_xrp = escrow_xrp;
            record.exists = true;
        }
        ValidationOutcome::NotFound => {
            record.balance_xrp = Decimal::ZERO;
            record.escrow_xrp = Decimal::ZERO;
            record.exists = false;
        }
        // No definitive answer: the record keeps its merged values.
        ValidationOutcome::Unresolved => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::AccountBalance;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Behavior {
        Healthy { balance: Decimal, escrow: Decimal },
        Missing,
        BalanceAlwaysFails,
        BalanceFailsFirst { failures: u32, balance: Decimal },
        EscrowAlwaysFails { balance: Decimal },
    }

    #[derive(Default)]
    struct MockLedger {
        behavior: HashMap<String, Behavior>,
        balance_calls: Mutex<HashMap<String, u32>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl MockLedger {
        fn with(behaviors: Vec<(&str, Behavior)>) -> Self {
            Self {
                behavior: behaviors
                    .into_iter()
                    .map(|(address, behavior)| (address.to_string(), behavior))
                    .collect(),
                ..Default::default()
            }
        }

        fn balance_calls_for(&self, address: &str) -> u32 {
            *self
                .balance_calls
                .lock()
                .unwrap()
                .get(address)
                .unwrap_or(&0)
        }
    }

    #[async_trait]
    impl LedgerQuery for MockLedger {
        async fn get_balance(&self, address: &str) -> Result<AccountBalance, LedgerError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;

            let calls = {
                let mut calls = self.balance_calls.lock().unwrap();
                let counter = calls.entry(address.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            let result = match self.behavior.get(address) {
                Some(Behavior::Healthy { balance, .. }) => Ok(AccountBalance::existing(*balance)),
                Some(Behavior::Missing) => Ok(AccountBalance::not_found()),
                Some(Behavior::BalanceAlwaysFails) => {
                    Err(LedgerError::Transport("connection reset".to_string()))
                }
                Some(Behavior::BalanceFailsFirst { failures, balance }) => {
                    if calls <= *failures {
                        Err(LedgerError::Transport("timeout".to_string()))
                    } else {
                        Ok(AccountBalance::existing(*balance))
                    }
                }
                Some(Behavior::EscrowAlwaysFails { balance }) => {
                    Ok(AccountBalance::existing(*balance))
                }
                None => Ok(AccountBalance::not_found()),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn get_escrow_sum(&self, address: &str) -> Result<Decimal, LedgerError> {
            match self.behavior.get(address) {
                Some(Behavior::Healthy { escrow, .. }) => Ok(*escrow),
                Some(Behavior::EscrowAlwaysFails { .. }) => {
                    Err(LedgerError::Transport("timeout".to_string()))
                }
                _ => Ok(Decimal::ZERO),
            }
        }
    }

    fn record(address: &str, balance: Decimal) -> AccountRecord {
        AccountRecord {
            address: address.to_string(),
            label: "Unknown".to_string(),
            balance_xrp: balance,
            escrow_xrp: Decimal::ZERO,
            domain: String::new(),
            twitter: String::new(),
            verified: false,
            exists: true,
            rank: 0,
            percentage: Decimal::ZERO,
        }
    }

    fn snapshot(records: Vec<AccountRecord>) -> MergedSnapshot {
        MergedSnapshot {
            records,
            snapshot_at: Utc::now(),
        }
    }

    fn fast_config(batch_size: usize) -> ValidatorConfig {
        ValidatorConfig {
            batch_size,
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            inter_batch_delay: Duration::from_millis(1),
        }
    }

    fn validator(ledger: MockLedger, batch_size: usize) -> (LedgerValidator, Arc<MockLedger>) {
        let ledger = Arc::new(ledger);
        (
            LedgerValidator::new(ledger.clone(), fast_config(batch_size)),
            ledger,
        )
    }

    #[tokio::test]
    async fn test_verified_account_gets_fresh_balance_and_escrow() {
        let (validator, _) = validator(
            MockLedger::with(vec![(
                "rA",
                Behavior::Healthy {
                    balance: dec!(120),
                    escrow: dec!(30),
                },
            )]),
            16,
        );

        let (validated, stats) = validator.validate(snapshot(vec![record("rA", dec!(99))])).await;

        let account = &validated.records[0];
        assert_eq!(account.balance_xrp, dec!(120));
        assert_eq!(account.escrow_xrp, dec!(30));
        assert!(account.exists);
        assert_eq!(stats.verified, 1);
        assert!(stats.accounted());
    }

    #[tokio::test]
    async fn test_missing_account_is_zeroed_and_flagged() {
        let (validator, ledger) = validator(MockLedger::with(vec![("rGone", Behavior::Missing)]), 16);

        let mut stale = record("rGone", dec!(50));
        stale.escrow_xrp = dec!(10);

        let (validated, stats) = validator.validate(snapshot(vec![stale])).await;

        let account = &validated.records[0];
        assert_eq!(account.balance_xrp, Decimal::ZERO);
        assert_eq!(account.escrow_xrp, Decimal::ZERO);
        assert!(!account.exists);
        assert_eq!(stats.not_found, 1);
        // A definitive answer must not burn the retry budget.
        assert_eq!(ledger.balance_calls_for("rGone"), 1);
    }

    #[tokio::test]
    async fn test_unresolved_account_keeps_merged_values() {
        let (validator, ledger) =
            validator(MockLedger::with(vec![("rFlaky", Behavior::BalanceAlwaysFails)]), 16);

        let mut prior = record("rFlaky", dec!(77));
        prior.escrow_xrp = dec!(5);
        let expected = prior.clone();

        let (validated, stats) = validator.validate(snapshot(vec![prior])).await;

        assert_eq!(validated.records[0], expected);
        assert_eq!(stats.unresolved, 1);
        // First attempt plus max_retries.
        assert_eq!(ledger.balance_calls_for("rFlaky"), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_within_budget() {
        let (validator, ledger) = validator(
            MockLedger::with(vec![(
                "rSlow",
                Behavior::BalanceFailsFirst {
                    failures: 2,
                    balance: dec!(11),
                },
            )]),
            16,
        );

        let (validated, stats) = validator.validate(snapshot(vec![record("rSlow", dec!(1))])).await;

        assert_eq!(validated.records[0].balance_xrp, dec!(11));
        assert_eq!(stats.verified, 1);
        assert_eq!(ledger.balance_calls_for("rSlow"), 3);
    }

    #[tokio::test]
    async fn test_escrow_exhaustion_degrades_to_zero_but_account_stays_verified() {
        let (validator, _) = validator(
            MockLedger::with(vec![(
                "rEscrowless",
                Behavior::EscrowAlwaysFails { balance: dec!(200) },
            )]),
            16,
        );

        let mut prior = record("rEscrowless", dec!(180));
        prior.escrow_xrp = dec!(40);

        let (validated, stats) = validator.validate(snapshot(vec![prior])).await;

        let account = &validated.records[0];
        assert_eq!(account.balance_xrp, dec!(200));
        assert_eq!(account.escrow_xrp, Decimal::ZERO);
        assert!(account.exists);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.unresolved, 0);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_are_fully_accounted() {
        let (validator, _) = validator(
            MockLedger::with(vec![
                (
                    "rGood",
                    Behavior::Healthy {
                        balance: dec!(10),
                        escrow: Decimal::ZERO,
                    },
                ),
                ("rGone", Behavior::Missing),
                ("rFlaky", Behavior::BalanceAlwaysFails),
            ]),
            2,
        );

        let input = snapshot(vec![
            record("rGood", dec!(1)),
            record("rGone", dec!(2)),
            record("rFlaky", dec!(3)),
        ]);
        let (_, stats) = validator.validate(input).await;

        assert_eq!(stats.total, 3);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.unresolved, 1);
        assert!(stats.accounted());
    }

    #[tokio::test]
    async fn test_record_order_is_preserved_through_validation() {
        let behaviors: Vec<(&str, Behavior)> = vec![
            (
                "rC",
                Behavior::Healthy {
                    balance: dec!(3),
                    escrow: Decimal::ZERO,
                },
            ),
            ("rA", Behavior::Missing),
            (
                "rB",
                Behavior::Healthy {
                    balance: dec!(2),
                    escrow: Decimal::ZERO,
                },
            ),
        ];
        let (validator, _) = validator(MockLedger::with(behaviors), 2);

        let input = snapshot(vec![
            record("rC", dec!(0)),
            record("rA", dec!(0)),
            record("rB", dec!(0)),
        ]);
        let (validated, _) = validator.validate(input).await;

        let order: Vec<&str> = validated
            .records
            .iter()
            .map(|r| r.address.as_str())
            .collect();
        assert_eq!(order, ["rC", "rA", "rB"]);
        // Each outcome landed on its own record, not a neighbor's slot.
        assert_eq!(validated.records[0].balance_xrp, dec!(3));
        assert!(!validated.records[1].exists);
        assert_eq!(validated.records[2].balance_xrp, dec!(2));
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_the_batch_size() {
        let behaviors: Vec<(String, Behavior)> = (0..10)
            .map(|i| {
                (
                    format!("r{}", i),
                    Behavior::Healthy {
                        balance: dec!(1),
                        escrow: Decimal::ZERO,
                    },
                )
            })
            .collect();
        let ledger = Arc::new(MockLedger {
            behavior: behaviors.into_iter().collect(),
            ..Default::default()
        });
        let validator = LedgerValidator::new(ledger.clone(), fast_config(3));

        let records = (0..10).map(|i| record(&format!("r{}", i), dec!(0))).collect();
        let (_, stats) = validator.validate(snapshot(records)).await;

        assert_eq!(stats.verified, 10);
        assert!(ledger.peak_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_no_pause_after_the_final_batch() {
        let (validator, _) = {
            let ledger = Arc::new(MockLedger::with(vec![(
                "rOnly",
                Behavior::Healthy {
                    balance: dec!(1),
                    escrow: Decimal::ZERO,
                },
            )]));
            let config = ValidatorConfig {
                inter_batch_delay: Duration::from_secs(5),
                ..fast_config(16)
            };
            (LedgerValidator::new(ledger.clone(), config), ledger)
        };

        // One batch only; a trailing pause would blow way past this bound.
        let started = std::time::Instant::now();
        let (_, stats) = validator.validate(snapshot(vec![record("rOnly", dec!(0))])).await;
        assert_eq!(stats.verified, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_a_no_op() {
        let (validator, ledger) = validator(MockLedger::with(vec![]), 16);
        let (validated, stats) = validator.validate(snapshot(vec![])).await;

        assert!(validated.records.is_empty());
        assert_eq!(stats, ValidationStats::default());
        assert!(ledger.balance_calls.lock().unwrap().is_empty());
    }
}
