// Pending transaction daemon - reconciles local records against the ledger
//
// Per record:
// 1. Defuse records that are pending without a transaction id
// 2. Look up the transaction status on the remote ledger
// 3. pending          -> leave untouched, retried next cycle
//    complete         -> store the contract address, mark success, fire hook
//    error / unknown  -> mark failed with a readable message
//
// A failed lookup leaves the record as it was. There is no backoff or
// retry cutoff; a record stays pending for as long as the ledger says so
// or cannot be reached.

use crate::error::AppResult;
use crate::ledger::models::{Profile, Release, ReleaseState};
use crate::ledger::RecordStore;
use crate::musicoin::{LedgerApi, TransactionStatus, TxStatus};
use crate::reconcile::hooks::ReconcileHooks;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const MISSING_TX_MESSAGE: &str = "Missing transaction id";
pub const MISSING_ADDRESS_MESSAGE: &str = "Transaction completed without a contract address";

/// What happened to a single record during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    StillPending,
    Defused,
    LookupError,
    StoreError,
    /// Someone else moved the record out of pending first
    Skipped,
}

/// Summary of one reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub examined: usize,
    pub completed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub defused: usize,
    pub lookup_errors: usize,
    pub store_errors: usize,
    pub skipped: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: Outcome) {
        self.examined += 1;
        match outcome {
            Outcome::Completed => self.completed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::StillPending => self.still_pending += 1,
            Outcome::Defused => self.defused += 1,
            Outcome::LookupError => self.lookup_errors += 1,
            Outcome::StoreError => self.store_errors += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    /// Number of records that left the pending state this cycle
    pub fn resolved(&self) -> usize {
        self.completed + self.failed + self.defused
    }
}

pub struct PendingTxDaemon {
    store: Arc<dyn RecordStore>,
    api: Arc<dyn LedgerApi>,
    hooks: Arc<dyn ReconcileHooks>,
    /// Maximum in-flight status lookups per cycle
    concurrency: usize,
}

impl PendingTxDaemon {
    pub fn new(
        store: Arc<dyn RecordStore>,
        api: Arc<dyn LedgerApi>,
        hooks: Arc<dyn ReconcileHooks>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            api,
            hooks,
            concurrency: concurrency.max(1),
        }
    }

    // ========== RELEASES ==========

    #[instrument(skip(self))]
    pub async fn reconcile_releases(&self) -> AppResult<ReconcileReport> {
        let pending = self.store.pending_releases().await?;
        if pending.is_empty() {
            return Ok(ReconcileReport::default());
        }

        info!("🔄 Checking {} pending releases", pending.len());

        let outcomes: Vec<Outcome> = stream::iter(pending)
            .map(|release| self.reconcile_release(release))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = ReconcileReport::from_outcomes(outcomes);
        info!(resolved = report.resolved(), ?report, "✓ Release reconciliation cycle completed");
        Ok(report)
    }

    async fn reconcile_release(&self, release: Release) -> Outcome {
        let Some(tx) = release.pending_tx().map(str::to_string) else {
            warn!(release_id = %release.id, "Pending release has no transaction id, marking as error");
            return match self.store.fail_release(release.id, MISSING_TX_MESSAGE).await {
                Ok(true) => Outcome::Defused,
                Ok(false) => Outcome::Skipped,
                Err(e) => {
                    error!(release_id = %release.id, "❌ Failed to defuse release: {:?}", e);
                    Outcome::StoreError
                }
            };
        };

        let status = match self.api.get_transaction_status(&tx).await {
            Ok(status) => status,
            Err(e) => {
                warn!(release_id = %release.id, %tx, "⚠️ Status lookup failed, will retry: {}", e);
                return Outcome::LookupError;
            }
        };

        match status.status {
            TxStatus::Pending => Outcome::StillPending,
            TxStatus::Complete => match status.contract_address() {
                Some(address) => self.publish_release(release, address).await,
                None => self.fail_release(&release, MISSING_ADDRESS_MESSAGE).await,
            },
            TxStatus::Error | TxStatus::Unknown => {
                self.fail_release(&release, &failure_message(&tx, &status)).await
            }
        }
    }

    async fn publish_release(&self, mut release: Release, contract_address: &str) -> Outcome {
        match self.store.publish_release(release.id, contract_address).await {
            Ok(true) => {
                info!(release_id = %release.id, %contract_address, "✓ Release published");
                release.state = ReleaseState::Published;
                release.contract_address = Some(contract_address.to_string());
                release.error_message = None;
                release.updated_at = Utc::now();

                if let Err(e) = self.hooks.on_release_published(&release).await {
                    error!(release_id = %release.id, "❌ Release published hook failed: {:?}", e);
                }
                Outcome::Completed
            }
            Ok(false) => Outcome::Skipped,
            Err(e) => {
                error!(release_id = %release.id, "❌ Failed to publish release: {:?}", e);
                Outcome::StoreError
            }
        }
    }

    async fn fail_release(&self, release: &Release, message: &str) -> Outcome {
        match self.store.fail_release(release.id, message).await {
            Ok(true) => {
                warn!(release_id = %release.id, "Release failed: {}", message);
                Outcome::Failed
            }
            Ok(false) => Outcome::Skipped,
            Err(e) => {
                error!(release_id = %release.id, "❌ Failed to mark release as error: {:?}", e);
                Outcome::StoreError
            }
        }
    }

    // ========== PROFILES ==========

    #[instrument(skip(self))]
    pub async fn reconcile_profiles(&self) -> AppResult<ReconcileReport> {
        let pending = self.store.pending_profiles().await?;
        if pending.is_empty() {
            return Ok(ReconcileReport::default());
        }

        info!("🔄 Checking {} pending profile updates", pending.len());

        let outcomes: Vec<Outcome> = stream::iter(pending)
            .map(|profile| self.reconcile_profile(profile))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = ReconcileReport::from_outcomes(outcomes);
        info!(resolved = report.resolved(), ?report, "✓ Profile reconciliation cycle completed");
        Ok(report)
    }

    async fn reconcile_profile(&self, profile: Profile) -> Outcome {
        let Some(tx) = profile.pending_tx().map(str::to_string) else {
            warn!(profile_id = %profile.id, "Pending profile update has no transaction id, clearing");
            return self.fail_profile(&profile, MISSING_TX_MESSAGE, Outcome::Defused).await;
        };

        let status = match self.api.get_transaction_status(&tx).await {
            Ok(status) => status,
            Err(e) => {
                warn!(profile_id = %profile.id, %tx, "⚠️ Status lookup failed, will retry: {}", e);
                return Outcome::LookupError;
            }
        };

        match status.status {
            TxStatus::Pending => Outcome::StillPending,
            TxStatus::Complete => {
                let address = status.contract_address();
                if profile.is_new() && address.is_none() {
                    return self
                        .fail_profile(&profile, MISSING_ADDRESS_MESSAGE, Outcome::Failed)
                        .await;
                }
                self.complete_profile(profile, address).await
            }
            TxStatus::Error | TxStatus::Unknown => {
                self.fail_profile(&profile, &failure_message(&tx, &status), Outcome::Failed)
                    .await
            }
        }
    }

    async fn complete_profile(&self, mut profile: Profile, address: Option<&str>) -> Outcome {
        let is_new = profile.is_new();
        let new_address = if is_new { address } else { None };

        match self.store.complete_profile_update(profile.id, new_address).await {
            Ok(true) => {
                info!(profile_id = %profile.id, is_new, "✓ Profile update confirmed");
                if let Some(address) = new_address {
                    profile.profile_address = Some(address.to_string());
                }
                profile.update_pending = false;
                profile.pending_tx = None;
                profile.update_error = None;
                profile.updated_at = Utc::now();

                if is_new {
                    if let Err(e) = self.hooks.on_profile_created(&profile).await {
                        error!(profile_id = %profile.id, "❌ Profile created hook failed: {:?}", e);
                    }
                }
                Outcome::Completed
            }
            Ok(false) => Outcome::Skipped,
            Err(e) => {
                error!(profile_id = %profile.id, "❌ Failed to complete profile update: {:?}", e);
                Outcome::StoreError
            }
        }
    }

    async fn fail_profile(&self, profile: &Profile, message: &str, outcome: Outcome) -> Outcome {
        match self.store.fail_profile_update(profile.id, message).await {
            Ok(true) => {
                warn!(profile_id = %profile.id, "Profile update failed: {}", message);
                outcome
            }
            Ok(false) => Outcome::Skipped,
            Err(e) => {
                error!(profile_id = %profile.id, "❌ Failed to mark profile update as failed: {:?}", e);
                Outcome::StoreError
            }
        }
    }

    /// Run one release cycle and one profile cycle back to back
    pub async fn run_once(&self) -> AppResult<(ReconcileReport, ReconcileReport)> {
        let releases = self.reconcile_releases().await?;
        let profiles = self.reconcile_profiles().await?;
        Ok((releases, profiles))
    }
}

fn failure_message(tx: &str, status: &TransactionStatus) -> String {
    match status.status {
        TxStatus::Unknown => format!("Transaction {} is unknown to the ledger", tx),
        _ => format!("Transaction {} failed", tx),
    }
}
