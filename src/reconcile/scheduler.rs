// Reconciliation scheduler - drives the daemon from two repeating timers
//
// Releases and profiles run on independent timers. The profile timer is
// offset so both queries never hit the database at the same instant.
// Each timer awaits its cycle before waiting for the next tick, so cycles
// of the same kind never overlap.

use crate::reconcile::daemon::PendingTxDaemon;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Timer configuration
#[derive(Debug, Clone)]
pub struct ReconcileScheduleConfig {
    /// Period of each timer
    pub interval: Duration,
    /// Extra delay before the profile timer starts
    pub profile_offset: Duration,
}

impl ReconcileScheduleConfig {
    pub fn new(interval: Duration, profile_offset: Option<Duration>) -> Self {
        Self {
            interval,
            profile_offset: profile_offset.unwrap_or(interval / 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Releases,
    Profiles,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleKind::Releases => write!(f, "releases"),
            CycleKind::Profiles => write!(f, "profiles"),
        }
    }
}

/// Running timers. Dropping the handle also stops them.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    releases: JoinHandle<()>,
    profiles: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop both timers and wait for any in-flight cycle to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.releases.await {
            error!("Release timer task ended abnormally: {:?}", e);
        }
        if let Err(e) = self.profiles.await {
            error!("Profile timer task ended abnormally: {:?}", e);
        }
        info!("🛑 Reconciliation timers stopped");
    }
}

pub struct ReconcileScheduler {
    config: ReconcileScheduleConfig,
    daemon: Arc<PendingTxDaemon>,
}

impl ReconcileScheduler {
    pub fn new(config: ReconcileScheduleConfig, daemon: Arc<PendingTxDaemon>) -> Self {
        Self { config, daemon }
    }

    /// Start both timers (runs in background)
    pub fn start(&self) -> SchedulerHandle {
        let (shutdown, signal) = watch::channel(false);

        info!(
            "⏰ Reconciling every {:?} (profile timer offset {:?})",
            self.config.interval, self.config.profile_offset
        );

        let releases = tokio::spawn(Self::run_timer(
            CycleKind::Releases,
            self.daemon.clone(),
            self.config.interval,
            Duration::ZERO,
            signal.clone(),
        ));

        let profiles = tokio::spawn(Self::run_timer(
            CycleKind::Profiles,
            self.daemon.clone(),
            self.config.interval,
            self.config.profile_offset,
            signal,
        ));

        SchedulerHandle {
            shutdown,
            releases,
            profiles,
        }
    }

    async fn run_timer(
        kind: CycleKind,
        daemon: Arc<PendingTxDaemon>,
        period: Duration,
        offset: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(Instant::now() + offset + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let result = match kind {
                CycleKind::Releases => daemon.reconcile_releases().await,
                CycleKind::Profiles => daemon.reconcile_profiles().await,
            };

            if let Err(e) = result {
                error!("❌ Pending {} cycle failed: {:?}", kind, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::{Profile, Release, ReleaseState};
    use crate::ledger::{InMemoryStore, RecordStore};
    use crate::musicoin::mock::MockLedgerApi;
    use crate::musicoin::TransactionStatus;
    use crate::reconcile::hooks::NoopHooks;

    #[test]
    fn test_default_offset_is_half_interval() {
        let config = ReconcileScheduleConfig::new(Duration::from_secs(60), None);
        assert_eq!(config.profile_offset, Duration::from_secs(30));

        let config =
            ReconcileScheduleConfig::new(Duration::from_secs(60), Some(Duration::from_secs(5)));
        assert_eq!(config.profile_offset, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timers_reconcile_both_collections() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());

        let release = Release::new_pending("Track".into(), "0xartist".into(), "0xr".into());
        store.insert_release(&release).await.unwrap();
        let profile = Profile::new_pending("Artist".into(), None, "0xp".into());
        store.insert_profile(&profile).await.unwrap();

        api.set_status("0xr", TransactionStatus::complete(Some("0xrelease")));
        api.set_status("0xp", TransactionStatus::complete(Some("0xprofile")));

        let daemon = Arc::new(PendingTxDaemon::new(
            store.clone(),
            api.clone(),
            Arc::new(NoopHooks),
            2,
        ));
        let config = ReconcileScheduleConfig::new(Duration::from_millis(20), None);
        let handle = ReconcileScheduler::new(config, daemon).start();

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        let stored = store.get_release(release.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ReleaseState::Published);
        let stored = store.get_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.profile_address.as_deref(), Some("0xprofile"));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());
        let release = Release::new_pending("Track".into(), "0xartist".into(), "0xr".into());
        store.insert_release(&release).await.unwrap();

        let daemon = Arc::new(PendingTxDaemon::new(
            store.clone(),
            api.clone(),
            Arc::new(NoopHooks),
            1,
        ));
        let config = ReconcileScheduleConfig::new(Duration::from_secs(3600), None);
        let handle = ReconcileScheduler::new(config, daemon).start();

        handle.shutdown().await;
        assert_eq!(api.lookups(), 0);
    }
}
