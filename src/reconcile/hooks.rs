// Application callbacks fired after a record leaves the pending state.
//
// Hooks run after the transition is persisted. A failing hook is logged by
// the caller and never rolls the transition back.

use crate::error::AppResult;
use crate::ledger::models::{FeedMessage, Profile, Release};
use crate::ledger::RecordStore;
use crate::musicoin::LedgerApi;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[async_trait]
pub trait ReconcileHooks: Send + Sync {
    /// A pending release was confirmed on chain
    async fn on_release_published(&self, release: &Release) -> AppResult<()>;

    /// A brand-new profile received its on-chain address
    async fn on_profile_created(&self, profile: &Profile) -> AppResult<()>;
}

/// Hooks that do nothing
#[cfg(test)]
pub struct NoopHooks;

#[cfg(test)]
#[async_trait]
impl ReconcileHooks for NoopHooks {
    async fn on_release_published(&self, _release: &Release) -> AppResult<()> {
        Ok(())
    }

    async fn on_profile_created(&self, _profile: &Profile) -> AppResult<()> {
        Ok(())
    }
}

/// Platform side effects: feed announcements and invite rewards
pub struct PlatformHooks {
    store: Arc<dyn RecordStore>,
    api: Arc<dyn LedgerApi>,
    invite_reward: Decimal,
}

impl PlatformHooks {
    pub fn new(store: Arc<dyn RecordStore>, api: Arc<dyn LedgerApi>, invite_reward: Decimal) -> Self {
        Self {
            store,
            api,
            invite_reward,
        }
    }
}

#[async_trait]
impl ReconcileHooks for PlatformHooks {
    async fn on_release_published(&self, release: &Release) -> AppResult<()> {
        let message = FeedMessage::new(
            release.artist_address.clone(),
            Some(release.id),
            format!("{} has been released", release.title),
        );
        self.store.post_feed_message(&message).await?;

        info!(release_id = %release.id, "📣 Posted release announcement");
        Ok(())
    }

    async fn on_profile_created(&self, profile: &Profile) -> AppResult<()> {
        let Some(inviter_id) = profile.invited_by else {
            debug!(profile_id = %profile.id, "New profile was not invited, no reward");
            return Ok(());
        };

        let inviter = match self.store.get_profile(inviter_id).await? {
            Some(inviter) => inviter,
            None => {
                warn!(profile_id = %profile.id, %inviter_id, "Inviter no longer exists, skipping reward");
                return Ok(());
            }
        };

        let Some(inviter_address) = inviter
            .profile_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        else {
            warn!(%inviter_id, "Inviter has no profile address yet, skipping reward");
            return Ok(());
        };

        if self.invite_reward > Decimal::ZERO {
            let tx = self.api.send_reward(inviter_address, self.invite_reward).await?;
            info!(%inviter_id, %tx, "🎁 Invite reward sent");
        }

        let message = FeedMessage::new(
            inviter_address.to_string(),
            None,
            format!("{} joined at your invitation", profile.display_name),
        );
        self.store.post_feed_message(&message).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryStore;
    use crate::musicoin::mock::MockLedgerApi;
    use rust_decimal_macros::dec;

    fn hooks(store: Arc<InMemoryStore>, api: Arc<MockLedgerApi>) -> PlatformHooks {
        PlatformHooks::new(store, api, dec!(10))
    }

    #[tokio::test]
    async fn test_release_announcement_posted() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());
        let release = Release::new_pending("Night Drive".into(), "0xartist".into(), "0xtx".into());

        hooks(store.clone(), api).on_release_published(&release).await.unwrap();

        let feed = store.recent_feed_messages(10).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].sender_address, "0xartist");
        assert_eq!(feed[0].release_id, Some(release.id));
        assert_eq!(feed[0].message, "Night Drive has been released");
    }

    #[tokio::test]
    async fn test_inviter_rewarded() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());

        let mut inviter = Profile::new_pending("Inviter".into(), None, "0x1".into());
        inviter.update_pending = false;
        inviter.pending_tx = None;
        inviter.profile_address = Some("0xinviter".into());
        store.insert_profile(&inviter).await.unwrap();

        let invitee = Profile::new_pending("Invitee".into(), Some(inviter.id), "0x2".into());

        hooks(store.clone(), api.clone()).on_profile_created(&invitee).await.unwrap();

        assert_eq!(api.rewards(), vec![("0xinviter".to_string(), dec!(10))]);
        let feed = store.recent_feed_messages(10).await.unwrap();
        assert_eq!(feed[0].message, "Invitee joined at your invitation");
    }

    #[tokio::test]
    async fn test_no_reward_without_inviter_address() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());

        let inviter = Profile::new_pending("Inviter".into(), None, "0x1".into());
        store.insert_profile(&inviter).await.unwrap();
        let invitee = Profile::new_pending("Invitee".into(), Some(inviter.id), "0x2".into());

        hooks(store.clone(), api.clone()).on_profile_created(&invitee).await.unwrap();

        assert!(api.rewards().is_empty());
        assert!(store.recent_feed_messages(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_reward_for_blank_inviter_address() {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(MockLedgerApi::new());

        let mut inviter = Profile::new_pending("Inviter".into(), None, "0x1".into());
        inviter.update_pending = false;
        inviter.pending_tx = None;
        inviter.profile_address = Some("  ".into());
        store.insert_profile(&inviter).await.unwrap();
        let invitee = Profile::new_pending("Invitee".into(), Some(inviter.id), "0x2".into());

        hooks(store.clone(), api.clone()).on_profile_created(&invitee).await.unwrap();

        assert!(api.rewards().is_empty());
        assert!(store.recent_feed_messages(10).await.unwrap().is_empty());
    }
}
