use super::models::*;
use super::repository::RecordStore;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local record store. Used by tests and `STORE_BACKEND=memory`.
pub struct InMemoryStore {
    releases: RwLock<HashMap<Uuid, Release>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
    feed: RwLock<Vec<FeedMessage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            releases: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            feed: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert_release(&self, release: &Release) -> AppResult<()> {
        let mut releases = self.releases.write().await;
        if releases.contains_key(&release.id) {
            return Err(AppError::Conflict(format!("Release {} already exists", release.id)));
        }
        releases.insert(release.id, release.clone());
        Ok(())
    }

    async fn get_release(&self, release_id: Uuid) -> AppResult<Option<Release>> {
        let releases = self.releases.read().await;
        Ok(releases.get(&release_id).cloned())
    }

    async fn pending_releases(&self) -> AppResult<Vec<Release>> {
        let releases = self.releases.read().await;
        let mut pending: Vec<Release> = releases
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn count_pending_releases(&self) -> AppResult<i64> {
        let releases = self.releases.read().await;
        Ok(releases.values().filter(|r| r.is_pending()).count() as i64)
    }

    async fn publish_release(&self, release_id: Uuid, contract_address: &str) -> AppResult<bool> {
        let mut releases = self.releases.write().await;
        match releases.get_mut(&release_id) {
            Some(release) if release.is_pending() => {
                release.state = ReleaseState::Published;
                release.contract_address = Some(contract_address.to_string());
                release.error_message = None;
                release.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_release(&self, release_id: Uuid, message: &str) -> AppResult<bool> {
        let mut releases = self.releases.write().await;
        match releases.get_mut(&release_id) {
            Some(release) if release.is_pending() => {
                release.state = ReleaseState::Error;
                release.error_message = Some(message.to_string());
                release.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(AppError::Conflict(format!("Profile {} already exists", profile.id)));
        }
        profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, profile_id: Uuid) -> AppResult<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&profile_id).cloned())
    }

    async fn pending_profiles(&self) -> AppResult<Vec<Profile>> {
        let profiles = self.profiles.read().await;
        let mut pending: Vec<Profile> = profiles
            .values()
            .filter(|p| p.update_pending)
            .cloned()
            .collect();
        pending.sort_by_key(|p| p.updated_at);
        Ok(pending)
    }

    async fn count_pending_profiles(&self) -> AppResult<i64> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().filter(|p| p.update_pending).count() as i64)
    }

    async fn begin_profile_update(&self, profile_id: Uuid, tx: &str) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&profile_id) {
            Some(profile) if !profile.update_pending => {
                profile.update_pending = true;
                profile.pending_tx = Some(tx.to_string());
                profile.update_error = None;
                profile.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_profile_update(
        &self,
        profile_id: Uuid,
        profile_address: Option<&str>,
    ) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&profile_id) {
            Some(profile) if profile.update_pending => {
                if profile.is_new() {
                    profile.profile_address = profile_address.map(str::to_string);
                }
                profile.update_pending = false;
                profile.pending_tx = None;
                profile.update_error = None;
                profile.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_profile_update(&self, profile_id: Uuid, message: &str) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&profile_id) {
            Some(profile) if profile.update_pending => {
                profile.update_pending = false;
                profile.pending_tx = None;
                profile.update_error = Some(message.to_string());
                profile.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn post_feed_message(&self, message: &FeedMessage) -> AppResult<()> {
        let mut feed = self.feed.write().await;
        feed.push(message.clone());
        Ok(())
    }

    async fn recent_feed_messages(&self, limit: i64) -> AppResult<Vec<FeedMessage>> {
        let feed = self.feed.read().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        Ok(feed.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_transitions_apply_once() {
        let store = InMemoryStore::new();
        let release = Release::new_pending("Song".into(), "0xartist".into(), "0xtx".into());
        store.insert_release(&release).await.unwrap();

        assert_eq!(store.pending_releases().await.unwrap().len(), 1);
        assert!(store.publish_release(release.id, "0xcontract").await.unwrap());
        assert!(!store.publish_release(release.id, "0xother").await.unwrap());
        assert!(!store.fail_release(release.id, "late failure").await.unwrap());

        let stored = store.get_release(release.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ReleaseState::Published);
        assert_eq!(stored.contract_address.as_deref(), Some("0xcontract"));
        assert!(store.pending_releases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_release_is_not_pending() {
        let store = InMemoryStore::new();
        let mut release = Release::new_pending("Gone".into(), "0xartist".into(), "0xtx".into());
        release.state = ReleaseState::Deleted;
        store.insert_release(&release).await.unwrap();

        assert!(store.pending_releases().await.unwrap().is_empty());
        assert!(!store.fail_release(release.id, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_update_keeps_existing_address() {
        let store = InMemoryStore::new();
        let mut profile = Profile::new_pending("Bob".into(), None, "0xtx".into());
        profile.profile_address = Some("0xoriginal".into());
        store.insert_profile(&profile).await.unwrap();

        assert!(store.complete_profile_update(profile.id, Some("0xnew")).await.unwrap());

        let stored = store.get_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.profile_address.as_deref(), Some("0xoriginal"));
        assert!(!stored.update_pending);
        assert!(stored.pending_tx.is_none());
    }

    #[tokio::test]
    async fn test_begin_profile_update_rejects_second_pending() {
        let store = InMemoryStore::new();
        let profile = Profile::new_pending("Carol".into(), None, "0xtx".into());
        store.insert_profile(&profile).await.unwrap();

        assert!(!store.begin_profile_update(profile.id, "0xtx2").await.unwrap());
        assert!(store.fail_profile_update(profile.id, "failed").await.unwrap());
        assert!(store.begin_profile_update(profile.id, "0xtx2").await.unwrap());

        let stored = store.get_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.pending_tx.as_deref(), Some("0xtx2"));
        assert!(stored.update_error.is_none());
    }

    #[tokio::test]
    async fn test_recent_feed_messages_newest_first() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            let message = FeedMessage::new("0xartist".into(), None, format!("message {}", i));
            store.post_feed_message(&message).await.unwrap();
        }

        let recent = store.recent_feed_messages(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "message 2");
        assert_eq!(recent[1].message, "message 1");
    }

    #[tokio::test]
    async fn test_blank_address_replaced_on_completion() {
        let store = InMemoryStore::new();
        let mut profile = Profile::new_pending("Dana".into(), None, "0xtx".into());
        profile.profile_address = Some("   ".into());
        store.insert_profile(&profile).await.unwrap();
        assert_eq!(store.count_pending_profiles().await.unwrap(), 1);

        assert!(store.complete_profile_update(profile.id, Some("0xnew")).await.unwrap());

        let stored = store.get_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.profile_address.as_deref(), Some("0xnew"));
        assert_eq!(store.count_pending_profiles().await.unwrap(), 0);
    }
}
