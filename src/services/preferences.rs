use serde::{de::DeserializeOwned, Serialize};

use crate::{
    db::{SessionKey, SessionStore},
    error::AppResult,
    models::{LastOutfitMemo, PreferenceProfile, TryOnMemo},
};

/// Typed access to a session's stored state
///
/// Each record lives in its own slot; an absent slot reads as the record's
/// empty value.
pub struct PreferenceStore<'a> {
    store: &'a dyn SessionStore,
    session: &'a str,
}

impl<'a> PreferenceStore<'a> {
    pub fn new(store: &'a dyn SessionStore, session: &'a str) -> Self {
        Self { store, session }
    }

    pub async fn get_profile(&self) -> AppResult<PreferenceProfile> {
        Ok(self
            .read(&SessionKey::Profile(self.session.to_string()))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_profile(&self, profile: &PreferenceProfile) -> AppResult<()> {
        self.write(&SessionKey::Profile(self.session.to_string()), profile)
            .await
    }

    /// Replaces the profile with an empty one
    pub async fn reset(&self) -> AppResult<PreferenceProfile> {
        let profile = PreferenceProfile::new();
        self.save_profile(&profile).await?;
        tracing::info!(session = %self.session, "Preference profile reset");
        Ok(profile)
    }

    /// Records a like and persists the updated profile
    pub async fn like(&self, item_keywords: &[String]) -> AppResult<PreferenceProfile> {
        let profile = self.get_profile().await?.apply_like(item_keywords);
        self.save_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn get_last_outfit(&self) -> AppResult<LastOutfitMemo> {
        Ok(self
            .read(&SessionKey::LastOutfit(self.session.to_string()))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_last_outfit(&self, memo: &LastOutfitMemo) -> AppResult<()> {
        self.write(&SessionKey::LastOutfit(self.session.to_string()), memo)
            .await
    }

    pub async fn get_tryon(&self) -> AppResult<Option<TryOnMemo>> {
        self.read(&SessionKey::TryOn(self.session.to_string())).await
    }

    pub async fn save_tryon(&self, memo: &TryOnMemo) -> AppResult<()> {
        self.write(&SessionKey::TryOn(self.session.to_string()), memo)
            .await
    }

    async fn read<T: DeserializeOwned>(&self, key: &SessionKey) -> AppResult<Option<T>> {
        match self.store.get(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, key: &SessionKey, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, json).await
    }
}
