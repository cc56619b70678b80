use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    db::SessionStore,
    error::{AppError, AppResult},
    models::{
        Category, LastOutfitMemo, OutfitCard, PreferenceProfile, Product, Scored,
        SelectionResult, SwipeAction,
    },
    services::{
        catalog::CatalogLoader,
        locks::SessionLocks,
        preferences::PreferenceStore,
        scoring::{self, STORE_LIMIT},
        selector::OutfitSelector,
        tryon::{GarmentResolver, TryOnCache},
    },
};

/// A generated outfit with everything a page needs to render it
#[derive(Debug, Clone, Serialize)]
pub struct OutfitRecommendation {
    #[serde(flatten)]
    pub selection: SelectionResult,
    pub top: Option<Product>,
    pub bottom: Option<Product>,
    pub tryon_image: Option<String>,
    pub tryon_error: Option<String>,
}

/// Per-request recommendation flow over shared, read-only components
///
/// Flows that write session state hold that session's lock from first read
/// to last write, so concurrent requests of one session run one at a time.
pub struct Stylist {
    catalog: Arc<CatalogLoader>,
    selector: OutfitSelector,
    tryon: TryOnCache,
    garments: Arc<dyn GarmentResolver>,
    model_image: Option<PathBuf>,
    locks: SessionLocks,
}

impl Stylist {
    pub fn new(
        catalog: Arc<CatalogLoader>,
        selector: OutfitSelector,
        tryon: TryOnCache,
        garments: Arc<dyn GarmentResolver>,
        model_image: Option<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            selector,
            tryon,
            garments,
            model_image,
            locks: SessionLocks::new(),
        }
    }

    /// The full swipe deck, in file order
    pub async fn swipe_deck(&self) -> AppResult<Arc<Vec<OutfitCard>>> {
        self.catalog.load_outfits().await
    }

    /// Applies a swipe to the session's profile
    ///
    /// Dislikes are accepted but leave the profile as it is.
    pub async fn record_swipe(
        &self,
        store: &dyn SessionStore,
        session: &str,
        outfit_id: &str,
        action: SwipeAction,
    ) -> AppResult<PreferenceProfile> {
        let outfits = self.catalog.load_outfits().await?;
        let card = outfits
            .iter()
            .find(|card| card.id == outfit_id)
            .ok_or_else(|| AppError::NotFound(format!("outfit {}", outfit_id)))?;

        let _guard = self.locks.lock(session).await;
        let prefs = PreferenceStore::new(store, session);
        let profile = match action {
            SwipeAction::Like => prefs.like(&card.keywords).await?,
            SwipeAction::Dislike => prefs.get_profile().await?,
        };

        tracing::info!(
            session = %session,
            outfit_id = %outfit_id,
            action = ?action,
            keywords = profile.len(),
            "Swipe recorded"
        );

        Ok(profile)
    }

    /// Empties the session's profile; memos are kept
    pub async fn reset_preferences(
        &self,
        store: &dyn SessionStore,
        session: &str,
    ) -> AppResult<PreferenceProfile> {
        let _guard = self.locks.lock(session).await;
        PreferenceStore::new(store, session).reset().await
    }

    /// Products matching the session's taste, best first
    pub async fn my_store(
        &self,
        store: &dyn SessionStore,
        session: &str,
    ) -> AppResult<Vec<Scored<Product>>> {
        let products = self.catalog.load_products().await?;
        let profile = PreferenceStore::new(store, session).get_profile().await?;
        Ok(scoring::rank_for_store(&products, &profile, STORE_LIMIT))
    }

    /// Chooses an outfit for the session and refreshes its try-on image
    ///
    /// External model outages degrade to fallbacks; only catalog and store
    /// failures are returned as errors.
    pub async fn generate_outfit(
        &self,
        store: &dyn SessionStore,
        session: &str,
    ) -> AppResult<OutfitRecommendation> {
        let products = self.catalog.load_products().await?;
        let _guard = self.locks.lock(session).await;
        let prefs = PreferenceStore::new(store, session);
        let profile = prefs.get_profile().await?;
        let last = prefs.get_last_outfit().await?;
        let previous_tryon = prefs.get_tryon().await?;

        let tops = ranked_category(&products, &profile, Category::Top);
        let bottoms = ranked_category(&products, &profile, Category::Bottom);

        let selection = self
            .selector
            .select(
                &tops,
                &bottoms,
                &profile,
                last.top_id.as_deref(),
                last.bottom_id.as_deref(),
            )
            .await;

        if selection.pair().is_some() {
            prefs
                .save_last_outfit(&LastOutfitMemo {
                    top_id: selection.top_id.clone(),
                    bottom_id: selection.bottom_id.clone(),
                })
                .await?;
        }

        let tryon = self
            .tryon
            .maybe_regenerate(
                &selection,
                previous_tryon.as_ref(),
                self.model_image.as_deref(),
                self.garments.as_ref(),
            )
            .await;
        if let Some(memo) = &tryon.regenerated {
            prefs.save_tryon(memo).await?;
            if let Some(superseded) = &previous_tryon {
                self.tryon.discard(superseded).await;
            }
        }

        tracing::info!(
            session = %session,
            top_id = ?selection.top_id,
            bottom_id = ?selection.bottom_id,
            fallback = selection.error.is_some(),
            tryon_regenerated = tryon.regenerated.is_some(),
            "Outfit generated"
        );

        let find = |id: &Option<String>| {
            id.as_ref()
                .and_then(|id| products.iter().find(|p| &p.id == id).cloned())
        };

        Ok(OutfitRecommendation {
            top: find(&selection.top_id),
            bottom: find(&selection.bottom_id),
            selection,
            tryon_image: tryon.image_ref,
            tryon_error: tryon.error,
        })
    }
}

/// Products of one category in rank order; all are kept
fn ranked_category(
    products: &[Product],
    profile: &PreferenceProfile,
    category: Category,
) -> Vec<Product> {
    let candidates: Vec<Product> = products
        .iter()
        .filter(|p| p.category == category)
        .cloned()
        .collect();

    scoring::rank(&candidates, profile)
        .into_iter()
        .map(|scored| scored.item)
        .collect()
}
