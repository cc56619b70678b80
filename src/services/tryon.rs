use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{SelectionResult, TryOnMemo},
    services::providers::{CallFailure, FailureKind, ImageProvider},
};

pub const TRYON_INSTRUCTION: &str = "Dress the person in the first image in the garments shown \
in the other images. Keep the person's face, body, pose, lighting and background unchanged; \
replace only the clothing regions with the given top and bottom.";

const GARMENT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Finds the cutout image of a product, if one exists
pub trait GarmentResolver: Send + Sync {
    fn resolve(&self, product_id: &str) -> Option<PathBuf>;
}

/// Resolves `{dir}/{product_id}.{png,jpg,jpeg,webp}`
#[derive(Debug, Clone)]
pub struct DirectoryGarmentResolver {
    dir: PathBuf,
}

impl DirectoryGarmentResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl GarmentResolver for DirectoryGarmentResolver {
    fn resolve(&self, product_id: &str) -> Option<PathBuf> {
        // Ids come from the catalog, but never let one escape the directory
        if product_id.contains(['/', '\\']) || product_id.starts_with('.') {
            return None;
        }

        GARMENT_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", product_id, ext)))
            .find(|path| path.is_file())
    }
}

/// Result of a try-on refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnOutcome {
    /// Image to show: the new one, or the previous one when nothing changed
    pub image_ref: Option<String>,
    /// Why a needed regeneration did not happen
    pub error: Option<String>,
    /// Set when a new image was generated; the caller persists it
    pub regenerated: Option<TryOnMemo>,
}

impl TryOnOutcome {
    fn keep(previous: Option<&TryOnMemo>, error: Option<String>) -> Self {
        Self {
            image_ref: previous.map(|m| m.image_ref.clone()),
            error,
            regenerated: None,
        }
    }
}

/// Regenerates the try-on composite only when the outfit changes
pub struct TryOnCache {
    provider: Option<Arc<dyn ImageProvider>>,
    media_dir: PathBuf,
}

impl TryOnCache {
    pub fn new(provider: Option<Arc<dyn ImageProvider>>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            media_dir: media_dir.into(),
        }
    }

    /// Returns the image for `selection`, generating one if the memo is stale
    ///
    /// Failures never lose the previous image: it is returned alongside a
    /// human-readable error.
    pub async fn maybe_regenerate(
        &self,
        selection: &SelectionResult,
        previous: Option<&TryOnMemo>,
        model_image: Option<&Path>,
        resolver: &dyn GarmentResolver,
    ) -> TryOnOutcome {
        let Some((top_id, bottom_id)) = selection.pair() else {
            return TryOnOutcome::keep(previous, None);
        };

        if previous.is_some_and(|memo| memo.depicts(top_id, bottom_id)) {
            tracing::debug!(top_id, bottom_id, "Try-on image up to date");
            return TryOnOutcome::keep(previous, None);
        }

        let garments: Vec<PathBuf> = [top_id, bottom_id]
            .iter()
            .filter_map(|id| resolver.resolve(id))
            .collect();
        if garments.is_empty() {
            tracing::info!(top_id, bottom_id, "No garment images for outfit, skipping try-on");
            return TryOnOutcome::keep(previous, None);
        }

        let Some(model_image) = model_image else {
            return TryOnOutcome::keep(
                previous,
                Some("No model photo is available for try-on.".to_string()),
            );
        };

        let Some(provider) = &self.provider else {
            return TryOnOutcome::keep(
                previous,
                Some("Image generation is not configured.".to_string()),
            );
        };

        tracing::info!(
            top_id,
            bottom_id,
            garments = garments.len(),
            provider = provider.name(),
            "Generating try-on image"
        );

        let stored = match provider
            .compose(model_image, &garments, TRYON_INSTRUCTION)
            .await
        {
            Ok(bytes) => self.store_image(&bytes).await,
            Err(failure) => Err(failure),
        };

        match stored {
            Ok(image_ref) => {
                tracing::info!(image_ref = %image_ref, "Try-on image generated");
                let memo = TryOnMemo {
                    top_id: top_id.to_string(),
                    bottom_id: bottom_id.to_string(),
                    image_ref: image_ref.clone(),
                    generated_at: Utc::now(),
                };
                TryOnOutcome {
                    image_ref: Some(image_ref),
                    error: None,
                    regenerated: Some(memo),
                }
            }
            Err(failure) => {
                tracing::warn!(
                    kind = %failure.kind,
                    error = %failure.message,
                    "Try-on generation failed, keeping previous image"
                );
                TryOnOutcome::keep(previous, Some(describe_failure(&failure)))
            }
        }
    }

    /// Removes the image file of a superseded memo
    ///
    /// Only files this cache wrote are touched. A missing file is not an error.
    pub async fn discard(&self, superseded: &TryOnMemo) {
        let name = superseded.image_ref.as_str();
        if !name.starts_with("tryon-") || name.contains(['/', '\\']) {
            return;
        }

        let path = self.media_dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed superseded try-on image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove superseded try-on image"
            ),
        }
    }

    async fn store_image(&self, bytes: &[u8]) -> Result<String, CallFailure> {
        let file_name = format!("tryon-{}.png", Uuid::new_v4());
        let path = self.media_dir.join(&file_name);

        let write = async {
            tokio::fs::create_dir_all(&self.media_dir).await?;
            tokio::fs::write(&path, bytes).await
        };
        write.await.map_err(|e| {
            CallFailure::new(
                FailureKind::BadResponse,
                format!("failed to save {}: {}", path.display(), e),
            )
        })?;

        Ok(file_name)
    }
}

fn describe_failure(failure: &CallFailure) -> String {
    match failure.kind {
        FailureKind::Permission => format!(
            "Image generation was refused; the API organization may need verification ({}).",
            failure.message
        ),
        FailureKind::RateLimited => format!(
            "Image generation quota or rate limit reached; try again later ({}).",
            failure.message
        ),
        _ => format!("Image generation failed: {}", failure),
    }
}
