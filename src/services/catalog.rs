use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::{
    error::{AppError, AppResult},
    models::{Category, OutfitCard, Product},
};

/// Tokens identifying bottoms. Checked before the top tokens, so
/// "cargo shorts" stays a bottom even if a top token also matches.
const BOTTOM_TOKENS: &[&str] = &[
    "jeans",
    "pants",
    "trousers",
    "shorts",
    "skirt",
    "cargo",
    "chino",
    "jogger",
    "leggings",
    "sweatpants",
];

const TOP_TOKENS: &[&str] = &[
    "t-shirt",
    "shirt",
    "tee",
    "top",
    "hoodie",
    "sweater",
    "sweatshirt",
    "jacket",
    "blouse",
    "polo",
    "cardigan",
    "coat",
];

/// Derives the garment class of a product from its name and keywords
pub fn categorize(product: &Product) -> Category {
    let mut haystack = product.name.to_lowercase();
    for keyword in &product.keywords {
        haystack.push(' ');
        haystack.push_str(&keyword.to_lowercase());
    }

    if BOTTOM_TOKENS.iter().any(|token| haystack.contains(token)) {
        Category::Bottom
    } else if TOP_TOKENS.iter().any(|token| haystack.contains(token)) {
        Category::Top
    } else {
        Category::None
    }
}

/// Read-through cache over the static deck and catalog files
///
/// Each file is read at most once per loader; a failed read is not cached,
/// so the next access retries.
pub struct CatalogLoader {
    outfits_path: PathBuf,
    products_path: PathBuf,
    outfits: OnceCell<Arc<Vec<OutfitCard>>>,
    products: OnceCell<Arc<Vec<Product>>>,
}

impl CatalogLoader {
    pub fn new(outfits_path: impl Into<PathBuf>, products_path: impl Into<PathBuf>) -> Self {
        Self {
            outfits_path: outfits_path.into(),
            products_path: products_path.into(),
            outfits: OnceCell::new(),
            products: OnceCell::new(),
        }
    }

    /// The swipe deck, in file order
    pub async fn load_outfits(&self) -> AppResult<Arc<Vec<OutfitCard>>> {
        self.outfits
            .get_or_try_init(|| async {
                let outfits: Vec<OutfitCard> = read_json(&self.outfits_path).await?;
                tracing::info!(
                    count = outfits.len(),
                    path = %self.outfits_path.display(),
                    "Loaded outfit deck"
                );
                Ok::<_, AppError>(Arc::new(outfits))
            })
            .await
            .cloned()
    }

    /// The product catalog with categories attached
    pub async fn load_products(&self) -> AppResult<Arc<Vec<Product>>> {
        self.products
            .get_or_try_init(|| async {
                let mut products: Vec<Product> = read_json(&self.products_path).await?;
                for product in &mut products {
                    product.category = categorize(product);
                }

                tracing::info!(
                    count = products.len(),
                    tops = products.iter().filter(|p| p.category == Category::Top).count(),
                    bottoms = products.iter().filter(|p| p.category == Category::Bottom).count(),
                    path = %self.products_path.display(),
                    "Loaded product catalog"
                );
                Ok::<_, AppError>(Arc::new(products))
            })
            .await
            .cloned()
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Catalog(format!("failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Catalog(format!("failed to parse {}: {}", path.display(), e)))
}
