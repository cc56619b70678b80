use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod profile;
mod selection;

pub use profile::PreferenceProfile;
pub use selection::{SelectionError, SelectionResult};

// ============================================================================
// Catalog Types
// ============================================================================

/// A swipeable outfit card from the deck
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutfitCard {
    pub id: String,
    /// Image file name of the card, relative to the deck's image root
    pub image: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Garment class a product can fill in an outfit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    #[default]
    None,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Top => write!(f, "top"),
            Category::Bottom => write!(f, "bottom"),
            Category::None => write!(f, "none"),
        }
    }
}

/// A purchasable product from the catalog
///
/// `category` is not part of the source file; it is derived once when the
/// catalog is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Category,
}

/// Anything that can be ranked against a preference profile
pub trait Rankable {
    fn keywords(&self) -> &[String];

    /// Key used to break score ties, ascending
    fn tie_break_key(&self) -> &str;
}

impl Rankable for Product {
    fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn tie_break_key(&self) -> &str {
        &self.name
    }
}

/// An item paired with its overlap score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Scored<T> {
    pub score: u64,
    pub item: T,
}

/// A user's reaction to an outfit card
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Dislike,
}

// ============================================================================
// Session Memos
// ============================================================================

/// The most recently served top and bottom
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LastOutfitMemo {
    pub top_id: Option<String>,
    pub bottom_id: Option<String>,
}

/// The most recently generated try-on image and the outfit it depicts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TryOnMemo {
    pub top_id: String,
    pub bottom_id: String,
    pub image_ref: String,
    pub generated_at: DateTime<Utc>,
}

impl TryOnMemo {
    /// Whether this memo already depicts the given pair
    pub fn depicts(&self, top_id: &str, bottom_id: &str) -> bool {
        self.top_id == top_id && self.bottom_id == bottom_id
    }
}
