pub mod catalog;
pub mod locks;
pub mod pipeline;
pub mod preferences;
pub mod providers;
pub mod scoring;
pub mod selector;
pub mod tryon;

pub use pipeline::{OutfitRecommendation, Stylist};
